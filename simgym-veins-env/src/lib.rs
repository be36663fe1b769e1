#![warn(missing_docs)]
//! A [Veins](https://veins.car2x.org) network simulation as an environment.
//!
//! [`VeinsEnv`] drives an OMNeT++/Veins scenario that runs as a separate
//! process. The simulator connects to a port the environment listens on and
//! then sends requests, each answered by exactly one reply:
//!
//! * `init` announces the observation and action spaces and is answered with
//!   an empty reply,
//! * `step` carries an observation and the reward of the previous action and
//!   is answered with the next action,
//! * `shutdown` ends the episode and is answered with an empty reply.
//!
//! Messages are protocol buffers (see [`proto`]) framed with a 4-byte
//! big-endian length.
//!
//! ## Observation
//!
//! Values received from the simulator are converted to [`SpaceValue`] and then
//! to the observation type of the environment through [`VeinsObs`]. [`BoxObs`]
//! accepts box observations only, [`SpaceObs`] keeps anything as received.
//!
//! ## Action
//!
//! Actions implement [`VeinsAct`] and are serialized by an [`ActionCodec`].
//! [`DefaultActionCodec`] sends [`BoxAct`] as a box and [`DiscreteAct`] as a
//! discrete value, after checking them against the action space of the
//! scenario. Closures can be used as codecs for scenarios with other encodings.
//!
//! ## Timeouts
//!
//! Both the startup of the simulator and every step are bounded by
//! `timeout` of [`VeinsEnvConfig`]. A timed out environment kills its
//! simulator and has to be built again.
mod act;
mod base;
mod codec;
mod config;
mod obs;
mod process;
pub mod proto;
mod space;
mod transport;
pub use act::{BoxAct, DiscreteAct, VeinsAct};
pub use base::{SessionState, VeinsEnv, VeinsInfo};
pub use codec::{decode_action, encode_ack, encode_reply, ActionCodec, DefaultActionCodec};
pub use config::{UserInterface, VeinsEnvConfig};
pub use obs::{BoxObs, SpaceObs, VeinsObs};
pub use process::SimulatorProcess;
pub use space::{SpaceSpec, SpaceValue};
pub use transport::{FramedStream, TcpTransport, Transport, MAX_FRAME_LEN};
