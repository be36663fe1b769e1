//! Diagnostic key-value records.
//!
//! An environment returns a [`Record`] with every step. It carries whatever the
//! environment finds useful for diagnosis (request ids, raw observations,
//! rewards) and is not part of the interaction protocol.
//!
//! ```rust
//! use simgym_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("reward", RecordValue::Scalar(-1.0));
//! record.insert("obs", RecordValue::Array1(vec![0.5, 0.25]));
//! assert_eq!(record.get_scalar("reward").unwrap(), -1.0);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
