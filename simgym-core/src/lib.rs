#![warn(missing_docs)]
//! Core traits of simgym.
//!
//! An environment ([`Env`]) is driven by a [`Policy`] through a strict
//! `reset()` / `step()` protocol. Every step yields a [`Step`] and a diagnostic
//! [`Record`](record::Record). All failures of an environment are reported with
//! [`EnvError`](error::EnvError), so that a control loop can tell a timed out
//! simulator apart from a misused session.
pub mod error;
pub mod record;
pub mod util;

mod base;
pub use base::{Act, Env, Info, Obs, Policy, Step};
pub use error::{EnvError, RecordError};
