//! Errors in the library.
use std::time::Duration;
use thiserror::Error;

/// Errors raised while accessing a [`Record`](crate::record::Record).
#[derive(Error, Debug)]
pub enum RecordError {
    /// The key does not exist in the record.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// The value exists but has another type.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}

/// Errors raised by an environment.
///
/// Every variant terminates the current episode. After [`EnvError::StartupTimeout`],
/// [`EnvError::StepTimeout`], [`EnvError::Protocol`] and [`EnvError::Io`] the
/// environment is unusable and has to be built again.
#[derive(Error, Debug)]
pub enum EnvError {
    /// The action could not be represented on the wire.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The simulator did not produce its first observation in time.
    #[error("Simulator did not start within {timeout:?}")]
    StartupTimeout {
        /// The configured timeout.
        timeout: Duration,
    },

    /// The simulator did not reply to an action in time.
    #[error("Simulator did not reply within {timeout:?}")]
    StepTimeout {
        /// The configured timeout.
        timeout: Duration,
    },

    /// The operation is not allowed in the current state of the environment.
    #[error("Invalid state: cannot {op} while {state}")]
    InvalidState {
        /// The rejected operation.
        op: &'static str,

        /// The state the environment was in.
        state: String,
    },

    /// The simulator sent something that does not follow the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The connection to the simulator failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EnvError {
    /// Returns `true` for both kinds of timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            EnvError::StartupTimeout { .. } | EnvError::StepTimeout { .. }
        )
    }
}
