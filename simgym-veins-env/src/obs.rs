//! Observations of [`VeinsEnv`](crate::VeinsEnv).
use crate::space::SpaceValue;
use simgym_core::{EnvError, Obs};

/// An observation that can be built from the value sent by the simulator.
pub trait VeinsObs: Obs {
    /// Converts the received value.
    ///
    /// Returns [`EnvError::Protocol`] if the value does not fit the type.
    fn from_space(value: SpaceValue) -> Result<Self, EnvError>;
}

/// Observation of any layout, kept as received.
#[derive(Clone, Debug, PartialEq)]
pub struct SpaceObs(pub SpaceValue);

impl Obs for SpaceObs {
    fn len(&self) -> usize {
        self.0.len()
    }
}

impl VeinsObs for SpaceObs {
    fn from_space(value: SpaceValue) -> Result<Self, EnvError> {
        Ok(Self(value))
    }
}

/// Observation of a scenario that only sends boxes.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxObs(pub Vec<f64>);

impl Obs for BoxObs {
    fn len(&self) -> usize {
        self.0.len()
    }
}

impl VeinsObs for BoxObs {
    fn from_space(value: SpaceValue) -> Result<Self, EnvError> {
        match value {
            SpaceValue::Box(values) => Ok(Self(values)),
            other => Err(EnvError::Protocol(format!(
                "expected a box observation, got {}",
                other.kind()
            ))),
        }
    }
}
