//! Actions of [`VeinsEnv`](crate::VeinsEnv).
use crate::space::SpaceValue;
use simgym_core::Act;

/// An action that can be expressed as a space value.
///
/// [`DefaultActionCodec`](crate::DefaultActionCodec) encodes any `VeinsAct`
/// through [`VeinsAct::to_space`].
pub trait VeinsAct: Act {
    /// Converts the action into the value sent to the simulator.
    fn to_space(&self) -> SpaceValue;
}

/// Continuous action of fixed arity, sent as a box.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxAct(pub Vec<f64>);

impl BoxAct {
    /// Constructs a box action.
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl From<Vec<f64>> for BoxAct {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl Act for BoxAct {
    fn len(&self) -> usize {
        self.0.len()
    }
}

impl VeinsAct for BoxAct {
    fn to_space(&self) -> SpaceValue {
        SpaceValue::Box(self.0.clone())
    }
}

/// Categorical action, sent as a discrete value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscreteAct(pub u64);

impl Act for DiscreteAct {
    fn len(&self) -> usize {
        1
    }
}

impl VeinsAct for DiscreteAct {
    fn to_space(&self) -> SpaceValue {
        SpaceValue::Discrete(self.0)
    }
}
