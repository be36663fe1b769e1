//! Core functionalities.
mod env;
mod policy;
mod step;
pub use env::Env;
pub use policy::Policy;
use std::fmt::Debug;
pub use step::{Info, Step};

/// An observation of an environment.
///
/// The shape of an observation is decided by the environment and must not
/// change during the lifetime of a session.
pub trait Obs: Clone + Debug {
    /// Returns the number of scalar elements in the observation.
    fn len(&self) -> usize;

    /// Returns `true` if the observation holds no element.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An action applied to an environment.
pub trait Act: Clone + Debug {
    /// Returns the number of scalar elements in the action.
    fn len(&self) -> usize;

    /// Returns `true` if the action holds no element.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
