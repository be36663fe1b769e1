//! Environment step.
use super::Env;

/// Additional information to `Obs` and `Act`.
pub trait Info {}

impl Info for () {}

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`
/// with some additional information.
pub struct Step<E: Env> {
    /// Action.
    pub act: E::Act,

    /// Observation after the action was applied.
    pub obs: E::Obs,

    /// Reward. Always a finite real number.
    pub reward: f64,

    /// Flag denoting if the episode has ended.
    pub is_terminated: bool,

    /// Information defined by the environment.
    pub info: E::Info,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(obs: E::Obs, act: E::Act, reward: f64, is_terminated: bool, info: E::Info) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            info,
        }
    }

    #[inline]
    /// Returns `true` if this was the terminal step of the episode.
    pub fn is_done(&self) -> bool {
        self.is_terminated
    }
}
