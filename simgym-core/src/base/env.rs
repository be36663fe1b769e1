//! Environment.
use super::{Act, Info, Obs, Step};
use crate::{error::EnvError, record::Record};

/// Represents an environment, typically an MDP.
///
/// The expected usage is [`Env::reset`] once, then [`Env::step`] until
/// [`Step::is_done`] returns `true`. An environment never resets itself;
/// calling [`Env::step`] after the terminal step is an error
/// ([`EnvError::InvalidState`]), not a no-op.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    ///
    /// Building must not start any external resource; that happens on
    /// [`Env::reset`].
    fn build(config: &Self::Config, seed: u64) -> Result<Self, EnvError>
    where
        Self: Sized;

    /// Starts a new episode and returns its first observation.
    ///
    /// Any episode in progress is discarded.
    fn reset(&mut self) -> Result<Self::Obs, EnvError>;

    /// Starts a new episode, using `ix` in an environment specific way.
    ///
    /// For simulators, `ix` is typically the seed of the episode, which is
    /// useful for reproducible evaluation.
    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs, EnvError>;

    /// Applies an action and returns the resulting step.
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record), EnvError>
    where
        Self: Sized;

    /// Releases all resources held by the environment.
    ///
    /// After this call every operation fails with [`EnvError::InvalidState`].
    fn close(&mut self) {}
}
