//! Reinforcement learning environments backed by out-of-process network simulations.
//!
//! Simgym consists of the following crates:
//!
//! * [simgym-core](simgym_core) provides the traits generic to environments
//!   and policies ([`Env`](simgym_core::Env), [`Policy`](simgym_core::Policy)),
//!   records of steps and the evaluation loops in [`util`](simgym_core::util).
//! * [simgym-veins-env](simgym_veins_env) runs a [Veins](https://veins.car2x.org)
//!   scenario as an environment, one simulator process per episode.
//!
//! This crate re-exports both and is otherwise a collection of examples:
//!
//! * `random_veins` drives a scenario with uniformly random box actions.
//! * `fixed_action_veins` repeats one action until the episode ends and writes
//!   every step and the summary of every episode to CSV files.
pub use simgym_core as core;
pub use simgym_veins_env as veins;
