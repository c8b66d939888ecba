//! Ramp-metering RL environments.
//!
//! Two stepping strategies share one interface:
//!
//! - [`TickEnv`] advances the simulator one tick per `step` and caps
//!   episodes at a fixed step ceiling (the setup used with the neural agent).
//! - [`PhaseEnv`] runs the simulator forward for the full chosen green
//!   phase, one tick per second of green time (the tabular setup).
//!
//! Both own their simulator session outright: a fresh session is opened on
//! `reset`, and teardown (including the failure paths) swallows close
//! errors rather than propagating them.

mod phase;
mod tick;

pub use phase::PhaseEnv;
pub use tick::TickEnv;

use crate::action::ControlError;
use crate::sim::SimError;

/// Result of a single environment step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Normalized state after the step.
    pub state: Vec<f64>,
    /// Reward for the step.
    pub reward: f64,
    /// Whether the episode has terminated.
    pub done: bool,
}

/// Standard RL environment contract: `reset` to a fresh episode, `step`
/// until `done`, `close` when finished.
///
/// Simulator-communication failures inside `step` are absorbed as episode
/// termination (last state, reward 0, done) rather than propagated; only
/// an invalid action index is an error the caller sees.
pub trait Environment {
    /// Starts a fresh episode and returns the initial state.
    ///
    /// Any existing session is torn down first, with teardown errors
    /// swallowed.
    fn reset(&mut self) -> Result<Vec<f64>, SimError>;

    /// Applies an action and advances the simulation.
    fn step(&mut self, action: usize) -> Result<StepResult, ControlError>;

    /// Early-stop heuristic: true when recent step rewards have settled.
    fn check_convergence(&self) -> bool;

    /// Tears down the simulator session, swallowing errors.
    fn close(&mut self);

    /// Number of state features.
    fn state_dim(&self) -> usize;

    /// Number of discrete actions.
    fn action_dim(&self) -> usize;
}
