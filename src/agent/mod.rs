//! Learning agents.
//!
//! Two value-learning strategies share the [`Agent`] seam: a dictionary
//! Q-table over discretized states ([`QTableAgent`]) and, behind the `dqn`
//! feature, a neural Q-network with replay memory and a target network
//! ([`DqnAgent`]).

pub mod replay;
pub mod tabular;

#[cfg(feature = "dqn")]
pub mod dqn;

pub use replay::ReplayMemory;
pub use tabular::{QTableAgent, QTableConfig};

#[cfg(feature = "dqn")]
pub use dqn::{DqnAgent, DqnConfig};

use thiserror::Error;

/// Errors raised while an agent digests experience.
#[derive(Debug, Error)]
pub enum AgentError {
    #[cfg(feature = "dqn")]
    #[error(transparent)]
    Torch(#[from] tch::TchError),
}

/// One recorded step of experience. Immutable once recorded.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    pub state: Vec<f64>,
    pub action: usize,
    pub reward: f64,
    pub next_state: Vec<f64>,
    pub done: bool,
}

/// An agent that selects actions and learns from experience.
///
/// The two implementations differ in when exploration decays: the tabular
/// agent decays epsilon once per episode (in [`Agent::end_episode`]), the
/// neural agent once per replay pass (inside [`Agent::observe`]).
pub trait Agent {
    /// Selects an action for the given state (epsilon-greedy).
    fn act(&mut self, state: &[f64]) -> usize;

    /// Digests one transition: immediate TD update for the tabular agent,
    /// remember-then-replay for the neural one.
    fn observe(&mut self, transition: Transition) -> Result<(), AgentError>;

    /// Episode-boundary bookkeeping (tabular epsilon decay).
    fn end_episode(&mut self);

    /// Current exploration rate.
    fn epsilon(&self) -> f64;
}
