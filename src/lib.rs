//! ramprl - Reinforcement learning for freeway ramp metering.
//!
//! An experimentation harness that learns metering decisions for a freeway
//! on-ramp (green-phase durations or direct inflow rates) from traffic
//! measurements. The expensive work (microscopic traffic
//! simulation, neural network inference) lives behind external
//! collaborators; this crate supplies the state/action/reward abstraction,
//! two environment stepping strategies, a tabular Q-learning agent, an
//! optional DQN agent (feature `dqn`, via `tch`), and the episode-loop
//! trainer with its convergence-based early stopping.

pub mod action;
pub mod agent;
pub mod config;
pub mod env;
pub mod metrics;
pub mod reward;
pub mod sim;
pub mod state;
pub mod trainer;

pub use action::{ControlError, InflowControl, MeterControl, SignalControl};
pub use agent::{Agent, AgentError, QTableAgent, QTableConfig, ReplayMemory, Transition};
pub use config::{
    ActionMode, ClampMode, ConfigError, EnvConfig, NormBounds, RewardKind, StateLayout, SumoLaunch,
};
pub use env::{Environment, PhaseEnv, StepResult, TickEnv};
pub use metrics::{RewardWindow, TrainingSummary};
pub use reward::RewardTracker;
pub use sim::{SimError, SyntheticSim, TrafficSim};
pub use state::StateObserver;
pub use trainer::{TrainError, Trainer, TrainerConfig};

#[cfg(feature = "dqn")]
pub use agent::{DqnAgent, DqnConfig};
