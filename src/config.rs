//! Configuration for the ramp-metering environment and agents.
//!
//! Two historical presets exist side by side: the phase-stepped tabular
//! setup ([`EnvConfig::tabular`]) and the tick-stepped metered setup
//! ([`EnvConfig::metered`]). They disagree on state layout, normalization
//! bounds, and clamping; both behaviors are kept selectable rather than
//! silently unified.

use std::path::PathBuf;

use thiserror::Error;

/// How the state vector is assembled from simulator measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateLayout {
    /// 4 features: mainline density, ramp queue, mainline speed, ramp speed.
    /// Densities use the fixed segment lengths from the config.
    Compact,
    /// 5 features: mainline speed, vehicle count, density, ramp queue,
    /// ramp wait. Density uses the lane length reported by the simulator.
    Extended,
}

/// Whether normalized features are clamped to `<= 1.0`.
///
/// The compact layout historically clamped and the extended one did not,
/// so readings past the assumed maxima leak through as values above 1.0
/// in the unclamped mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClampMode {
    Clamped,
    Unclamped,
}

/// How discrete actions are translated into metering commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionMode {
    /// Actions index the green-phase duration table of the meter signal.
    GreenPhase,
    /// Actions index the inflow-rate table; the signal is bypassed and the
    /// ramp's travel time is adapted to throttle merging instead.
    InflowRate,
}

/// Which reward objective the environment optimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RewardKind {
    /// Capped mainline flow minus `100 ×` the ramp waiting-time increase.
    /// Stateful: differences waiting time across calls.
    FlowMinusWaitDelta,
    /// `10 ×` total vehicles minus total waiting time over both edges.
    ThroughputMinusWait,
}

/// Normalization bounds for raw simulator measurements.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormBounds {
    /// Maximum density, vehicles per kilometer (compact) or per meter (extended).
    pub max_density: f64,
    /// Maximum mainline vehicle count.
    pub max_vehicles: f64,
    /// Maximum ramp queue length.
    pub max_queue: f64,
    /// Maximum speed, m/s.
    pub max_speed: f64,
    /// Maximum cumulative waiting time, seconds.
    pub max_wait: f64,
}

impl NormBounds {
    /// Bounds used by the phase-stepped tabular setup.
    pub fn tabular() -> Self {
        Self {
            max_density: 20.0,
            max_vehicles: 50.0,
            max_queue: 10.0,
            max_speed: 13.89,
            max_wait: 300.0,
        }
    }

    /// Bounds used by the tick-stepped metered setup.
    pub fn metered() -> Self {
        Self {
            max_density: 1.0,
            max_vehicles: 50.0,
            max_queue: 20.0,
            max_speed: 50.0,
            max_wait: 300.0,
        }
    }
}

/// Configuration for a ramp-metering environment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvConfig {
    // --- Network elements ---
    /// Mainline (through-traffic) edge id.
    pub mainline_edge: String,
    /// Lane queried for physical length in the extended layout.
    pub mainline_lane: String,
    /// Metered on-ramp edge id.
    pub ramp_edge: String,
    /// Ramp meter traffic-signal id.
    pub signal_id: String,
    /// Fixed mainline length in meters (compact layout density).
    pub mainline_length_m: f64,
    /// Fixed ramp length in meters.
    pub ramp_length_m: f64,

    // --- State encoding ---
    pub layout: StateLayout,
    pub clamp: ClampMode,
    pub bounds: NormBounds,

    // --- Actions ---
    /// Active metering modality.
    pub mode: ActionMode,
    /// Ordered green-phase durations, in whole seconds.
    pub phase_durations: Vec<u32>,
    /// Ordered ramp inflow rates, in vehicles per second.
    pub inflow_rates: Vec<f64>,
    /// Fixed simulation ticks per step in inflow-rate mode.
    pub inflow_ticks: u32,

    // --- Reward ---
    pub reward: RewardKind,
    /// Upper bound on the positive flow term. The penalty term is unbounded.
    pub reward_cap: f64,

    // --- Episode limits ---
    /// Hard per-episode step ceiling.
    pub max_steps: u32,
    /// Sliding-window length for the convergence heuristic.
    pub convergence_window: usize,
    /// Reward-variance threshold below which an episode is considered converged.
    pub convergence_threshold: f64,
}

impl EnvConfig {
    /// Preset for the phase-stepped tabular environment: compact clamped
    /// state, short green phases, aggregate throughput reward.
    pub fn tabular() -> Self {
        Self {
            layout: StateLayout::Compact,
            clamp: ClampMode::Clamped,
            bounds: NormBounds::tabular(),
            phase_durations: vec![5, 10, 15, 20],
            reward: RewardKind::ThroughputMinusWait,
            ..Self::metered()
        }
    }

    /// Preset for the phase-stepped environment metering by inflow rate:
    /// same state and reward as [`EnvConfig::tabular`], but the signal is
    /// bypassed and each step spans a fixed number of ticks.
    pub fn inflow() -> Self {
        Self {
            mode: ActionMode::InflowRate,
            ..Self::tabular()
        }
    }

    /// Preset for the tick-stepped metered environment: extended unclamped
    /// state, long green phases, flow-minus-wait-delta reward.
    pub fn metered() -> Self {
        Self {
            mainline_edge: "2to3".to_string(),
            mainline_lane: "2to3_0".to_string(),
            ramp_edge: "intramp".to_string(),
            signal_id: "node6".to_string(),
            mainline_length_m: 1000.0,
            ramp_length_m: 100.0,
            layout: StateLayout::Extended,
            clamp: ClampMode::Unclamped,
            bounds: NormBounds::metered(),
            mode: ActionMode::GreenPhase,
            phase_durations: vec![30, 45, 60],
            inflow_rates: vec![0.2, 0.5, 1.0, 2.0],
            inflow_ticks: 10,
            reward: RewardKind::FlowMinusWaitDelta,
            reward_cap: 1000.0,
            max_steps: 2000,
            convergence_window: 20,
            convergence_threshold: 0.01,
        }
    }

    /// Number of state features for the configured layout.
    pub fn state_dim(&self) -> usize {
        match self.layout {
            StateLayout::Compact => 4,
            StateLayout::Extended => 5,
        }
    }

    /// Number of discrete actions in the active metering mode.
    pub fn action_dim(&self) -> usize {
        match self.mode {
            ActionMode::GreenPhase => self.phase_durations.len(),
            ActionMode::InflowRate => self.inflow_rates.len(),
        }
    }

    /// Rejects configurations no environment could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.mode {
            ActionMode::GreenPhase if self.phase_durations.is_empty() => {
                Err(ConfigError::EmptyPhaseTable)
            }
            ActionMode::InflowRate if self.inflow_rates.is_empty() => {
                Err(ConfigError::EmptyInflowTable)
            }
            _ => Ok(()),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::metered()
    }
}

/// Configuration errors raised at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is not set; it must point to the simulator installation")]
    MissingEnvVar(&'static str),

    #[error("No phase durations configured")]
    EmptyPhaseTable,

    #[error("No inflow rates configured")]
    EmptyInflowTable,
}

/// Launch parameters for an external simulator installation.
///
/// A missing `SUMO_HOME` is fatal at startup; nothing downstream can run
/// without a simulator to talk to.
#[derive(Debug, Clone)]
pub struct SumoLaunch {
    /// Simulator installation root, from `SUMO_HOME`.
    pub home: PathBuf,
    /// Scenario configuration file passed to the simulator.
    pub scenario: PathBuf,
}

impl SumoLaunch {
    /// Reads the installation root from `SUMO_HOME`.
    pub fn from_env(scenario: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let home = std::env::var_os("SUMO_HOME").ok_or(ConfigError::MissingEnvVar("SUMO_HOME"))?;
        Ok(Self {
            home: PathBuf::from(home),
            scenario: scenario.into(),
        })
    }
}
