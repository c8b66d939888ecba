//! Action control: mapping discrete actions to metering commands.
//!
//! Two modalities exist: [`SignalControl`] sets the meter signal's green
//! phase, [`InflowControl`] bypasses the signal and adapts the ramp's
//! travel time to throttle merging directly. [`MeterControl`] selects one
//! from an [`EnvConfig`].

use thiserror::Error;

use crate::config::{ActionMode, EnvConfig};
use crate::sim::{SimError, TrafficSim};

/// Errors raised while applying a control action.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The action index does not refer to a configured table entry.
    #[error("Invalid action index {index} (action table has {len} entries)")]
    InvalidAction { index: usize, len: usize },

    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Issues green-phase-duration commands to the ramp meter signal.
///
/// An action is an index into a fixed, ordered table of phase durations.
/// Applying an action issues exactly one command to the simulator.
#[derive(Debug, Clone)]
pub struct SignalControl {
    signal_id: String,
    phase_durations: Vec<u32>,
}

impl SignalControl {
    /// Creates a controller for one signal.
    ///
    /// # Arguments
    ///
    /// * `signal_id` - Simulator id of the metering signal
    /// * `phase_durations` - Ordered green durations, in whole seconds
    pub fn new(signal_id: impl Into<String>, phase_durations: Vec<u32>) -> Self {
        Self {
            signal_id: signal_id.into(),
            phase_durations,
        }
    }

    /// Green duration for an action, in seconds.
    pub fn duration_for(&self, action: usize) -> Result<u32, ControlError> {
        self.phase_durations
            .get(action)
            .copied()
            .ok_or(ControlError::InvalidAction {
                index: action,
                len: self.phase_durations.len(),
            })
    }

    /// Applies an action by setting the signal's green-phase duration.
    ///
    /// Out-of-range indices are a precondition violation and reported as
    /// [`ControlError::InvalidAction`] without touching the simulator.
    pub fn apply<S: TrafficSim>(&self, sim: &mut S, action: usize) -> Result<(), ControlError> {
        let duration = self.duration_for(action)?;
        sim.set_phase_duration(&self.signal_id, duration as f64)?;
        Ok(())
    }

    /// Number of configured actions.
    pub fn action_dim(&self) -> usize {
        self.phase_durations.len()
    }
}

/// Throttles ramp merging by adapting the ramp edge's travel time.
///
/// An action is an index into a fixed, ordered table of inflow rates in
/// vehicles per second. Applying an action sets the ramp's travel time to
/// the reciprocal of the chosen rate, so a rate of 0.5 admits one vehicle
/// every two seconds. Each step spans a fixed number of simulation ticks.
#[derive(Debug, Clone)]
pub struct InflowControl {
    ramp_edge: String,
    inflow_rates: Vec<f64>,
    ticks_per_step: u32,
}

impl InflowControl {
    /// Creates a controller for one metered ramp edge.
    ///
    /// # Arguments
    ///
    /// * `ramp_edge` - Simulator id of the metered ramp edge
    /// * `inflow_rates` - Ordered inflow rates, in vehicles per second
    /// * `ticks_per_step` - Simulation ticks advanced per step
    pub fn new(ramp_edge: impl Into<String>, inflow_rates: Vec<f64>, ticks_per_step: u32) -> Self {
        Self {
            ramp_edge: ramp_edge.into(),
            inflow_rates,
            ticks_per_step,
        }
    }

    /// Inflow rate for an action, in vehicles per second.
    pub fn rate_for(&self, action: usize) -> Result<f64, ControlError> {
        self.inflow_rates
            .get(action)
            .copied()
            .ok_or(ControlError::InvalidAction {
                index: action,
                len: self.inflow_rates.len(),
            })
    }

    /// Applies an action by adapting the ramp's travel time to `1 / rate`.
    pub fn apply<S: TrafficSim>(&self, sim: &mut S, action: usize) -> Result<(), ControlError> {
        let rate = self.rate_for(action)?;
        sim.set_travel_time(&self.ramp_edge, 1.0 / rate)?;
        Ok(())
    }

    /// Number of configured actions.
    pub fn action_dim(&self) -> usize {
        self.inflow_rates.len()
    }

    /// Simulation ticks advanced per step.
    pub fn ticks_per_step(&self) -> u32 {
        self.ticks_per_step
    }
}

/// Metering modality selected by [`EnvConfig::mode`].
#[derive(Debug, Clone)]
pub enum MeterControl {
    Signal(SignalControl),
    Inflow(InflowControl),
}

impl MeterControl {
    /// Builds the controller the config's action mode calls for.
    pub fn from_config(config: &EnvConfig) -> Self {
        match config.mode {
            ActionMode::GreenPhase => Self::Signal(SignalControl::new(
                config.signal_id.clone(),
                config.phase_durations.clone(),
            )),
            ActionMode::InflowRate => Self::Inflow(InflowControl::new(
                config.ramp_edge.clone(),
                config.inflow_rates.clone(),
                config.inflow_ticks,
            )),
        }
    }

    /// Validates an action index without touching the simulator.
    pub fn check(&self, action: usize) -> Result<(), ControlError> {
        match self {
            Self::Signal(c) => c.duration_for(action).map(|_| ()),
            Self::Inflow(c) => c.rate_for(action).map(|_| ()),
        }
    }

    /// Simulation ticks a step of this action spans.
    ///
    /// Green-phase metering runs for the chosen duration; inflow metering
    /// always advances a fixed number of ticks.
    pub fn ticks_for(&self, action: usize) -> Result<u32, ControlError> {
        match self {
            Self::Signal(c) => c.duration_for(action),
            Self::Inflow(c) => {
                c.rate_for(action)?;
                Ok(c.ticks_per_step())
            }
        }
    }

    /// Applies an action through the active modality.
    pub fn apply<S: TrafficSim>(&self, sim: &mut S, action: usize) -> Result<(), ControlError> {
        match self {
            Self::Signal(c) => c.apply(sim, action),
            Self::Inflow(c) => c.apply(sim, action),
        }
    }

    /// Number of configured actions.
    pub fn action_dim(&self) -> usize {
        match self {
            Self::Signal(c) => c.action_dim(),
            Self::Inflow(c) => c.action_dim(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SyntheticSim;

    #[test]
    fn apply_issues_configured_duration() {
        let mut sim = SyntheticSim::with_defaults(1);
        sim.start().unwrap();
        let control = SignalControl::new("node6", vec![30, 45, 60]);

        control.apply(&mut sim, 2).unwrap();

        assert_eq!(sim.issued_commands, vec![("node6".to_string(), 60.0)]);
    }

    #[test]
    fn out_of_range_action_is_rejected_before_the_simulator() {
        let mut sim = SyntheticSim::with_defaults(1);
        sim.start().unwrap();
        let control = SignalControl::new("node6", vec![30, 45, 60]);

        let err = control.apply(&mut sim, 3).unwrap_err();
        assert_eq!(err, ControlError::InvalidAction { index: 3, len: 3 });
        assert!(sim.issued_commands.is_empty());
    }

    #[test]
    fn inflow_apply_issues_reciprocal_travel_time() {
        let mut sim = SyntheticSim::with_defaults(1);
        sim.start().unwrap();
        let control = InflowControl::new("intramp", vec![0.2, 0.5, 1.0, 2.0], 10);

        control.apply(&mut sim, 1).unwrap();

        assert_eq!(sim.issued_travel_times, vec![("intramp".to_string(), 2.0)]);
        assert!(sim.issued_commands.is_empty());
    }

    #[test]
    fn inflow_out_of_range_action_is_rejected() {
        let mut sim = SyntheticSim::with_defaults(1);
        sim.start().unwrap();
        let control = InflowControl::new("intramp", vec![0.2, 0.5], 10);

        let err = control.apply(&mut sim, 2).unwrap_err();
        assert_eq!(err, ControlError::InvalidAction { index: 2, len: 2 });
        assert!(sim.issued_travel_times.is_empty());
    }

    #[test]
    fn meter_control_follows_config_mode() {
        let signal = MeterControl::from_config(&EnvConfig::tabular());
        assert!(matches!(signal, MeterControl::Signal(_)));
        assert_eq!(signal.ticks_for(0).unwrap(), 5);

        let inflow = MeterControl::from_config(&EnvConfig::inflow());
        assert!(matches!(inflow, MeterControl::Inflow(_)));
        assert_eq!(inflow.action_dim(), 4);
        // Fixed tick count regardless of the chosen rate.
        assert_eq!(inflow.ticks_for(0).unwrap(), 10);
        assert_eq!(inflow.ticks_for(3).unwrap(), 10);
        assert!(inflow.ticks_for(4).is_err());
    }

    #[test]
    fn unknown_signal_surfaces_sim_error() {
        let mut sim = SyntheticSim::with_defaults(1);
        sim.start().unwrap();
        let control = SignalControl::new("not-a-signal", vec![30]);

        assert!(matches!(
            control.apply(&mut sim, 0),
            Err(ControlError::Sim(SimError::UnknownSignal(_)))
        ));
    }
}
