//! State representation for the ramp-metering environment.
//!
//! Builds the normalized feature vector from raw simulator measurements
//! on the mainline and ramp edges, and provides the discretization used
//! to key the tabular Q-table.

use crate::config::{ClampMode, EnvConfig, StateLayout};
use crate::sim::{SimError, TrafficSim};

/// Reads simulator measurements and encodes them as a normalized state vector.
///
/// The layout and clamping behavior come from [`EnvConfig`]; see
/// [`StateLayout`] for the feature order of each variant.
#[derive(Debug, Clone)]
pub struct StateObserver {
    config: EnvConfig,
}

impl StateObserver {
    pub fn new(config: EnvConfig) -> Self {
        Self { config }
    }

    /// Builds the current state vector.
    ///
    /// Each feature is divided by its configured bound. In
    /// [`ClampMode::Clamped`] every component is additionally truncated to
    /// `<= 1.0`; in [`ClampMode::Unclamped`] out-of-range readings pass
    /// through above 1.0. Zero segment lengths yield a density of zero.
    pub fn observe<S: TrafficSim>(&self, sim: &S) -> Result<Vec<f64>, SimError> {
        let cfg = &self.config;
        let b = &cfg.bounds;

        let mainline_vehicles = sim.vehicle_count(&cfg.mainline_edge)? as f64;
        let mainline_speed = sim.mean_speed(&cfg.mainline_edge)?;
        let ramp_queue = sim.halting_count(&cfg.ramp_edge)? as f64;

        let mut state = match cfg.layout {
            StateLayout::Compact => {
                // Density in vehicles per kilometer of fixed mainline length.
                let km = cfg.mainline_length_m / 1000.0;
                let density = guarded_div(mainline_vehicles, km);
                let ramp_speed = sim.mean_speed(&cfg.ramp_edge)?;
                vec![
                    density / b.max_density,
                    ramp_queue / b.max_queue,
                    mainline_speed / b.max_speed,
                    ramp_speed / b.max_speed,
                ]
            }
            StateLayout::Extended => {
                // Density in vehicles per meter of measured lane length.
                let length = sim.lane_length(&cfg.mainline_lane)?;
                let density = guarded_div(mainline_vehicles, length);
                let ramp_wait = sim.waiting_time(&cfg.ramp_edge)?;
                vec![
                    mainline_speed / b.max_speed,
                    mainline_vehicles / b.max_vehicles,
                    density / b.max_density,
                    ramp_queue / b.max_queue,
                    ramp_wait / b.max_wait,
                ]
            }
        };

        if cfg.clamp == ClampMode::Clamped {
            for v in &mut state {
                *v = v.min(1.0);
            }
        }

        Ok(state)
    }

    /// Number of features in vectors produced by [`StateObserver::observe`].
    pub fn dim(&self) -> usize {
        self.config.state_dim()
    }
}

/// Division that defines `x / 0` as zero.
fn guarded_div(x: f64, divisor: f64) -> f64 {
    if divisor > 0.0 {
        x / divisor
    } else {
        0.0
    }
}

/// Maps a normalized feature in `[0, 1]` to one of `n_bins` equal-width bins.
///
/// Values at or above 1.0 land in the top bin; negative values in bin 0.
pub fn discretize(value: f64, n_bins: usize) -> usize {
    debug_assert!(n_bins > 0);
    let bin = (value.max(0.0) * n_bins as f64) as usize;
    bin.min(n_bins - 1)
}

/// Combines a mainline bin and a ramp bin into a single state index
/// (mixed-radix encoding, mainline-major).
pub fn state_index(mainline_bin: usize, ramp_bin: usize, n_bins: usize) -> usize {
    mainline_bin * n_bins + ramp_bin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SyntheticSim;

    fn run_sim(ticks: u32) -> SyntheticSim {
        let mut sim = SyntheticSim::with_defaults(11);
        sim.start().unwrap();
        for _ in 0..ticks {
            sim.step_once().unwrap();
        }
        sim
    }

    #[test]
    fn compact_layout_is_clamped() {
        let sim = run_sim(200);
        let observer = StateObserver::new(EnvConfig::tabular());
        let state = observer.observe(&sim).unwrap();
        assert_eq!(state.len(), 4);
        for v in &state {
            assert!(v.is_finite());
            assert!(*v <= 1.0, "clamped feature above 1.0: {v}");
            assert!(*v >= 0.0);
        }
    }

    #[test]
    fn extended_layout_may_exceed_one() {
        let sim = run_sim(300);
        let mut cfg = EnvConfig::metered();
        // Shrink a bound so a realistic reading overflows it.
        cfg.bounds.max_queue = 0.1;
        let observer = StateObserver::new(cfg);
        let state = observer.observe(&sim).unwrap();
        assert_eq!(state.len(), 5);
        assert!(state.iter().all(|v| v.is_finite()));
        assert!(state[3] > 1.0, "unclamped overflow was truncated");
    }

    #[test]
    fn zero_length_density_is_zero() {
        assert_eq!(guarded_div(12.0, 0.0), 0.0);
        assert_eq!(guarded_div(12.0, -1.0), 0.0);
    }

    #[test]
    fn discretize_matches_reference_bins() {
        assert_eq!(discretize(0.25, 10), 2);
        assert_eq!(discretize(0.95, 10), 9);
        assert_eq!(discretize(1.3, 10), 9); // clamped at n_bins - 1
        assert_eq!(discretize(-0.2, 10), 0);
    }

    #[test]
    fn state_index_is_mixed_radix() {
        assert_eq!(state_index(2, 9, 10), 29);
        assert_eq!(state_index(0, 0, 10), 0);
        assert_eq!(state_index(9, 9, 10), 99);
    }
}
