//! Simulator control boundary.
//!
//! The microscopic traffic simulator is an external collaborator reached
//! through a synchronous control API. [`TrafficSim`] captures exactly the
//! slice of that API the harness needs: session lifecycle, single-tick
//! stepping, per-edge/per-lane measurements, and the traffic-signal
//! phase-duration setter. Every call may fail, and callers at the episode
//! boundary convert failures into episode termination rather than
//! propagating them.
//!
//! [`SyntheticSim`] is a deterministic in-process stand-in used by tests
//! and the demo binaries; a real transport (e.g. a TraCI client) would
//! implement the same trait.

mod error;
mod synthetic;

pub use error::SimError;
pub use synthetic::SyntheticSim;

/// Synchronous control API over a running traffic simulation.
///
/// Session discipline: at most one session is open at a time. `start` on a
/// running session fails with [`SimError::AlreadyRunning`]; `close` is
/// idempotent. All measurement getters require a running session.
pub trait TrafficSim {
    /// Opens a fresh simulation session.
    fn start(&mut self) -> Result<(), SimError>;

    /// Advances the simulation by exactly one time tick (one second).
    fn step_once(&mut self) -> Result<(), SimError>;

    /// Tears down the current session. Idempotent.
    fn close(&mut self) -> Result<(), SimError>;

    /// Number of vehicles still expected to enter or travel the network.
    /// Zero means the scenario is exhausted.
    fn min_expected_vehicles(&self) -> Result<u32, SimError>;

    /// Vehicles currently on the edge (last simulation step).
    fn vehicle_count(&self, edge: &str) -> Result<u32, SimError>;

    /// Mean vehicle speed on the edge, in m/s.
    fn mean_speed(&self, edge: &str) -> Result<f64, SimError>;

    /// Number of halted (queued) vehicles on the edge.
    fn halting_count(&self, edge: &str) -> Result<u32, SimError>;

    /// Cumulative waiting time on the edge, in seconds.
    fn waiting_time(&self, edge: &str) -> Result<f64, SimError>;

    /// Physical length of a lane, in meters.
    fn lane_length(&self, lane: &str) -> Result<f64, SimError>;

    /// Sets the remaining duration of the current green phase for a signal.
    fn set_phase_duration(&mut self, signal: &str, seconds: f64) -> Result<(), SimError>;

    /// Adapts an edge's assumed travel time, in seconds. On the ramp this
    /// throttles merging: a travel time of `1 / rate` admits `rate`
    /// vehicles per second.
    fn set_travel_time(&mut self, edge: &str, seconds: f64) -> Result<(), SimError>;
}
