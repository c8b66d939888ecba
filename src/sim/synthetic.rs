//! Deterministic in-process traffic model.
//!
//! A coarse ramp-merge simulation used wherever the real simulator is not
//! available: unit tests, demo binaries, and quick policy smoke checks.
//! The model is intentionally simple (bounded mainline, FIFO ramp queue,
//! metered release while the green phase runs) but exercises the whole
//! [`TrafficSim`] surface, including scenario exhaustion.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{SimError, TrafficSim};

const FREE_FLOW_SPEED: f64 = 13.89;
const MAINLINE_LENGTH_M: f64 = 1000.0;
const RAMP_LENGTH_M: f64 = 100.0;
const MAINLINE_CAPACITY: u32 = 60;

/// Synthetic ramp-merge simulator.
///
/// Vehicles are drawn from a finite demand budget, arrive on the mainline
/// or the ramp queue, and the ramp releases one vehicle per tick while a
/// green phase is active. Mean mainline speed degrades linearly with
/// occupancy, and ramp waiting time accumulates with queue length, so the
/// measurements react to metering decisions the way the harness expects.
///
/// Every accepted phase command is recorded in [`SyntheticSim::issued_commands`]
/// so tests can assert on exactly what the control layer sent.
#[derive(Debug)]
pub struct SyntheticSim {
    mainline: String,
    mainline_lane: String,
    ramp: String,
    ramp_lane: String,
    signal: String,

    running: bool,
    seed: u64,
    rng: StdRng,

    demand: u32,
    remaining_demand: u32,
    mainline_vehicles: u32,
    ramp_queue: u32,
    green_remaining: f64,
    ramp_inflow_per_tick: f64,
    ramp_release_credit: f64,
    ramp_wait: f64,
    mainline_wait: f64,
    tick: u64,

    /// Every `(signal, seconds)` phase command issued this session.
    pub issued_commands: Vec<(String, f64)>,
    /// Every `(edge, seconds)` travel-time command issued this session.
    pub issued_travel_times: Vec<(String, f64)>,
}

impl SyntheticSim {
    /// Creates a simulator for the given network element ids.
    ///
    /// # Arguments
    ///
    /// * `mainline` - Mainline edge id (its single lane is `<mainline>_0`)
    /// * `ramp` - Ramp edge id (its single lane is `<ramp>_0`)
    /// * `signal` - Ramp meter signal id
    /// * `demand` - Total number of vehicles in the scenario
    /// * `seed` - RNG seed for arrival noise
    pub fn new(mainline: &str, ramp: &str, signal: &str, demand: u32, seed: u64) -> Self {
        Self {
            mainline: mainline.to_string(),
            mainline_lane: format!("{mainline}_0"),
            ramp: ramp.to_string(),
            ramp_lane: format!("{ramp}_0"),
            signal: signal.to_string(),
            running: false,
            seed,
            rng: StdRng::seed_from_u64(seed),
            demand,
            remaining_demand: demand,
            mainline_vehicles: 0,
            ramp_queue: 0,
            green_remaining: 0.0,
            ramp_inflow_per_tick: 0.0,
            ramp_release_credit: 0.0,
            ramp_wait: 0.0,
            mainline_wait: 0.0,
            tick: 0,
            issued_commands: Vec::new(),
            issued_travel_times: Vec::new(),
        }
    }

    /// Simulator wired to the canonical demo network ids.
    pub fn with_defaults(seed: u64) -> Self {
        Self::new("2to3", "intramp", "node6", 400, seed)
    }

    /// Current simulation tick within the session.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    fn require_running(&self) -> Result<(), SimError> {
        if self.running {
            Ok(())
        } else {
            Err(SimError::NotRunning)
        }
    }

    fn check_edge(&self, edge: &str) -> Result<bool, SimError> {
        if edge == self.mainline {
            Ok(true)
        } else if edge == self.ramp {
            Ok(false)
        } else {
            Err(SimError::UnknownEdge(edge.to_string()))
        }
    }
}

impl TrafficSim for SyntheticSim {
    fn start(&mut self) -> Result<(), SimError> {
        if self.running {
            return Err(SimError::AlreadyRunning);
        }
        self.rng = StdRng::seed_from_u64(self.seed);
        self.seed += 1; // different arrival pattern next session
        self.remaining_demand = self.demand;
        self.mainline_vehicles = 0;
        self.ramp_queue = 0;
        self.green_remaining = 0.0;
        self.ramp_inflow_per_tick = 0.0;
        self.ramp_release_credit = 0.0;
        self.ramp_wait = 0.0;
        self.mainline_wait = 0.0;
        self.tick = 0;
        self.issued_commands.clear();
        self.issued_travel_times.clear();
        self.running = true;
        Ok(())
    }

    fn step_once(&mut self) -> Result<(), SimError> {
        self.require_running()?;
        self.tick += 1;

        // Arrivals draw from the finite demand budget.
        if self.remaining_demand > 0 && self.rng.gen_bool(0.6) {
            self.remaining_demand -= 1;
            self.mainline_vehicles += 1;
        }
        if self.remaining_demand > 0 && self.rng.gen_bool(0.3) {
            self.remaining_demand -= 1;
            self.ramp_queue += 1;
        }

        // Metered release: one vehicle per tick while the green phase runs.
        if self.green_remaining >= 1.0 && self.ramp_queue > 0 {
            self.ramp_queue -= 1;
            self.mainline_vehicles += 1;
        }
        self.green_remaining = (self.green_remaining - 1.0).max(0.0);

        // Rate-metered release: fractional admissions accumulate until a
        // whole vehicle can merge.
        if self.ramp_inflow_per_tick > 0.0 {
            self.ramp_release_credit += self.ramp_inflow_per_tick;
            while self.ramp_release_credit >= 1.0 && self.ramp_queue > 0 {
                self.ramp_release_credit -= 1.0;
                self.ramp_queue -= 1;
                self.mainline_vehicles += 1;
            }
        }

        // Mainline discharge slows down as occupancy grows.
        let departures = if self.mainline_vehicles > MAINLINE_CAPACITY / 2 {
            1
        } else {
            2
        };
        self.mainline_vehicles = self.mainline_vehicles.saturating_sub(departures);

        // Waiting time accumulates one second per queued vehicle.
        self.ramp_wait += self.ramp_queue as f64;
        if self.mainline_vehicles > MAINLINE_CAPACITY {
            self.mainline_wait += (self.mainline_vehicles - MAINLINE_CAPACITY) as f64;
        }

        Ok(())
    }

    fn close(&mut self) -> Result<(), SimError> {
        self.running = false;
        Ok(())
    }

    fn min_expected_vehicles(&self) -> Result<u32, SimError> {
        self.require_running()?;
        Ok(self.remaining_demand + self.mainline_vehicles + self.ramp_queue)
    }

    fn vehicle_count(&self, edge: &str) -> Result<u32, SimError> {
        self.require_running()?;
        Ok(if self.check_edge(edge)? {
            self.mainline_vehicles
        } else {
            self.ramp_queue
        })
    }

    fn mean_speed(&self, edge: &str) -> Result<f64, SimError> {
        self.require_running()?;
        if self.check_edge(edge)? {
            let occupancy = self.mainline_vehicles as f64 / MAINLINE_CAPACITY as f64;
            Ok((FREE_FLOW_SPEED * (1.0 - occupancy)).max(1.0))
        } else if self.green_remaining >= 1.0 || self.ramp_inflow_per_tick > 0.0 {
            Ok(5.0)
        } else {
            Ok(0.5)
        }
    }

    fn halting_count(&self, edge: &str) -> Result<u32, SimError> {
        self.require_running()?;
        Ok(if self.check_edge(edge)? {
            self.mainline_vehicles.saturating_sub(MAINLINE_CAPACITY)
        } else {
            self.ramp_queue
        })
    }

    fn waiting_time(&self, edge: &str) -> Result<f64, SimError> {
        self.require_running()?;
        Ok(if self.check_edge(edge)? {
            self.mainline_wait
        } else {
            self.ramp_wait
        })
    }

    fn lane_length(&self, lane: &str) -> Result<f64, SimError> {
        self.require_running()?;
        if lane == self.mainline_lane {
            Ok(MAINLINE_LENGTH_M)
        } else if lane == self.ramp_lane {
            Ok(RAMP_LENGTH_M)
        } else {
            Err(SimError::UnknownLane(lane.to_string()))
        }
    }

    fn set_phase_duration(&mut self, signal: &str, seconds: f64) -> Result<(), SimError> {
        self.require_running()?;
        if signal != self.signal {
            return Err(SimError::UnknownSignal(signal.to_string()));
        }
        self.green_remaining = seconds;
        self.issued_commands.push((signal.to_string(), seconds));
        Ok(())
    }

    fn set_travel_time(&mut self, edge: &str, seconds: f64) -> Result<(), SimError> {
        self.require_running()?;
        let is_mainline = self.check_edge(edge)?;
        // A travel time of 1/rate across the 1 s merge section admits
        // `rate` vehicles per tick. Only the ramp edge meters inflow.
        if !is_mainline && seconds > 0.0 {
            self.ramp_inflow_per_tick = 1.0 / seconds;
        }
        self.issued_travel_times.push((edge.to_string(), seconds));
        Ok(())
    }
}
