//! Phase-stepped environment: one full metering interval per `step`.

use crate::action::{ControlError, MeterControl};
use crate::config::EnvConfig;
use crate::env::{Environment, StepResult};
use crate::metrics::RewardWindow;
use crate::reward::RewardTracker;
use crate::sim::{SimError, TrafficSim};
use crate::state::StateObserver;

const REWARD_HISTORY: usize = 100;

/// Environment that runs the simulator forward for a whole metering
/// interval per step: the chosen green phase (one tick per second of green
/// time) under [`ActionMode::GreenPhase`], or a fixed tick count under
/// [`ActionMode::InflowRate`].
///
/// Exhaustion is checked before every tick; if the scenario runs dry (or
/// the simulator fails) mid-interval, the step returns immediately with
/// reward 0 and `done`. No reward is computed from partial progress.
///
/// [`ActionMode::GreenPhase`]: crate::config::ActionMode::GreenPhase
/// [`ActionMode::InflowRate`]: crate::config::ActionMode::InflowRate
#[derive(Debug)]
pub struct PhaseEnv<S: TrafficSim> {
    sim: S,
    config: EnvConfig,
    observer: StateObserver,
    control: MeterControl,
    reward: RewardTracker,
    rewards: RewardWindow,
    ticks: u64,
    last_state: Vec<f64>,
}

impl<S: TrafficSim> PhaseEnv<S> {
    /// Creates the environment around an owned simulator session handle.
    pub fn new(config: EnvConfig, sim: S) -> Self {
        let observer = StateObserver::new(config.clone());
        let control = MeterControl::from_config(&config);
        let reward = RewardTracker::new(&config);
        let state_dim = config.state_dim();
        Self {
            sim,
            config,
            observer,
            control,
            reward,
            rewards: RewardWindow::new(REWARD_HISTORY),
            ticks: 0,
            last_state: vec![0.0; state_dim],
        }
    }

    /// Simulator ticks consumed this episode.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Read access to the underlying simulator.
    pub fn sim(&self) -> &S {
        &self.sim
    }

    fn terminal(&self) -> StepResult {
        StepResult {
            state: self.last_state.clone(),
            reward: 0.0,
            done: true,
        }
    }

    /// Runs the full metering interval, checking for exhaustion before
    /// every tick.
    fn run_interval(&mut self, action: usize, ticks: u32) -> Result<StepResult, SimError> {
        self.control
            .apply(&mut self.sim, action)
            .map_err(|e| match e {
                // Index was validated by the caller.
                ControlError::InvalidAction { .. } => unreachable!("action index pre-validated"),
                ControlError::Sim(e) => e,
            })?;

        for _ in 0..ticks {
            if self.sim.min_expected_vehicles()? == 0 {
                let state = self.observer.observe(&self.sim)?;
                self.last_state = state.clone();
                return Ok(StepResult {
                    state,
                    reward: 0.0,
                    done: true,
                });
            }
            self.sim.step_once()?;
            self.ticks += 1;
        }

        let state = self.observer.observe(&self.sim)?;
        let reward = self.reward.update(&self.sim)?;
        self.rewards.push(reward);
        self.last_state = state.clone();

        Ok(StepResult {
            state,
            reward,
            done: false,
        })
    }
}

impl<S: TrafficSim> Environment for PhaseEnv<S> {
    fn reset(&mut self) -> Result<Vec<f64>, SimError> {
        let _ = self.sim.close();
        self.sim.start()?;
        self.ticks = 0;
        self.reward.reset();
        self.rewards.clear();
        let state = self.observer.observe(&self.sim)?;
        self.last_state = state.clone();
        Ok(state)
    }

    fn step(&mut self, action: usize) -> Result<StepResult, ControlError> {
        let ticks = self.control.ticks_for(action)?;

        match self.run_interval(action, ticks) {
            Ok(result) => Ok(result),
            // Lost simulator session: the episode is over, not the process.
            Err(_) => Ok(self.terminal()),
        }
    }

    fn check_convergence(&self) -> bool {
        self.rewards.converged(
            self.config.convergence_window,
            self.config.convergence_threshold,
        )
    }

    fn close(&mut self) {
        let _ = self.sim.close();
    }

    fn state_dim(&self) -> usize {
        self.config.state_dim()
    }

    fn action_dim(&self) -> usize {
        self.config.action_dim()
    }
}

impl<S: TrafficSim> Drop for PhaseEnv<S> {
    fn drop(&mut self) {
        let _ = self.sim.close();
    }
}
