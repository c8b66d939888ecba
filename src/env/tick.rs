//! Tick-stepped environment: one simulator tick per `step`.

use crate::action::{ControlError, MeterControl};
use crate::config::EnvConfig;
use crate::env::{Environment, StepResult};
use crate::metrics::RewardWindow;
use crate::reward::RewardTracker;
use crate::sim::{SimError, TrafficSim};
use crate::state::StateObserver;

/// How many recent step rewards the convergence window retains.
const REWARD_HISTORY: usize = 100;

/// Environment that advances the simulator by exactly one tick per step.
///
/// An episode ends when the scenario runs out of vehicles, when the
/// configured step ceiling is reached, or when simulator communication
/// fails (absorbed as termination with reward 0).
#[derive(Debug)]
pub struct TickEnv<S: TrafficSim> {
    sim: S,
    config: EnvConfig,
    observer: StateObserver,
    control: MeterControl,
    reward: RewardTracker,
    rewards: RewardWindow,
    steps: u32,
    last_state: Vec<f64>,
}

impl<S: TrafficSim> TickEnv<S> {
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
            steps: 0,
            last_state: vec![0.0; state_dim],
        }
    }

    /// Steps completed in the current episode.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Read access to the underlying simulator.
    pub fn sim(&self) -> &S {
        &self.sim
    }

    /// Termination result for an absorbed simulator failure: the last
    /// observed state, zero reward, episode done.
    fn terminal(&self) -> StepResult {
        StepResult {
            state: self.last_state.clone(),
            reward: 0.0,
            done: true,
        }
    }

    fn advance(&mut self, action: usize) -> Result<StepResult, SimError> {
        self.control
            .apply(&mut self.sim, action)
            .map_err(|e| match e {
                // Index was validated by the caller.
                ControlError::InvalidAction { .. } => unreachable!("action index pre-validated"),
                ControlError::Sim(e) => e,
            })?;
        self.sim.step_once()?;
        self.steps += 1;

        let done =
            self.steps >= self.config.max_steps || self.sim.min_expected_vehicles()? == 0;

        let state = self.observer.observe(&self.sim)?;
        let reward = self.reward.update(&self.sim)?;
        self.rewards.push(reward);
        self.last_state = state.clone();

        Ok(StepResult {
            state,
            reward,
            done,
        })
    }
}

impl<S: TrafficSim> Environment for TickEnv<S> {
    fn reset(&mut self) -> Result<Vec<f64>, SimError> {
        let _ = self.sim.close();
        self.sim.start()?;
        self.steps = 0;
        self.reward.reset();
        self.rewards.clear();
        let state = self.observer.observe(&self.sim)?;
        self.last_state = state.clone();
        Ok(state)
    }

    fn step(&mut self, action: usize) -> Result<StepResult, ControlError> {
        // Precondition: the action must index the active table.
        self.control.check(action)?;

        match self.advance(action) {
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

impl<S: TrafficSim> Drop for TickEnv<S> {
    fn drop(&mut self) {
        let _ = self.sim.close();
    }
}
