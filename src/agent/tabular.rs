//! Dictionary-based Q-learning over discretized states.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Agent, AgentError, Transition};
use crate::state::{discretize, state_index};

/// Hyperparameters for the tabular agent.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QTableConfig {
    /// Number of discrete actions.
    pub n_actions: usize,
    /// Bins per discretized state axis.
    pub n_bins: usize,
    /// Learning rate α.
    pub alpha: f64,
    /// Discount factor γ.
    pub gamma: f64,
    /// Initial exploration rate ε₀.
    pub epsilon: f64,
    /// Exploration floor.
    pub epsilon_min: f64,
    /// Multiplicative per-episode decay.
    pub epsilon_decay: f64,
}

impl Default for QTableConfig {
    fn default() -> Self {
        Self {
            n_actions: 4,
            n_bins: 10,
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.995,
        }
    }
}

/// Q-learning agent over a lazily-populated Q-table.
///
/// States are keyed by the mixed-radix index of the first two discretized
/// state features (mainline occupancy, ramp occupancy); rows are created
/// zeroed on first access. Greedy action selection breaks ties by first
/// occurrence.
#[derive(Debug)]
pub struct QTableAgent {
    config: QTableConfig,
    q: HashMap<usize, Vec<f64>>,
    epsilon: f64,
    rng: StdRng,
}

impl QTableAgent {
    /// Creates an agent with a seeded exploration RNG.
    ///
    /// # Panics
    ///
    /// Panics when `n_actions` or `n_bins` is zero: an empty Q-row makes
    /// every `max Q[s',·]` bootstrap `-inf` and zero bins make every state
    /// indistinguishable.
    pub fn new(config: QTableConfig, seed: u64) -> Self {
        assert!(config.n_actions > 0, "n_actions must be at least 1");
        assert!(config.n_bins > 0, "n_bins must be at least 1");
        let epsilon = config.epsilon;
        Self {
            config,
            q: HashMap::new(),
            epsilon,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Discretized table key for a normalized state vector.
    pub fn state_key(&self, state: &[f64]) -> usize {
        let mainline = state.first().copied().unwrap_or(0.0);
        let ramp = state.get(1).copied().unwrap_or(0.0);
        state_index(
            discretize(mainline, self.config.n_bins),
            discretize(ramp, self.config.n_bins),
            self.config.n_bins,
        )
    }

    /// Q-value row for a state, created zeroed on first access.
    pub fn q_row(&mut self, key: usize) -> &mut Vec<f64> {
        let n_actions = self.config.n_actions;
        self.q.entry(key).or_insert_with(|| vec![0.0; n_actions])
    }

    /// Current Q-value for `(key, action)`.
    pub fn q_value(&mut self, key: usize, action: usize) -> f64 {
        self.q_row(key)[action]
    }

    /// Greedy action for a state key (first occurrence wins ties).
    pub fn greedy(&mut self, key: usize) -> usize {
        argmax_first(self.q_row(key))
    }

    /// One-step Q-learning update:
    /// `Q[s,a] += α (r + γ max Q[s',·] (1 − done) − Q[s,a])`.
    pub fn update(&mut self, key: usize, action: usize, reward: f64, next_key: usize, done: bool) {
        let next_max = self
            .q_row(next_key)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let not_done = if done { 0.0 } else { 1.0 };
        let target = reward + self.config.gamma * next_max * not_done;

        let alpha = self.config.alpha;
        let row = self.q_row(key);
        row[action] += alpha * (target - row[action]);
    }

    /// Number of state rows materialized so far.
    pub fn table_size(&self) -> usize {
        self.q.len()
    }
}

impl Agent for QTableAgent {
    fn act(&mut self, state: &[f64]) -> usize {
        if self.rng.gen::<f64>() < self.epsilon {
            return self.rng.gen_range(0..self.config.n_actions);
        }
        let key = self.state_key(state);
        self.greedy(key)
    }

    fn observe(&mut self, t: Transition) -> Result<(), AgentError> {
        let key = self.state_key(&t.state);
        let next_key = self.state_key(&t.next_state);
        self.update(key, t.action, t.reward, next_key, t.done);
        Ok(())
    }

    fn end_episode(&mut self) {
        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
    }

    fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

/// Index of the maximum element, first occurrence on ties.
fn argmax_first(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_agent() -> QTableAgent {
        QTableAgent::new(QTableConfig::default(), 42)
    }

    #[test]
    fn rows_are_created_lazily_and_zeroed() {
        let mut agent = make_agent();
        assert_eq!(agent.table_size(), 0);
        assert_eq!(agent.q_row(29), &vec![0.0; 4]);
        assert_eq!(agent.table_size(), 1);
    }

    #[test]
    fn update_matches_reference_scenario() {
        // alpha=0.1, gamma=0.9, r=5, next row [1,2,3,0], done=false
        // => new Q = old + 0.1 * (5 + 0.9*3 - old)
        let mut agent = make_agent();
        *agent.q_row(1) = vec![1.0, 2.0, 3.0, 0.0];
        let old = agent.q_value(0, 2);
        agent.update(0, 2, 5.0, 1, false);
        let expected = old + 0.1 * (5.0 + 0.9 * 3.0 - old);
        assert!((agent.q_value(0, 2) - expected).abs() < 1e-12);
    }

    #[test]
    fn done_masks_the_bootstrap_term() {
        let mut agent = make_agent();
        *agent.q_row(1) = vec![100.0, 100.0, 100.0, 100.0];
        agent.update(0, 0, 5.0, 1, true);
        assert!((agent.q_value(0, 0) - 0.1 * 5.0).abs() < 1e-12);
    }

    #[test]
    fn repeated_updates_contract_toward_td_target() {
        let mut agent = make_agent();
        *agent.q_row(1) = vec![1.0, 2.0, 3.0, 0.0];
        let target = 5.0 + 0.9 * 3.0;

        let mut prev_gap = (target - agent.q_value(0, 2)).abs();
        for _ in 0..50 {
            agent.update(0, 2, 5.0, 1, false);
            let gap = (target - agent.q_value(0, 2)).abs();
            assert!(gap <= prev_gap, "update moved away from the TD target");
            prev_gap = gap;
        }
        assert!(prev_gap < 0.05);
    }

    #[test]
    fn epsilon_decay_closed_form() {
        let cfg = QTableConfig::default();
        let mut agent = QTableAgent::new(cfg.clone(), 1);
        let k = 100;
        for _ in 0..k {
            agent.end_episode();
        }
        let expected = (cfg.epsilon * cfg.epsilon_decay.powi(k)).max(cfg.epsilon_min);
        assert!((agent.epsilon() - expected).abs() < 1e-12);
    }

    #[test]
    fn epsilon_never_drops_below_floor() {
        let mut agent = make_agent();
        for _ in 0..10_000 {
            agent.end_episode();
        }
        assert!((agent.epsilon() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn greedy_breaks_ties_by_first_occurrence() {
        let mut agent = make_agent();
        *agent.q_row(0) = vec![1.0, 3.0, 3.0, 0.0];
        assert_eq!(agent.greedy(0), 1);
        *agent.q_row(0) = vec![0.0; 4];
        assert_eq!(agent.greedy(0), 0);
    }

    #[test]
    #[should_panic(expected = "n_actions")]
    fn zero_actions_is_rejected_at_construction() {
        let cfg = QTableConfig {
            n_actions: 0,
            ..QTableConfig::default()
        };
        QTableAgent::new(cfg, 1);
    }

    #[test]
    #[should_panic(expected = "n_bins")]
    fn zero_bins_is_rejected_at_construction() {
        let cfg = QTableConfig {
            n_bins: 0,
            ..QTableConfig::default()
        };
        QTableAgent::new(cfg, 1);
    }

    #[test]
    fn state_key_uses_mixed_radix_encoding() {
        let agent = make_agent();
        assert_eq!(agent.state_key(&[0.25, 0.95, 0.5, 0.5]), 29);
    }

    #[test]
    fn greedy_act_picks_best_known_action() {
        let mut agent = make_agent();
        agent.epsilon = 0.0;
        let state = [0.25, 0.95, 0.5, 0.5];
        let key = agent.state_key(&state);
        *agent.q_row(key) = vec![0.0, 0.0, 7.0, 0.0];
        assert_eq!(agent.act(&state), 2);
    }
}
