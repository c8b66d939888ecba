//! Training metrics and the convergence heuristic.

use std::collections::VecDeque;
use std::fmt;

/// Bounded window over the most recent step rewards.
///
/// Backs the early-stop heuristic: an episode is considered converged when
/// the variance over the last `window` rewards drops below a threshold.
/// This is a heuristic signal, not a guarantee of policy convergence.
#[derive(Debug, Clone)]
pub struct RewardWindow {
    rewards: VecDeque<f64>,
    capacity: usize,
}

impl RewardWindow {
    /// Creates a window retaining at most `capacity` rewards.
    pub fn new(capacity: usize) -> Self {
        Self {
            rewards: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a reward, evicting the oldest once full.
    pub fn push(&mut self, reward: f64) {
        if self.rewards.len() == self.capacity {
            self.rewards.pop_front();
        }
        self.rewards.push_back(reward);
    }

    /// Discards all recorded rewards.
    pub fn clear(&mut self) {
        self.rewards.clear();
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Population variance over the most recent `window` rewards, or `None`
    /// if fewer than `window` rewards have been recorded.
    pub fn variance(&self, window: usize) -> Option<f64> {
        if self.rewards.len() < window || window == 0 {
            return None;
        }
        let recent: Vec<f64> = self.rewards.iter().rev().take(window).copied().collect();
        let mean = recent.iter().sum::<f64>() / window as f64;
        let var = recent.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / window as f64;
        Some(var)
    }

    /// True when the last `window` rewards vary less than `threshold`.
    pub fn converged(&self, window: usize, threshold: f64) -> bool {
        matches!(self.variance(window), Some(v) if v < threshold)
    }
}

/// Aggregated view of a training run's score curve.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    /// Total reward per episode, in order.
    pub scores: Vec<f64>,
    /// Whether the convergence heuristic ended training early.
    pub early_stopped: bool,
}

impl TrainingSummary {
    pub fn new(scores: Vec<f64>, early_stopped: bool) -> Self {
        Self {
            scores,
            early_stopped,
        }
    }

    pub fn episodes(&self) -> usize {
        self.scores.len()
    }

    pub fn mean_score(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }

    pub fn best_score(&self) -> f64 {
        self.scores.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn final_score(&self) -> Option<f64> {
        self.scores.last().copied()
    }
}

impl fmt::Display for TrainingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Training Summary ({} episodes) ===", self.episodes())?;
        writeln!(f, "  Mean score:    {:.2}", self.mean_score())?;
        writeln!(f, "  Best score:    {:.2}", self.best_score())?;
        if let Some(last) = self.final_score() {
            writeln!(f, "  Final score:   {last:.2}")?;
        }
        write!(f, "  Early stopped: {}", self.early_stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_never_exceeds_capacity() {
        let mut w = RewardWindow::new(3);
        for i in 0..10 {
            w.push(i as f64);
        }
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn variance_needs_full_window() {
        let mut w = RewardWindow::new(100);
        for _ in 0..19 {
            w.push(1.0);
        }
        assert_eq!(w.variance(20), None);
        w.push(1.0);
        assert_eq!(w.variance(20), Some(0.0));
    }

    #[test]
    fn flat_rewards_converge() {
        let mut w = RewardWindow::new(100);
        for _ in 0..20 {
            w.push(5.0);
        }
        assert!(w.converged(20, 0.01));
    }

    #[test]
    fn noisy_rewards_do_not_converge() {
        let mut w = RewardWindow::new(100);
        for i in 0..20 {
            w.push(if i % 2 == 0 { 0.0 } else { 10.0 });
        }
        assert!(!w.converged(20, 0.01));
    }

    #[test]
    fn variance_uses_most_recent_rewards() {
        let mut w = RewardWindow::new(100);
        for i in 0..20 {
            w.push(i as f64 * 100.0); // old, noisy
        }
        for _ in 0..20 {
            w.push(2.0); // recent, flat
        }
        assert!(w.converged(20, 0.01));
    }

    #[test]
    fn summary_aggregates() {
        let s = TrainingSummary::new(vec![1.0, 3.0, 2.0], false);
        assert_eq!(s.episodes(), 3);
        assert!((s.mean_score() - 2.0).abs() < 1e-12);
        assert_eq!(s.best_score(), 3.0);
        assert_eq!(s.final_score(), Some(2.0));
    }
}
