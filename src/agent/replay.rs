//! Bounded replay memory for off-policy updates.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::index;

use super::Transition;

/// Most-recent-N buffer of experience tuples.
///
/// Pushing past capacity evicts the oldest entry. Batch sampling is
/// uniform without replacement within one batch; separate batches may
/// overlap.
#[derive(Debug)]
pub struct ReplayMemory {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayMemory {
    /// Creates a memory holding at most `capacity` transitions.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a transition, evicting the oldest once at capacity.
    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Samples `batch_size` distinct transitions uniformly at random.
    ///
    /// Returns `None` when fewer than `batch_size` transitions are stored.
    pub fn sample(&self, rng: &mut StdRng, batch_size: usize) -> Option<Vec<&Transition>> {
        if self.buffer.len() < batch_size {
            return None;
        }
        let picks = index::sample(rng, self.buffer.len(), batch_size);
        Some(picks.iter().map(|i| &self.buffer[i]).collect())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates transitions from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn transition(tag: f64) -> Transition {
        Transition {
            state: vec![tag; 4],
            action: 0,
            reward: tag,
            next_state: vec![tag; 4],
            done: false,
        }
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut memory = ReplayMemory::new(5);
        for i in 0..20 {
            memory.push(transition(i as f64));
        }
        assert_eq!(memory.len(), 5);
    }

    #[test]
    fn capacity_plus_one_inserts_evict_the_oldest() {
        let mut memory = ReplayMemory::new(5);
        for i in 0..6 {
            memory.push(transition(i as f64));
        }
        assert!(memory.iter().all(|t| t.reward != 0.0));
        assert_eq!(memory.iter().next().unwrap().reward, 1.0);
    }

    #[test]
    fn sample_requires_a_full_batch() {
        let mut memory = ReplayMemory::new(100);
        let mut rng = StdRng::seed_from_u64(3);
        for i in 0..7 {
            memory.push(transition(i as f64));
        }
        assert!(memory.sample(&mut rng, 8).is_none());
        assert!(memory.sample(&mut rng, 7).is_some());
    }

    #[test]
    fn sample_has_no_duplicates_within_one_batch() {
        let mut memory = ReplayMemory::new(100);
        let mut rng = StdRng::seed_from_u64(3);
        for i in 0..50 {
            memory.push(transition(i as f64));
        }
        let batch = memory.sample(&mut rng, 32).unwrap();
        let mut rewards: Vec<i64> = batch.iter().map(|t| t.reward as i64).collect();
        rewards.sort_unstable();
        rewards.dedup();
        assert_eq!(rewards.len(), 32);
    }
}
