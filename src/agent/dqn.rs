//! DQN agent with target network and replay memory (feature `dqn`).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tch::nn::{Module, OptimizerConfig};
use tch::{nn, Device, Reduction, TchError, Tensor};

use super::replay::ReplayMemory;
use super::{Agent, AgentError, Transition};

/// Hyperparameters for the DQN agent.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DqnConfig {
    /// Number of state features.
    pub state_dim: usize,
    /// Number of discrete actions.
    pub action_dim: usize,
    /// Hidden layer width (two layers of this size).
    pub hidden_dim: usize,
    /// Discount factor γ.
    pub gamma: f64,
    /// Initial exploration rate ε₀.
    pub epsilon: f64,
    /// Exploration floor.
    pub epsilon_min: f64,
    /// Multiplicative decay applied once per replay pass.
    pub epsilon_decay: f64,
    /// Adam learning rate.
    pub learning_rate: f64,
    /// Replay memory capacity.
    pub memory_capacity: usize,
    /// Replay batch size.
    pub batch_size: usize,
    /// Hard target-network sync, in replay passes. Zero disables the
    /// automatic sync; [`DqnAgent::update_target_model`] still works.
    pub target_update_freq: u32,
}

impl DqnConfig {
    /// Defaults for a given state/action space.
    pub fn new(state_dim: usize, action_dim: usize) -> Self {
        Self {
            state_dim,
            action_dim,
            hidden_dim: 24,
            gamma: 0.9,
            epsilon: 0.1,
            epsilon_min: 0.01,
            epsilon_decay: 0.995,
            learning_rate: 1e-3,
            memory_capacity: 10_000,
            batch_size: 32,
            target_update_freq: 10,
        }
    }
}

/// Feed-forward Q-network: `state_dim → hidden → hidden → action_dim`
/// with ReLU activations and a linear output head.
struct QNetwork {
    vs: nn::VarStore,
    net: nn::Sequential,
}

impl QNetwork {
    fn new(config: &DqnConfig, device: Device) -> Self {
        let vs = nn::VarStore::new(device);
        let p = &vs.root();
        let hidden = config.hidden_dim as i64;
        let net = nn::seq()
            .add(nn::linear(
                p / "l1",
                config.state_dim as i64,
                hidden,
                Default::default(),
            ))
            .add_fn(|x| x.relu())
            .add(nn::linear(p / "l2", hidden, hidden, Default::default()))
            .add_fn(|x| x.relu())
            .add(nn::linear(
                p / "out",
                hidden,
                config.action_dim as i64,
                Default::default(),
            ));
        Self { vs, net }
    }

    fn forward(&self, x: &Tensor) -> Tensor {
        self.net.forward(x)
    }
}

/// Deep Q-learning agent.
///
/// Keeps an online network for action selection and a target network used
/// for the bootstrapped next-state value. The target is hard-synced (full
/// weight copy) every [`DqnConfig::target_update_freq`] replay passes.
/// Epsilon decays once per replay pass, not per episode.
pub struct DqnAgent {
    config: DqnConfig,
    online: QNetwork,
    target: QNetwork,
    memory: ReplayMemory,
    epsilon: f64,
    replay_passes: u32,
    opt: nn::Optimizer,
    rng: StdRng,
}

impl DqnAgent {
    /// Creates an agent with freshly initialized networks; the target
    /// network starts as an exact copy of the online one.
    pub fn new(config: DqnConfig, device: Device, seed: u64) -> Result<Self, TchError> {
        let online = QNetwork::new(&config, device);
        let mut target = QNetwork::new(&config, device);
        target.vs.copy(&online.vs)?;

        let opt = nn::Adam::default().build(&online.vs, config.learning_rate)?;
        let epsilon = config.epsilon;
        let memory = ReplayMemory::new(config.memory_capacity);

        Ok(Self {
            config,
            online,
            target,
            memory,
            epsilon,
            replay_passes: 0,
            opt,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Records a transition in replay memory.
    pub fn remember(&mut self, transition: Transition) {
        self.memory.push(transition);
    }

    /// Number of stored transitions.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Q-values from a single-state online-network inference.
    pub fn q_values(&self, state: &[f64]) -> Vec<f64> {
        let input = state_tensor(state);
        let q = tch::no_grad(|| self.online.forward(&input));
        q.squeeze_dim(0).into()
    }

    /// Q-values from a single-state target-network inference.
    pub fn target_q_values(&self, state: &[f64]) -> Vec<f64> {
        let input = state_tensor(state);
        let q = tch::no_grad(|| self.target.forward(&input));
        q.squeeze_dim(0).into()
    }

    /// Copies online-network weights into the target network.
    pub fn update_target_model(&mut self) -> Result<(), TchError> {
        self.target.vs.copy(&self.online.vs)
    }

    /// One replay pass: sample a batch, regress the online network toward
    /// TD targets, decay epsilon, and periodically sync the target network.
    ///
    /// TD targets bootstrap from the target network, discounted by γ and
    /// masked by `(1 − done)`. Only the chosen-action column of the target
    /// matrix differs from the online network's own (detached) predictions,
    /// so the gradient flows through the taken action alone. No-op while
    /// the memory holds less than one full batch.
    pub fn replay(&mut self) -> Result<(), TchError> {
        let batch_size = self.config.batch_size;
        let Some(batch) = self.memory.sample(&mut self.rng, batch_size) else {
            return Ok(());
        };

        let state_dim = self.config.state_dim as i64;
        let n = batch.len() as i64;

        let mut states = Vec::with_capacity(batch.len() * self.config.state_dim);
        let mut next_states = Vec::with_capacity(batch.len() * self.config.state_dim);
        let mut actions = Vec::with_capacity(batch.len());
        let mut rewards = Vec::with_capacity(batch.len());
        let mut not_done = Vec::with_capacity(batch.len());
        for t in &batch {
            states.extend(t.state.iter().map(|v| *v as f32));
            next_states.extend(t.next_state.iter().map(|v| *v as f32));
            actions.push(t.action as i64);
            rewards.push(t.reward as f32);
            not_done.push(if t.done { 0.0f32 } else { 1.0 });
        }

        let states = Tensor::from_slice(&states).reshape([n, state_dim]);
        let next_states = Tensor::from_slice(&next_states).reshape([n, state_dim]);
        let actions = Tensor::from_slice(&actions);
        let rewards = Tensor::from_slice(&rewards);
        let not_done = Tensor::from_slice(&not_done);

        // Bootstrapped TD targets from the target network.
        let (next_max, _) =
            tch::no_grad(|| self.target.forward(&next_states)).max_dim(1, false);
        let td_targets = rewards + next_max * not_done * self.config.gamma;

        // Overwrite only the chosen-action column; every other column keeps
        // the online network's own prediction so its loss contribution is zero.
        let target_q = tch::no_grad(|| self.online.forward(&states))
            .scatter(1, &actions.unsqueeze(1), &td_targets.unsqueeze(1));

        let predicted = self.online.forward(&states);
        let loss = predicted.mse_loss(&target_q, Reduction::Mean);
        self.opt.backward_step(&loss);

        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);

        self.replay_passes += 1;
        let freq = self.config.target_update_freq;
        if freq > 0 && self.replay_passes % freq == 0 {
            self.update_target_model()?;
        }
        Ok(())
    }

    /// Saves online-network weights.
    pub fn save_weights(&self, path: impl AsRef<std::path::Path>) -> Result<(), TchError> {
        self.online.vs.save(path)
    }

    /// Loads weights into both the online and target networks.
    pub fn load_weights(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), TchError> {
        self.online.vs.load(path.as_ref())?;
        self.update_target_model()
    }
}

impl Agent for DqnAgent {
    fn act(&mut self, state: &[f64]) -> usize {
        if self.rng.gen::<f64>() < self.epsilon {
            return self.rng.gen_range(0..self.config.action_dim);
        }
        let input = state_tensor(state);
        let q = tch::no_grad(|| self.online.forward(&input));
        q.argmax(-1, false).int64_value(&[0]) as usize
    }

    fn observe(&mut self, transition: Transition) -> Result<(), AgentError> {
        self.remember(transition);
        if self.memory.len() >= self.config.batch_size {
            self.replay()?;
        }
        Ok(())
    }

    fn end_episode(&mut self) {
        // Exploration decays per replay pass for this agent.
    }

    fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

fn state_tensor(state: &[f64]) -> Tensor {
    let values: Vec<f32> = state.iter().map(|v| *v as f32).collect();
    Tensor::from_slice(&values).unsqueeze(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> DqnConfig {
        DqnConfig {
            batch_size: 4,
            memory_capacity: 64,
            target_update_freq: 2,
            ..DqnConfig::new(5, 3)
        }
    }

    fn transition(reward: f64, done: bool) -> Transition {
        Transition {
            state: vec![0.1, 0.2, 0.3, 0.4, 0.5],
            action: 1,
            reward,
            next_state: vec![0.2, 0.3, 0.4, 0.5, 0.6],
            done,
        }
    }

    #[test]
    fn q_values_match_action_dim() {
        let agent = DqnAgent::new(small_config(), Device::Cpu, 7).unwrap();
        let q = agent.q_values(&[0.0; 5]);
        assert_eq!(q.len(), 3);
        assert!(q.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn act_returns_valid_action() {
        let mut agent = DqnAgent::new(small_config(), Device::Cpu, 7).unwrap();
        for _ in 0..50 {
            let a = agent.act(&[0.1; 5]);
            assert!(a < 3);
        }
    }

    #[test]
    fn replay_is_a_noop_until_batch_is_full() {
        let mut agent = DqnAgent::new(small_config(), Device::Cpu, 7).unwrap();
        let before = agent.epsilon();
        agent.remember(transition(1.0, false));
        agent.replay().unwrap();
        assert_eq!(agent.epsilon(), before, "epsilon decayed without a batch");
    }

    #[test]
    fn replay_decays_epsilon_once_per_pass() {
        let cfg = small_config();
        let mut agent = DqnAgent::new(cfg.clone(), Device::Cpu, 7).unwrap();
        for _ in 0..cfg.batch_size {
            agent.remember(transition(1.0, false));
        }
        agent.replay().unwrap();
        let expected = cfg.epsilon * cfg.epsilon_decay;
        assert!((agent.epsilon() - expected).abs() < 1e-12);
    }

    #[test]
    fn replay_updates_online_network() {
        let mut agent = DqnAgent::new(small_config(), Device::Cpu, 7).unwrap();
        for i in 0..8 {
            agent.remember(transition(i as f64, i % 4 == 3));
        }
        let before = agent.q_values(&[0.1, 0.2, 0.3, 0.4, 0.5]);
        for _ in 0..10 {
            agent.replay().unwrap();
        }
        let after = agent.q_values(&[0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_ne!(before, after, "gradient steps left the network unchanged");
    }

    #[test]
    fn target_network_hard_syncs_at_update_freq() {
        // small_config syncs every 2 replay passes.
        let mut agent = DqnAgent::new(small_config(), Device::Cpu, 7).unwrap();
        for i in 0..8 {
            agent.remember(transition(i as f64, i % 4 == 3));
        }
        let state = [0.1, 0.2, 0.3, 0.4, 0.5];

        agent.replay().unwrap();
        let online = agent.q_values(&state);
        let target = agent.target_q_values(&state);
        assert_ne!(online, target, "target moved before the sync point");

        agent.replay().unwrap();
        let online = agent.q_values(&state);
        let target = agent.target_q_values(&state);
        for (x, y) in online.iter().zip(&target) {
            assert!((x - y).abs() < 1e-12, "hard sync was not an exact copy");
        }
    }

    #[test]
    fn zero_update_freq_disables_auto_sync() {
        let cfg = DqnConfig {
            target_update_freq: 0,
            ..small_config()
        };
        let mut agent = DqnAgent::new(cfg, Device::Cpu, 7).unwrap();
        for i in 0..8 {
            agent.remember(transition(i as f64, i % 4 == 3));
        }
        for _ in 0..5 {
            agent.replay().unwrap();
        }
        let state = [0.1, 0.2, 0.3, 0.4, 0.5];
        assert_ne!(
            agent.q_values(&state),
            agent.target_q_values(&state),
            "target network synced despite freq 0"
        );
    }

    #[test]
    fn save_and_load_round_trip() {
        let agent = DqnAgent::new(small_config(), Device::Cpu, 7).unwrap();
        let path = std::env::temp_dir().join("ramprl_dqn_weights_test.ot");
        agent.save_weights(&path).unwrap();

        let mut restored = DqnAgent::new(small_config(), Device::Cpu, 8).unwrap();
        restored.load_weights(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let state = [0.3, 0.1, 0.2, 0.4, 0.0];
        let a = agent.q_values(&state);
        let b = restored.q_values(&state);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6);
        }
    }
}
