//! Episode-loop trainer.

use thiserror::Error;

use crate::action::ControlError;
use crate::agent::{Agent, AgentError, Transition};
use crate::env::Environment;
use crate::metrics::TrainingSummary;
use crate::sim::SimError;

/// Errors that abort a training run.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Episode and step budgets for a training run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainerConfig {
    /// Number of episodes to run.
    pub episodes: u32,
    /// Per-episode step cap in the training loop (the environment may
    /// terminate earlier on its own ceiling).
    pub max_steps: u32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            episodes: 200,
            max_steps: 1000,
        }
    }
}

/// Drives the episode loop over one environment/agent pair.
///
/// Per episode: reset, step until `done`, the step cap, or the convergence
/// heuristic; every transition is handed to the agent (which is where the
/// tabular TD update and the neural remember/replay happen). Training ends
/// early only when the convergence heuristic fires. No checkpoints are
/// written; weight save/load stays a manual operation on the agent.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Runs the full training loop and returns the per-episode score curve.
    pub fn run<E, A>(&self, env: &mut E, agent: &mut A) -> Result<TrainingSummary, TrainError>
    where
        E: Environment,
        A: Agent,
    {
        let mut scores = Vec::with_capacity(self.config.episodes as usize);
        let mut early_stopped = false;

        for episode in 0..self.config.episodes {
            let mut state = env.reset()?;
            let mut total_reward = 0.0;
            let mut steps = 0;

            while steps < self.config.max_steps {
                let action = agent.act(&state);
                let result = env.step(action)?;

                agent.observe(Transition {
                    state: state.clone(),
                    action,
                    reward: result.reward,
                    next_state: result.state.clone(),
                    done: result.done,
                })?;

                total_reward += result.reward;
                state = result.state;
                steps += 1;

                if result.done {
                    break;
                }
                if env.check_convergence() {
                    early_stopped = true;
                    break;
                }
            }

            agent.end_episode();
            scores.push(total_reward);
            eprintln!(
                "[Episode {}/{}] score={:.2} steps={} epsilon={:.3}",
                episode + 1,
                self.config.episodes,
                total_reward,
                steps,
                agent.epsilon()
            );

            if early_stopped {
                eprintln!("Early stopping triggered");
                break;
            }
        }

        env.close();
        Ok(TrainingSummary::new(scores, early_stopped))
    }
}
