//! Trains the tabular Q-learning agent on the synthetic ramp-merge model.
//!
//! ```sh
//! cargo run --example train_tabular
//! ```

use ramprl::{
    EnvConfig, PhaseEnv, QTableAgent, QTableConfig, SyntheticSim, Trainer, TrainerConfig,
};

fn main() -> Result<(), ramprl::TrainError> {
    let env_config = EnvConfig::tabular();
    let agent_config = QTableConfig {
        n_actions: env_config.action_dim(),
        ..QTableConfig::default()
    };

    let mut env = PhaseEnv::new(env_config, SyntheticSim::with_defaults(42));
    let mut agent = QTableAgent::new(agent_config, 42);

    let trainer = Trainer::new(TrainerConfig {
        episodes: 50,
        max_steps: 200,
    });
    let summary = trainer.run(&mut env, &mut agent)?;

    println!("{summary}");
    println!("Q-table rows: {}", agent.table_size());
    Ok(())
}
