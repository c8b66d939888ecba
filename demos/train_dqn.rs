//! Trains the DQN agent on the synthetic ramp-merge model.
//!
//! ```sh
//! cargo run --example train_dqn --features dqn
//! ```

use tch::Device;

use ramprl::{DqnAgent, DqnConfig, EnvConfig, SyntheticSim, TickEnv, Trainer, TrainerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_config = EnvConfig::metered();
    let agent_config = DqnConfig::new(env_config.state_dim(), env_config.action_dim());

    let mut env = TickEnv::new(env_config, SyntheticSim::with_defaults(42));
    let mut agent = DqnAgent::new(agent_config, Device::Cpu, 42)?;

    let trainer = Trainer::new(TrainerConfig {
        episodes: 20,
        max_steps: 500,
    });
    let summary = trainer.run(&mut env, &mut agent)?;

    println!("{summary}");

    // Weights are not checkpointed during training; persist them manually.
    agent.save_weights("dqn_ramp_meter.ot")?;
    println!("Saved weights to dqn_ramp_meter.ot");
    Ok(())
}
