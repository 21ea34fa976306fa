use std::error::Error;

use rl_lab::{
    config::{AlgorithmKind, EnvironmentKind, Hyperparams, SessionConfig},
    session::default_batch_size,
    Session,
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = SessionConfig {
        environment: EnvironmentKind::Breakout,
        algorithm: AlgorithmKind::QLearning,
        params: Hyperparams {
            episodes: 200,
            ..Default::default()
        },
        seed: Some(7),
    };
    let mut session = Session::new(config)?;

    let total = config.algorithm.iterations(&config.params);
    let batch = default_batch_size(total);
    let mut run = session.training(total);
    loop {
        let progress = run.next_batch(batch)?;
        let Some(last) = progress.last() else {
            break;
        };
        println!(
            "{:>4}/{} episodes, last return {:.1}",
            last.completed,
            last.total,
            last.last_return.unwrap_or_default()
        );
    }
    drop(run);

    let episode = session.rollout(1000)?;
    println!(
        "Greedy rollout: {} steps, return {:.1}, game over: {}",
        episode.len(),
        episode.total_reward(),
        episode.terminated
    );

    println!("{}", serde_json::to_string(&session.snapshot().metrics)?);

    Ok(())
}
