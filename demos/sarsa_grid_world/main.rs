use std::{error::Error, fs, path::Path};

use rl_lab::{
    algo::{Agent, SarsaAgent, TabularConfig},
    decay,
    exploration::EpsilonGreedy,
    gym::GridWorld,
};

const NUM_EPISODES: u32 = 500;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let path = Path::new("demos/sarsa_grid_world");

    let mut env = GridWorld::new(5);
    let mut agent = SarsaAgent::new(
        &env,
        TabularConfig {
            exploration: EpsilonGreedy::new(decay::Exponential::new(1e-2, 0.5, 0.01)?),
            alpha: 0.5,
            gamma: 0.9,
            seed: Some(42),
        },
    )?;

    fs::create_dir_all(path.join("out"))?;

    let mut wtr = csv::Writer::from_path(path.join("out/data.csv"))?;
    wtr.write_record(["episode", "return", "steps"])?;

    let mut steps = 0;
    for i in 0..NUM_EPISODES {
        let total = agent.train_episode(&mut env)?;
        let step_count = agent.metrics().step_count;
        wtr.write_record(&[i.to_string(), total.to_string(), (step_count - steps).to_string()])?;
        steps = step_count;
    }

    wtr.flush()?;

    let metrics = agent.metrics();
    println!(
        "Mean return {:.2}, last return {:.2}",
        metrics.mean_return(),
        metrics.latest_return()
    );

    Ok(())
}
