use std::{error::Error, fs, path::Path};

use rl_lab::{
    algo::{Agent, PlanningConfig, ValueIteration},
    gym::FrozenLake,
};

const MAX_SWEEPS: usize = 1000;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let path = Path::new("demos/value_iteration_frozen_lake");

    let mut env = FrozenLake::new(4).seeded(0);
    let mut agent = ValueIteration::new(&env, PlanningConfig::default())?;
    agent.train(&mut env, MAX_SWEEPS)?;

    println!("Converged after {} sweeps", agent.delta_history().len());

    fs::create_dir_all(path.join("out"))?;

    let mut wtr = csv::Writer::from_path(path.join("out/deltas.csv"))?;
    wtr.write_record(["sweep", "delta"])?;
    for (i, delta) in agent.delta_history().iter().enumerate() {
        wtr.write_record(&[i.to_string(), delta.to_string()])?;
    }
    wtr.flush()?;

    let policy = agent.policy().unwrap_or_default();
    let values = agent.values();
    let arrows = ['^', '>', 'v', '<'];
    for row in 0..4 {
        let line = (0..4)
            .map(|col| {
                let s = row * 4 + col;
                if env.holes().contains(&s) {
                    "  H   ".to_string()
                } else if s == env.goal() {
                    "  G   ".to_string()
                } else {
                    format!("{} {:+.2}", arrows[policy[s]], values[s])
                }
            })
            .collect::<Vec<_>>();
        println!("{}", line.join(" | "));
    }

    Ok(())
}
