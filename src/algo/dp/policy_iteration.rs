use crate::{
    algo::{ensure_dims, Agent, Metrics},
    env::Environment,
    error::Result,
    util::sanitize,
};

use super::{accept_value, expected_return, greedy, max_change, require_model, PlanningConfig};

const NAME: &str = "Policy Iteration";

/// A policy iteration agent
///
/// Alternates a bounded evaluation of the current deterministic policy with a greedy
/// improvement step, until improvement no longer changes the policy. As a dynamic
/// programming approach it requires a full model of the environment's dynamics.
pub struct PolicyIteration {
    values: Vec<f64>,
    policy: Vec<usize>,
    gamma: f64,
    theta: f64,
    eval_sweeps: usize,
    dims: (usize, usize),
    delta_history: Vec<f64>,
    policy_stable_history: Vec<bool>,
}

impl PolicyIteration {
    /// Initialize a new `PolicyIteration` agent with all values 0 and action 0 everywhere
    ///
    /// **Errors** if `env` has no transition model
    pub fn new(env: &dyn Environment, config: PlanningConfig) -> Result<Self> {
        require_model(env, NAME)?;
        config.validate()?;
        let dims = env.dims();
        Ok(Self {
            values: vec![0.0; dims.0],
            policy: vec![0; dims.0],
            gamma: config.gamma,
            theta: config.theta,
            eval_sweeps: config.eval_sweeps,
            dims,
            delta_history: Vec::new(),
            policy_stable_history: Vec::new(),
        })
    }

    /// Evaluate the current policy for at most `max_sweeps` synchronous sweeps, starting
    /// from the stored values
    pub fn evaluate(&mut self, env: &dyn Environment, max_sweeps: usize) -> Result<()> {
        ensure_dims(self.dims, env)?;
        let model = require_model(env, NAME)?;

        for _ in 0..max_sweeps {
            let new_values: Vec<f64> = (0..self.dims.0)
                .map(|s| {
                    let value = expected_return(model, &self.values, self.gamma, s, self.policy[s]);
                    accept_value(self.values[s], value)
                })
                .collect();

            let delta = max_change(&self.values, &new_values);
            self.values = new_values;
            self.delta_history.push(delta);
            log::debug!("{NAME}: evaluation sweep delta {delta}");

            if delta < self.theta {
                break;
            }
        }

        Ok(())
    }

    /// Make the policy greedy with respect to the current values
    ///
    /// **Returns** whether the policy was already greedy, i.e. stable
    pub fn improve(&mut self, env: &dyn Environment) -> Result<bool> {
        ensure_dims(self.dims, env)?;
        let model = require_model(env, NAME)?;

        let mut stable = true;
        for s in 0..self.dims.0 {
            let (action, _) = greedy(model, &self.values, self.gamma, s, self.dims.1);
            if action != self.policy[s] {
                stable = false;
                self.policy[s] = action;
            }
        }

        self.policy_stable_history.push(stable);
        if stable {
            log::info!(
                "{NAME}: policy stable after {} improvements",
                self.policy_stable_history.len()
            );
        }

        Ok(stable)
    }
}

impl Agent for PolicyIteration {
    fn name(&self) -> &'static str {
        NAME
    }

    fn dims(&self) -> (usize, usize) {
        self.dims
    }

    fn train_iteration(&mut self, env: &mut dyn Environment) -> Result<Option<f64>> {
        self.evaluate(env, self.eval_sweeps)?;
        self.improve(env)?;
        Ok(None)
    }

    fn is_converged(&self) -> bool {
        self.policy_stable_history.last().copied().unwrap_or(false)
    }

    fn choose_action(&mut self, state: usize) -> usize {
        self.policy.get(state).copied().unwrap_or_default()
    }

    fn policy(&self) -> Option<Vec<usize>> {
        Some(self.policy.clone())
    }

    fn values(&self) -> Vec<f64> {
        sanitize(&self.values)
    }

    fn metrics(&self) -> Metrics {
        Metrics {
            delta_history: Some(self.delta_history.clone()),
            policy_stable_history: Some(self.policy_stable_history.clone()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        env::tests::MockEnv,
        error::Error,
        gym::{GridWorld, MountainCar},
    };

    #[test]
    fn requires_transition_model() {
        let result = PolicyIteration::new(&MountainCar::new(), PlanningConfig::default());
        assert_eq!(
            result.err(),
            Some(Error::ModelRequired {
                algorithm: "Policy Iteration"
            })
        );
    }

    #[test]
    fn finds_way_down_the_corridor() {
        let mut env = MockEnv::new(4);
        let mut agent = PolicyIteration::new(&env, PlanningConfig::default()).unwrap();
        agent.train(&mut env, 20).unwrap();

        assert!(agent.is_converged());
        assert_eq!(agent.policy().unwrap()[..3], [1, 1, 1]);
        let stable = agent.metrics().policy_stable_history.unwrap();
        assert_eq!(stable.last(), Some(&true));
        assert!(stable[..stable.len() - 1].iter().all(|&s| !s));
    }

    #[test]
    fn grid_world_policy_reaches_goal() {
        let mut env = GridWorld::new(5);
        let mut agent = PolicyIteration::new(&env, PlanningConfig::default()).unwrap();
        agent.train(&mut env, 100).unwrap();
        assert!(agent.is_converged(), "Policy iteration stabilizes");

        let policy = agent.policy().unwrap();
        let mut state = env.reset();
        for _ in 0..8 {
            let step = env.step(policy[state]);
            state = step.state;
            if step.terminal {
                return;
            }
        }
        panic!("Greedy policy did not reach the goal on a shortest path");
    }

    #[test]
    fn improvement_keeps_first_of_tied_actions() {
        let env = MockEnv::new(3);
        let mut agent = PolicyIteration::new(&env, PlanningConfig::default()).unwrap();
        agent.policy = vec![1, 1, 1];
        agent.improve(&env).unwrap();
        // With all values 0, state 0 sees no difference between its actions
        assert_eq!(agent.policy, vec![0, 1, 1]);
    }
}
