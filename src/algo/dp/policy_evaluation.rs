use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    algo::{ensure_dims, Agent, Metrics},
    env::Environment,
    error::{Error, Result},
    util::sanitize,
};

use super::{accept_value, expected_return, max_change, require_model, PlanningConfig};

const NAME: &str = "Policy Evaluation";

/// Iterative evaluation of a fixed policy
///
/// Computes the state values of a given, possibly stochastic, policy with synchronous
/// Bellman expectation backups:
///
/// V(s) = Σ<sub>a</sub> π(a|s) Σ<sub>s'</sub> P(s'|s,a) [R + γ V(s')]
pub struct PolicyEvaluation {
    /// `probabilities[s][a]` = π(a|s)
    probabilities: Vec<Vec<f64>>,
    values: Vec<f64>,
    gamma: f64,
    theta: f64,
    dims: (usize, usize),
    delta_history: Vec<f64>,
}

impl PolicyEvaluation {
    /// Evaluate a deterministic policy mapping each state to an action
    ///
    /// **Errors** if `env` has no transition model, or if the policy does not fit the environment
    pub fn new(env: &dyn Environment, policy: &[usize], config: PlanningConfig) -> Result<Self> {
        let n_actions = env.n_actions();
        if let Some(&action) = policy.iter().find(|&&a| a >= n_actions) {
            return Err(Error::InvalidParameter(format!(
                "policy action {action} is outside [0, {n_actions})"
            )));
        }
        let probabilities = policy
            .iter()
            .map(|&a| {
                let mut row = vec![0.0; n_actions];
                row[a] = 1.0;
                row
            })
            .collect();
        Self::stochastic(env, probabilities, config)
    }

    /// Evaluate a stochastic policy given as `probabilities[state][action]`
    ///
    /// **Errors** if `env` has no transition model, or if the policy does not fit the environment
    pub fn stochastic(
        env: &dyn Environment,
        probabilities: Vec<Vec<f64>>,
        config: PlanningConfig,
    ) -> Result<Self> {
        require_model(env, NAME)?;
        config.validate()?;

        let dims = env.dims();
        if probabilities.len() != dims.0 || probabilities.iter().any(|row| row.len() != dims.1) {
            return Err(Error::InvalidParameter(format!(
                "policy must have {} rows of {} action probabilities",
                dims.0, dims.1
            )));
        }
        if let Some(row) = probabilities
            .iter()
            .find(|row| (row.iter().sum::<f64>() - 1.0).abs() > 1e-6)
        {
            return Err(Error::InvalidParameter(format!(
                "policy probabilities {row:?} do not sum to 1"
            )));
        }

        Ok(Self {
            probabilities,
            values: vec![0.0; dims.0],
            gamma: config.gamma,
            theta: config.theta,
            dims,
            delta_history: Vec::new(),
        })
    }

    /// Evaluate a deterministic policy that picks a uniformly random action in every state
    pub fn random(env: &dyn Environment, config: PlanningConfig) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let n_actions = env.n_actions();
        let policy: Vec<usize> = (0..env.n_states())
            .map(|_| rng.gen_range(0..n_actions))
            .collect();
        Self::new(env, &policy, config)
    }

    /// Run one synchronous sweep over all states
    ///
    /// **Returns** the largest value change
    pub fn sweep(&mut self, env: &dyn Environment) -> Result<f64> {
        ensure_dims(self.dims, env)?;
        let model = require_model(env, NAME)?;

        let new_values: Vec<f64> = (0..self.dims.0)
            .map(|s| {
                let value = self.probabilities[s]
                    .iter()
                    .enumerate()
                    .filter(|(_, &p)| p > 0.0)
                    .map(|(a, &p)| p * expected_return(model, &self.values, self.gamma, s, a))
                    .sum();
                accept_value(self.values[s], value)
            })
            .collect();

        let delta = max_change(&self.values, &new_values);
        self.values = new_values;
        self.delta_history.push(delta);
        log::debug!("{NAME}: sweep {} delta {delta}", self.delta_history.len());
        if delta < self.theta {
            log::info!("{NAME}: converged after {} sweeps", self.delta_history.len());
        }

        Ok(delta)
    }

    /// Sweep until the largest value change drops below `theta` or `max_sweeps` sweeps have run
    pub fn evaluate(&mut self, env: &dyn Environment, max_sweeps: usize) -> Result<()> {
        for _ in 0..max_sweeps {
            if self.sweep(env)? < self.theta {
                break;
            }
        }
        Ok(())
    }

    /// Action probabilities of the evaluated policy
    pub fn probabilities(&self) -> &[Vec<f64>] {
        &self.probabilities
    }
}

impl Agent for PolicyEvaluation {
    fn name(&self) -> &'static str {
        NAME
    }

    fn dims(&self) -> (usize, usize) {
        self.dims
    }

    fn train_iteration(&mut self, env: &mut dyn Environment) -> Result<Option<f64>> {
        self.sweep(env)?;
        Ok(None)
    }

    fn is_converged(&self) -> bool {
        self.delta_history
            .last()
            .is_some_and(|&delta| delta < self.theta)
    }

    fn choose_action(&mut self, state: usize) -> usize {
        self.probabilities
            .get(state)
            .map(|row| most_likely(row))
            .unwrap_or_default()
    }

    fn policy(&self) -> Option<Vec<usize>> {
        Some(self.probabilities.iter().map(|row| most_likely(row)).collect())
    }

    fn values(&self) -> Vec<f64> {
        sanitize(&self.values)
    }

    fn metrics(&self) -> Metrics {
        Metrics {
            delta_history: Some(self.delta_history.clone()),
            ..Default::default()
        }
    }
}

/// First action with the highest probability
fn most_likely(row: &[f64]) -> usize {
    let mut best = 0;
    for (action, &p) in row.iter().enumerate() {
        if p > row[best] {
            best = action;
        }
    }
    best
}
