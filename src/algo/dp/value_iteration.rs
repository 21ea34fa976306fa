use crate::{
    algo::{ensure_dims, Agent, Metrics},
    env::Environment,
    error::Result,
    util::sanitize,
};

use super::{accept_value, greedy, max_change, require_model, PlanningConfig};

const NAME: &str = "Value Iteration";

/// A value iteration agent
///
/// Each sweep backs every state up with the best one-step expected return under the
/// previous sweep's values. The policy is the argmax of the latest sweep.
pub struct ValueIteration {
    values: Vec<f64>,
    policy: Vec<usize>,
    gamma: f64,
    theta: f64,
    dims: (usize, usize),
    delta_history: Vec<f64>,
}

impl ValueIteration {
    /// Initialize a new `ValueIteration` agent with all values 0
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
            dims,
            delta_history: Vec::new(),
        })
    }

    /// Perform one synchronous Bellman optimality sweep
    ///
    /// **Returns** the largest value change of the sweep
    pub fn sweep(&mut self, env: &dyn Environment) -> Result<f64> {
        ensure_dims(self.dims, env)?;
        let model = require_model(env, NAME)?;

        let mut new_values = Vec::with_capacity(self.dims.0);
        for s in 0..self.dims.0 {
            let (action, value) = greedy(model, &self.values, self.gamma, s, self.dims.1);
            self.policy[s] = action;
            new_values.push(accept_value(self.values[s], value));
        }

        let delta = max_change(&self.values, &new_values);
        self.values = new_values;
        self.delta_history.push(delta);

        if delta < self.theta {
            log::info!(
                "{NAME}: converged after {} sweeps (delta {delta})",
                self.delta_history.len()
            );
        } else {
            log::debug!("{NAME}: sweep delta {delta}");
        }

        Ok(delta)
    }

    pub fn delta_history(&self) -> &[f64] {
        &self.delta_history
    }
}

impl Agent for ValueIteration {
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
            ..Default::default()
        }
    }
}
