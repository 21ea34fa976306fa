//! Implemented RL algorithms
//!
//! Every algorithm implements [`Agent`], so a driver can train and inspect any of them
//! without knowing which one it holds.

use serde::Serialize;

use crate::{
    env::{Environment, Step},
    error::{Error, Result},
};

pub mod dp;
pub mod tabular;

pub use dp::{PlanningConfig, PolicyEvaluation, PolicyIteration, ValueIteration};
pub use tabular::{
    MonteCarloAgent, MonteCarloConfig, NStepConfig, NStepSarsaAgent, QLearningAgent, SarsaAgent,
    TabularConfig, TdAgent, TdConfig,
};

/// Training history of an agent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    /// Undiscounted return of every completed episode
    pub episode_returns: Vec<f64>,
    /// Cumulative number of environment transitions
    pub step_count: u64,
    /// Largest value change of every planning sweep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_history: Option<Vec<f64>>,
    /// Whether each policy improvement pass left the policy unchanged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_stable_history: Option<Vec<bool>>,
}

impl Metrics {
    /// Return of the most recent episode, or 0 before the first one
    pub fn latest_return(&self) -> f64 {
        self.episode_returns.last().copied().unwrap_or_default()
    }

    /// Mean return over all episodes, or 0 before the first one
    pub fn mean_return(&self) -> f64 {
        if self.episode_returns.is_empty() {
            return 0.0;
        }
        self.episode_returns.iter().sum::<f64>() / self.episode_returns.len() as f64
    }
}

/// A learning agent bound to the dimensions of one environment
pub trait Agent {
    /// Name of the algorithm
    fn name(&self) -> &'static str;

    /// `(n_states, n_actions)` of the environment the agent was built for
    fn dims(&self) -> (usize, usize);

    /// Run the algorithm's training primitive once
    ///
    /// That is one episode for the model-free agents and one sweep or evaluate/improve
    /// round for the planners.
    ///
    /// **Returns** the episode's total reward, or `None` for planners
    fn train_iteration(&mut self, env: &mut dyn Environment) -> Result<Option<f64>>;

    /// Whether further training would leave the agent unchanged
    fn is_converged(&self) -> bool {
        false
    }

    /// Run `iterations` training primitives, stopping early once converged
    fn train(&mut self, env: &mut dyn Environment, iterations: usize) -> Result<()> {
        for _ in 0..iterations {
            if self.is_converged() {
                break;
            }
            self.train_iteration(env)?;
        }
        Ok(())
    }

    /// The action the agent takes in `state` while training
    fn choose_action(&mut self, state: usize) -> usize;

    /// The greedy policy, or `None` for prediction-only agents
    fn policy(&self) -> Option<Vec<usize>>;

    /// Estimated value of every state, always finite
    fn values(&self) -> Vec<f64>;

    fn metrics(&self) -> Metrics;
}

/// Fail unless `env` has the dimensions an agent was built for
pub(crate) fn ensure_dims(expected: (usize, usize), env: &dyn Environment) -> Result<()> {
    let actual = env.dims();
    if actual != expected {
        return Err(Error::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Whether a step produced a usable state; logs and rejects anything out of range
pub(crate) fn accept_step(step: &Step, n_states: usize, algorithm: &str) -> bool {
    if step.state < n_states {
        return true;
    }
    log::warn!(
        "{algorithm}: aborting episode, step returned state {} outside [0, {n_states})",
        step.state
    );
    false
}

/// Whether a reset produced a usable initial state
pub(crate) fn accept_reset(state: usize, n_states: usize, algorithm: &str) -> bool {
    if state < n_states {
        return true;
    }
    log::warn!(
        "{algorithm}: aborting episode, reset returned state {state} outside [0, {n_states})"
    );
    false
}
