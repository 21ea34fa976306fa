//! Model-free agents that learn from sampled experience only
//!
//! Every agent drives [`Environment::reset`] and [`Environment::step`] for at most
//! [`MAX_EPISODE_STEPS`] transitions per episode.

use rand::{rngs::StdRng, SeedableRng};

use crate::{
    algo::Metrics,
    decay::{self, Decay},
    ds::QTable,
    ensure_interval,
    env::Environment,
    error::Result,
    exploration::EpsilonGreedy,
    memory::MAX_EPISODE_STEPS,
};

mod monte_carlo;
mod n_step;
mod q_learning;
mod sarsa;
mod td;

pub use monte_carlo::{MonteCarloAgent, MonteCarloConfig};
pub use n_step::{NStepConfig, NStepSarsaAgent};
pub use q_learning::QLearningAgent;
pub use sarsa::SarsaAgent;
pub use td::{TdAgent, TdConfig};

/// Configuration for the [`QLearningAgent`] and the [`SarsaAgent`]
#[derive(Debug, Clone)]
pub struct TabularConfig<D: Decay = decay::Constant> {
    /// Exploration policy, evaluated per episode
    ///
    /// **Default**: constant epsilon of `0.1`
    pub exploration: EpsilonGreedy<D>,
    /// Learning rate
    ///
    /// **Default**: `0.1`
    pub alpha: f64,
    /// Discount factor
    ///
    /// **Default**: `0.9`
    pub gamma: f64,
    /// Seed for the agent's random number generator
    pub seed: Option<u64>,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::default(),
            alpha: 0.1,
            gamma: 0.9,
            seed: None,
        }
    }
}

impl<D: Decay> TabularConfig<D> {
    pub(crate) fn validate(&self) -> Result<()> {
        let &Self { alpha, gamma, .. } = self;
        ensure_interval!(alpha, 0.0, 1.0);
        ensure_interval!(gamma, 0.0, 1.0);
        Ok(())
    }
}

/// A seeded generator, or one seeded from system entropy
pub(crate) fn rng_from(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Per-episode bookkeeping shared by the model-free agents
#[derive(Debug, Clone, Default)]
pub(crate) struct Tally {
    pub episode: u32,
    pub episode_returns: Vec<f64>,
    pub step_count: u64,
}

impl Tally {
    /// Record a finished episode of `steps` transitions and advance the episode counter
    pub fn finish(&mut self, algorithm: &str, total_reward: f64, steps: usize, terminated: bool) {
        if !terminated && steps >= MAX_EPISODE_STEPS {
            log::warn!(
                "{algorithm}: episode {} cut off after {steps} steps",
                self.episode
            );
        }
        log::debug!(
            "{algorithm}: episode {} finished with return {total_reward} in {steps} steps",
            self.episode
        );

        self.episode_returns.push(total_reward);
        self.step_count += steps as u64;
        self.episode += 1;
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            episode_returns: self.episode_returns.clone(),
            step_count: self.step_count,
            ..Default::default()
        }
    }
}

/// An action-value learner with an epsilon greedy behaviour policy
pub(crate) struct Learner<D: Decay> {
    pub q_table: QTable,
    pub exploration: EpsilonGreedy<D>,
    pub rng: StdRng,
    pub tally: Tally,
}

impl<D: Decay> Learner<D> {
    pub fn new(env: &dyn Environment, exploration: EpsilonGreedy<D>, seed: Option<u64>) -> Self {
        let (n_states, n_actions) = env.dims();
        Self {
            q_table: QTable::new(n_states, n_actions),
            exploration,
            rng: rng_from(seed),
            tally: Tally::default(),
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.q_table.n_states(), self.q_table.n_actions())
    }

    /// Choose an action in `state` following the exploration policy of the current episode
    pub fn act(&mut self, state: usize) -> usize {
        self.exploration.select(
            self.q_table.row(state),
            self.q_table.n_actions(),
            self.tally.episode,
            &mut self.rng,
        )
    }

    pub fn policy(&self) -> Vec<usize> {
        self.q_table.greedy_policy()
    }

    pub fn values(&self) -> Vec<f64> {
        self.q_table.state_values()
    }
}
