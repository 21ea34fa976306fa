use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    algo::{accept_reset, accept_step, ensure_dims, Agent, Metrics},
    ensure_interval,
    env::Environment,
    error::Result,
    memory::MAX_EPISODE_STEPS,
    util::sanitize,
};

use super::{rng_from, Tally};

const NAME: &str = "TD(0)";

/// Configuration for the [`TdAgent`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TdConfig {
    /// **Default**: `0.1`
    pub alpha: f64,
    /// **Default**: `0.9`
    pub gamma: f64,
    pub seed: Option<u64>,
}

impl Default for TdConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            seed: None,
        }
    }
}

/// A TD(0) prediction agent
///
/// Estimates the state values of the uniformly random policy. It learns no policy of
/// its own, so [`Agent::policy`] is always `None`.
pub struct TdAgent {
    values: Vec<f64>,
    n_actions: usize,
    alpha: f64,
    gamma: f64,
    rng: StdRng,
    tally: Tally,
}

impl TdAgent {
    /// Initialize a new `TdAgent` with all state values 0
    ///
    /// **Errors** if `alpha` or `gamma` is not in the interval `[0,1]`
    pub fn new(env: &dyn Environment, config: TdConfig) -> Result<Self> {
        let TdConfig { alpha, gamma, seed } = config;
        ensure_interval!(alpha, 0.0, 1.0);
        ensure_interval!(gamma, 0.0, 1.0);
        Ok(Self {
            values: vec![0.0; env.n_states()],
            n_actions: env.n_actions(),
            alpha,
            gamma,
            rng: rng_from(seed),
            tally: Tally::default(),
        })
    }

    fn learn(&mut self, state: usize, reward: f64, next_state: usize, done: bool) {
        let next = if done { 0.0 } else { self.values[next_state] };
        let current = self.values[state];
        let updated = current + self.alpha * (reward + self.gamma * next - current);
        if updated.is_finite() {
            self.values[state] = updated;
        } else {
            log::trace!("discarding non-finite value {updated} for state {state}");
        }
    }

    /// Run one episode under the random behaviour policy
    ///
    /// **Returns** the undiscounted return of the episode
    pub fn train_episode(&mut self, env: &mut dyn Environment) -> Result<f64> {
        ensure_dims(self.dims(), env)?;
        let n_states = self.values.len();

        let mut state = env.reset();
        if !accept_reset(state, n_states, NAME) {
            self.tally.finish(NAME, 0.0, 0, false);
            return Ok(0.0);
        }
        let mut total_reward = 0.0;
        let mut steps = 0;
        let mut terminated = false;

        while steps < MAX_EPISODE_STEPS {
            let action = self.choose_action(state);
            let step = env.step(action);
            if !accept_step(&step, n_states, NAME) {
                break;
            }

            self.learn(state, step.reward, step.state, step.terminal);
            total_reward += step.reward;
            steps += 1;
            state = step.state;

            if step.terminal {
                terminated = true;
                break;
            }
        }

        self.tally.finish(NAME, total_reward, steps, terminated);
        Ok(total_reward)
    }
}

impl Agent for TdAgent {
    fn name(&self) -> &'static str {
        NAME
    }

    fn dims(&self) -> (usize, usize) {
        (self.values.len(), self.n_actions)
    }

    fn train_iteration(&mut self, env: &mut dyn Environment) -> Result<Option<f64>> {
        self.train_episode(env).map(Some)
    }

    fn choose_action(&mut self, _state: usize) -> usize {
        self.rng.gen_range(0..self.n_actions)
    }

    fn policy(&self) -> Option<Vec<usize>> {
        None
    }

    fn values(&self) -> Vec<f64> {
        sanitize(&self.values)
    }

    fn metrics(&self) -> Metrics {
        self.tally.metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::tests::{BrokenEnv, LostEnv, MockEnv};

    #[test]
    fn has_no_policy() {
        let env = MockEnv::new(3);
        let agent = TdAgent::new(&env, TdConfig::default()).unwrap();
        assert!(agent.policy().is_none());
        assert!(TdAgent::new(&env, TdConfig {
            alpha: 2.0,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn values_increase_towards_the_goal() {
        let mut env = MockEnv::new(4);
        let mut agent = TdAgent::new(
            &env,
            TdConfig {
                seed: Some(42),
                ..Default::default()
            },
        )
        .unwrap();
        agent.train(&mut env, 500).unwrap();

        let values = agent.values();
        assert!(values[2] > values[1] && values[1] > values[0], "{values:?}");
        assert_eq!(values[3], 0.0, "Terminal state is never updated");
    }

    #[test]
    fn terminal_successor_is_masked() {
        let env = MockEnv::new(3);
        let mut agent = TdAgent::new(
            &env,
            TdConfig {
                alpha: 1.0,
                gamma: 1.0,
                seed: Some(0),
            },
        )
        .unwrap();
        agent.values[2] = 100.0;
        agent.learn(1, 1.0, 2, true);
        assert_eq!(agent.values[1], 1.0);
    }

    #[test]
    fn aborted_and_endless_episodes() {
        let mut env = BrokenEnv;
        let mut agent = TdAgent::new(&env, TdConfig::default()).unwrap();
        agent.train(&mut env, 10).unwrap();
        assert_eq!(agent.metrics().episode_returns.len(), 10);

        let mut env = MockEnv::endless(3);
        let mut agent = TdAgent::new(&env, TdConfig::default()).unwrap();
        agent.train_episode(&mut env).unwrap();
        assert_eq!(env.steps, MAX_EPISODE_STEPS);
    }

    #[test]
    fn invalid_reset_state_aborts_episode() {
        let mut env = LostEnv;
        let mut agent = TdAgent::new(&env, TdConfig::default()).unwrap();
        assert_eq!(agent.train_episode(&mut env).unwrap(), 0.0);
        let metrics = agent.metrics();
        assert_eq!(metrics.episode_returns, vec![0.0], "Aborted episode still counts");
        assert_eq!(metrics.step_count, 0, "No step taken from an unknown state");
        assert!(agent.values().iter().all(|&v| v == 0.0), "Values untouched");
    }
}
