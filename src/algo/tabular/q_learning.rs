use crate::{
    algo::{accept_reset, accept_step, ensure_dims, Agent, Metrics},
    decay::{self, Decay},
    ds::QTable,
    env::Environment,
    error::Result,
    memory::MAX_EPISODE_STEPS,
};

use super::{Learner, TabularConfig};

const NAME: &str = "Q-Learning";

/// A Q-learning agent that learns its environment with a Q-table
///
/// Off-policy: the target bootstraps from the best action of the next state, whatever
/// the behaviour policy does next.
///
/// ### Generics
/// - `D` - The [`Decay`] schedule of the exploration policy's epsilon
pub struct QLearningAgent<D: Decay = decay::Constant> {
    learner: Learner<D>,
    alpha: f64,
    gamma: f64,
}

impl<D: Decay> QLearningAgent<D> {
    /// Initialize a new `QLearningAgent` bound to the dimensions of `env`
    ///
    /// **Errors** if `alpha` or `gamma` is not in the interval `[0,1]`
    pub fn new(env: &dyn Environment, config: TabularConfig<D>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            learner: Learner::new(env, config.exploration, config.seed),
            alpha: config.alpha,
            gamma: config.gamma,
        })
    }

    pub fn q_table(&self) -> &QTable {
        &self.learner.q_table
    }

    fn learn(&mut self, state: usize, action: usize, reward: f64, next_state: usize, done: bool) {
        let next = if done {
            0.0
        } else {
            self.gamma * self.learner.q_table.max(next_state)
        };
        self.learner
            .q_table
            .update(state, action, reward + next, self.alpha);
    }

    /// Run one episode, learning after every transition
    ///
    /// **Returns** the undiscounted return of the episode
    pub fn train_episode(&mut self, env: &mut dyn Environment) -> Result<f64> {
        ensure_dims(self.dims(), env)?;
        let n_states = self.dims().0;

        let mut state = env.reset();
        if !accept_reset(state, n_states, NAME) {
            self.learner.tally.finish(NAME, 0.0, 0, false);
            return Ok(0.0);
        }
        let mut total_reward = 0.0;
        let mut steps = 0;
        let mut terminated = false;

        while steps < MAX_EPISODE_STEPS {
            let action = self.learner.act(state);
            let step = env.step(action);
            if !accept_step(&step, n_states, NAME) {
                break;
            }

            self.learn(state, action, step.reward, step.state, step.terminal);
            total_reward += step.reward;
            steps += 1;
            state = step.state;

            if step.terminal {
                terminated = true;
                break;
            }
        }

        self.learner
            .tally
            .finish(NAME, total_reward, steps, terminated);
        Ok(total_reward)
    }
}

impl<D: Decay> Agent for QLearningAgent<D> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn dims(&self) -> (usize, usize) {
        self.learner.dims()
    }

    fn train_iteration(&mut self, env: &mut dyn Environment) -> Result<Option<f64>> {
        self.train_episode(env).map(Some)
    }

    fn choose_action(&mut self, state: usize) -> usize {
        self.learner.act(state)
    }

    fn policy(&self) -> Option<Vec<usize>> {
        Some(self.learner.policy())
    }

    fn values(&self) -> Vec<f64> {
        self.learner.values()
    }

    fn metrics(&self) -> Metrics {
        self.learner.tally.metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        env::tests::{BrokenEnv, MockEnv},
        error::Error,
        exploration::EpsilonGreedy,
        gym::GridWorld,
    };

    fn config(seed: u64) -> TabularConfig {
        TabularConfig {
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn learns_the_corridor() {
        let mut env = MockEnv::new(5);
        let mut agent = QLearningAgent::new(&env, config(3)).unwrap();
        agent.train(&mut env, 200).unwrap();

        assert_eq!(agent.policy().unwrap()[..4], [1, 1, 1, 1], "Always move right");
        let q = agent.q_table();
        assert!(q.get(3, 1) > 0.9, "Value of the final move approaches 1");
        assert!(q.get(2, 1) > q.get(2, 0));
    }

    #[test]
    fn terminal_target_does_not_bootstrap() {
        let env = MockEnv::new(3);
        let mut agent = QLearningAgent::new(
            &env,
            TabularConfig {
                alpha: 1.0,
                ..config(0)
            },
        )
        .unwrap();
        agent.learner.q_table.set(2, 0, 50.0);
        agent.learn(1, 1, 1.0, 2, true);
        assert_eq!(agent.q_table().get(1, 1), 1.0);
        agent.learn(0, 1, 0.0, 2, false);
        assert_eq!(agent.q_table().get(0, 1), 45.0);
    }

    #[test]
    fn endless_episodes_are_cut_off() {
        let mut env = MockEnv::endless(4);
        let mut agent = QLearningAgent::new(&env, config(9)).unwrap();
        for _ in 0..3 {
            agent.train_episode(&mut env).unwrap();
        }
        assert_eq!(env.steps, 3 * MAX_EPISODE_STEPS, "Each episode stops at the cap");
        assert_eq!(agent.metrics().step_count, 3 * MAX_EPISODE_STEPS as u64);
    }

    #[test]
    fn malformed_step_aborts_episode() {
        let mut env = BrokenEnv;
        let mut agent = QLearningAgent::new(
            &env,
            TabularConfig {
                exploration: EpsilonGreedy::constant(1.0).unwrap(),
                ..config(4)
            },
        )
        .unwrap();
        for _ in 0..20 {
            let total = agent.train_episode(&mut env).unwrap();
            assert!(total < MAX_EPISODE_STEPS as f64 * 0.5, "Random actions hit a bad state");
        }
        let metrics = agent.metrics();
        assert_eq!(metrics.episode_returns.len(), 20, "Aborted episodes are still recorded");
        assert!(agent.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn rejects_other_environments() {
        let env = GridWorld::new(5);
        let mut agent = QLearningAgent::new(&env, config(1)).unwrap();
        assert!(matches!(
            agent.train_episode(&mut MockEnv::new(3)),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
