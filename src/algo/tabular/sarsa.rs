use crate::{
    algo::{accept_reset, accept_step, ensure_dims, Agent, Metrics},
    decay::{self, Decay},
    ds::QTable,
    env::Environment,
    error::Result,
    memory::MAX_EPISODE_STEPS,
};

use super::{Learner, TabularConfig};

const NAME: &str = "SARSA";

/// An on-policy TD control agent
///
/// The target of every update bootstraps from the action the behaviour policy actually
/// takes next, which is chosen before the update is applied.
pub struct SarsaAgent<D: Decay = decay::Constant> {
    learner: Learner<D>,
    alpha: f64,
    gamma: f64,
}

impl<D: Decay> SarsaAgent<D> {
    /// Initialize a new `SarsaAgent` bound to the dimensions of `env`
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

    /// Run one episode
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
        let mut action = self.learner.act(state);
        let mut total_reward = 0.0;
        let mut steps = 0;
        let mut terminated = false;

        while steps < MAX_EPISODE_STEPS {
            let step = env.step(action);
            if !accept_step(&step, n_states, NAME) {
                break;
            }
            total_reward += step.reward;
            steps += 1;

            if step.terminal {
                self.learner
                    .q_table
                    .update(state, action, step.reward, self.alpha);
                terminated = true;
                break;
            }

            let next_action = self.learner.act(step.state);
            let next_value = self.learner.q_table.get(step.state, next_action);
            let target = step.reward + self.gamma * next_value;
            self.learner.q_table.update(state, action, target, self.alpha);

            state = step.state;
            action = next_action;
        }

        self.learner
            .tally
            .finish(NAME, total_reward, steps, terminated);
        Ok(total_reward)
    }
}

impl<D: Decay> Agent for SarsaAgent<D> {
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
        let mut agent = SarsaAgent::new(&env, config(21)).unwrap();
        agent.train(&mut env, 300).unwrap();
        assert_eq!(agent.policy().unwrap()[..4], [1, 1, 1, 1]);
        assert_eq!(agent.metrics().episode_returns.len(), 300);
    }

    #[test]
    fn seeded_agents_are_reproducible() {
        let mut env = GridWorld::new(4);
        let mut a = SarsaAgent::new(&env, config(8)).unwrap();
        let mut b = SarsaAgent::new(&env, config(8)).unwrap();
        a.train(&mut env, 30).unwrap();
        b.train(&mut env, 30).unwrap();
        assert_eq!(a.q_table(), b.q_table());
        assert_eq!(a.metrics(), b.metrics());
    }

    #[test]
    fn liveness_on_endless_corridor() {
        let mut env = MockEnv::endless(3);
        let mut agent = SarsaAgent::new(&env, config(2)).unwrap();
        agent.train_episode(&mut env).unwrap();
        assert_eq!(env.steps, MAX_EPISODE_STEPS);
    }

    #[test]
    fn malformed_step_keeps_partial_return() {
        let mut env = BrokenEnv;
        let mut agent = SarsaAgent::new(&env, config(6)).unwrap();
        let total = agent.train_episode(&mut env).unwrap();
        let metrics = agent.metrics();
        assert_eq!(metrics.episode_returns, vec![total]);
        assert_eq!(total, 0.5 * metrics.step_count as f64, "Only accepted steps count");
    }
}
