use std::collections::HashSet;

use crate::{
    algo::{accept_reset, accept_step, ensure_dims, Agent, Metrics},
    decay::{self, Decay},
    ds::QTable,
    ensure_interval,
    env::Environment,
    error::Result,
    exploration::EpsilonGreedy,
    memory::{Episode, Exp},
};

use super::Learner;

const NAME: &str = "Monte Carlo";

/// Configuration for the [`MonteCarloAgent`]
#[derive(Debug, Clone)]
pub struct MonteCarloConfig<D: Decay = decay::Constant> {
    pub exploration: EpsilonGreedy<D>,
    /// **Default**: `0.9`
    pub gamma: f64,
    /// Average only the first visit of each pair per episode instead of every visit
    ///
    /// **Default**: `true`
    pub first_visit: bool,
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::default(),
            gamma: 0.9,
            first_visit: true,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Returns {
    sum: f64,
    count: u64,
}

/// An on-policy Monte Carlo control agent
///
/// Plays a whole episode before learning anything, then walks it backwards and sets
/// every action value to the sample mean of the returns observed after it.
pub struct MonteCarloAgent<D: Decay = decay::Constant> {
    learner: Learner<D>,
    returns: Vec<Returns>,
    gamma: f64,
    first_visit: bool,
}

impl<D: Decay> MonteCarloAgent<D> {
    /// Initialize a new `MonteCarloAgent` bound to the dimensions of `env`
    ///
    /// **Errors** if `gamma` is not in the interval `[0,1]`
    pub fn new(env: &dyn Environment, config: MonteCarloConfig<D>) -> Result<Self> {
        let gamma = config.gamma;
        ensure_interval!(gamma, 0.0, 1.0);
        let (n_states, n_actions) = env.dims();
        Ok(Self {
            learner: Learner::new(env, config.exploration, config.seed),
            returns: vec![Returns::default(); n_states * n_actions],
            gamma,
            first_visit: config.first_visit,
        })
    }

    pub fn q_table(&self) -> &QTable {
        &self.learner.q_table
    }

    /// How many returns have been averaged into `Q(state, action)`
    pub fn visit_count(&self, state: usize, action: usize) -> u64 {
        let n_actions = self.learner.q_table.n_actions();
        if action >= n_actions {
            return 0;
        }
        self.returns
            .get(state * n_actions + action)
            .map_or(0, |r| r.count)
    }

    fn learn(&mut self, episode: &Episode) {
        let n_actions = self.learner.q_table.n_actions();
        let mut ret = 0.0;
        let mut visited = HashSet::new();

        for &Exp {
            state,
            action,
            reward,
        } in episode.steps().iter().rev()
        {
            ret = self.gamma * ret + reward;
            if self.first_visit && !visited.insert((state, action)) {
                continue;
            }
            if !ret.is_finite() {
                log::trace!("discarding non-finite return {ret} for ({state}, {action})");
                continue;
            }

            let entry = &mut self.returns[state * n_actions + action];
            entry.sum += ret;
            entry.count += 1;
            let mean = entry.sum / entry.count as f64;
            self.learner.q_table.set(state, action, mean);
        }
    }

    /// Play one episode with the current policy, then learn from it
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

        let mut episode = Episode::new();
        while !episode.is_full() {
            let action = self.learner.act(state);
            let step = env.step(action);
            if !accept_step(&step, n_states, NAME) {
                break;
            }
            episode.push(Exp {
                state,
                action,
                reward: step.reward,
            });
            state = step.state;

            if step.terminal {
                episode.terminated = true;
                break;
            }
        }

        self.learn(&episode);

        let total_reward = episode.total_reward();
        self.learner
            .tally
            .finish(NAME, total_reward, episode.len(), episode.terminated);
        Ok(total_reward)
    }
}

impl<D: Decay> Agent for MonteCarloAgent<D> {
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
        env::tests::{BrokenEnv, LostEnv, MockEnv},
        gym::GridWorld,
        memory::MAX_EPISODE_STEPS,
    };

    fn agent(env: &dyn Environment, first_visit: bool, seed: u64) -> MonteCarloAgent {
        MonteCarloAgent::new(
            env,
            MonteCarloConfig {
                exploration: EpsilonGreedy::constant(1.0).unwrap(),
                first_visit,
                seed: Some(seed),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn total_visits(agent: &MonteCarloAgent, dims: (usize, usize)) -> u64 {
        (0..dims.0)
            .flat_map(|s| (0..dims.1).map(move |a| (s, a)))
            .map(|(s, a)| agent.visit_count(s, a))
            .sum()
    }

    #[test]
    fn first_visit_counts_each_pair_once() {
        let mut env = GridWorld::new(4);
        let mut agent = agent(&env, true, 12);
        agent.train_episode(&mut env).unwrap();

        for s in 0..16 {
            for a in 0..4 {
                assert!(agent.visit_count(s, a) <= 1, "({s}, {a}) counted twice");
            }
        }
        let steps = agent.metrics().step_count;
        assert!(total_visits(&agent, env.dims()) <= steps);
    }

    #[test]
    fn every_visit_counts_all_steps() {
        let mut env = GridWorld::new(4);
        let mut agent = agent(&env, false, 12);
        for _ in 0..5 {
            agent.train_episode(&mut env).unwrap();
        }
        assert_eq!(total_visits(&agent, env.dims()), agent.metrics().step_count);
    }

    #[test]
    fn q_is_the_sample_mean() {
        // Moving right through a corridor of 3 pays 1 on the second step
        let mut env = MockEnv::new(3);
        let mut agent = MonteCarloAgent::new(
            &env,
            MonteCarloConfig {
                exploration: EpsilonGreedy::constant(0.0).unwrap(),
                gamma: 0.5,
                first_visit: true,
                seed: Some(0),
            },
        )
        .unwrap();
        agent.learner.q_table.set(0, 1, 1.0);
        agent.learner.q_table.set(1, 1, 1.0);

        agent.train_episode(&mut env).unwrap();
        agent.train_episode(&mut env).unwrap();
        assert_eq!(agent.visit_count(0, 1), 2);
        assert_eq!(agent.q_table().get(0, 1), 0.5);
        assert_eq!(agent.q_table().get(1, 1), 1.0);
    }

    #[test]
    fn liveness_and_aborts() {
        let mut env = MockEnv::endless(3);
        let mut mc = agent(&env, true, 3);
        mc.train_episode(&mut env).unwrap();
        assert_eq!(mc.metrics().step_count, MAX_EPISODE_STEPS as u64);

        let mut env = BrokenEnv;
        let mut mc = agent(&env, false, 3);
        let total = mc.train_episode(&mut env).unwrap();
        assert_eq!(mc.metrics().episode_returns, vec![total]);
        assert_eq!(total_visits(&mc, (3, 2)), mc.metrics().step_count);
    }

    #[test]
    fn invalid_reset_state_aborts_episode() {
        let mut env = LostEnv;
        let mut mc = agent(&env, true, 4);
        assert_eq!(mc.train_episode(&mut env).unwrap(), 0.0);
        let metrics = mc.metrics();
        assert_eq!(metrics.episode_returns, vec![0.0], "Aborted episode still counts");
        assert_eq!(metrics.step_count, 0, "No step taken from an unknown state");
        assert!(mc.values().iter().all(|&v| v == 0.0), "Q-table untouched");
    }
}
