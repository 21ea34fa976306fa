use crate::{
    algo::{accept_reset, accept_step, ensure_dims, Agent, Metrics},
    decay::{self, Decay},
    ds::QTable,
    ensure_interval,
    env::Environment,
    error::{Error, Result},
    exploration::EpsilonGreedy,
    memory::MAX_EPISODE_STEPS,
};

use super::Learner;

const NAME: &str = "n-step SARSA";

/// Configuration for the [`NStepSarsaAgent`]
#[derive(Debug, Clone)]
pub struct NStepConfig<D: Decay = decay::Constant> {
    /// **Default**: constant epsilon of `0.1`
    pub exploration: EpsilonGreedy<D>,
    /// **Default**: `0.1`
    pub alpha: f64,
    /// **Default**: `0.9`
    pub gamma: f64,
    /// Number of rewards summed before bootstrapping, at least 1
    ///
    /// **Default**: `3`
    pub n: usize,
    pub seed: Option<u64>,
}

impl Default for NStepConfig {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::default(),
            alpha: 0.1,
            gamma: 0.9,
            n: 3,
            seed: None,
        }
    }
}

/// An n-step SARSA agent
///
/// Each state-action pair is backed up towards the discounted sum of the next `n`
/// rewards plus the discounted value of the pair reached `n` steps later. The backup
/// of time `tau` is applied as soon as step `tau + n` has been taken. When the episode
/// terminates at time `T`, the pending backups `T - n .. T` are flushed with truncated
/// returns that do not bootstrap.
pub struct NStepSarsaAgent<D: Decay = decay::Constant> {
    learner: Learner<D>,
    alpha: f64,
    gamma: f64,
    n: usize,
}

impl<D: Decay> NStepSarsaAgent<D> {
    /// Initialize a new `NStepSarsaAgent` bound to the dimensions of `env`
    ///
    /// **Errors** if `alpha` or `gamma` is not in the interval `[0,1]`, or if `n` is 0
    pub fn new(env: &dyn Environment, config: NStepConfig<D>) -> Result<Self> {
        let NStepConfig {
            exploration,
            alpha,
            gamma,
            n,
            seed,
        } = config;
        ensure_interval!(alpha, 0.0, 1.0);
        ensure_interval!(gamma, 0.0, 1.0);
        if n == 0 {
            return Err(Error::InvalidParameter("n must be at least 1".into()));
        }

        Ok(Self {
            learner: Learner::new(env, exploration, seed),
            alpha,
            gamma,
            n,
        })
    }

    pub fn q_table(&self) -> &QTable {
        &self.learner.q_table
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Back up the pair taken at time `tau` of a trace
    ///
    /// Rewards are summed up to `horizon` at most; the value of the pair at `tau + n`
    /// is added only with `bootstrap` set.
    fn backup(&mut self, trace: &Trace, tau: usize, horizon: usize, bootstrap: bool) {
        let end = (tau + self.n).min(horizon);
        let mut ret = 0.0;
        for i in tau + 1..=end {
            ret += self.gamma.powi((i - tau - 1) as i32) * trace.rewards[i];
        }
        if bootstrap {
            let (s, a) = (trace.states[tau + self.n], trace.actions[tau + self.n]);
            ret += self.gamma.powi(self.n as i32) * self.learner.q_table.get(s, a);
        }

        self.learner
            .q_table
            .update(trace.states[tau], trace.actions[tau], ret, self.alpha);
    }

    /// Run one episode
    ///
    /// An episode that is cut off at the step cap keeps its pending backups unapplied.
    ///
    /// **Returns** the undiscounted return of the episode
    pub fn train_episode(&mut self, env: &mut dyn Environment) -> Result<f64> {
        ensure_dims(self.dims(), env)?;
        let n_states = self.dims().0;

        let start = env.reset();
        if !accept_reset(start, n_states, NAME) {
            self.learner.tally.finish(NAME, 0.0, 0, false);
            return Ok(0.0);
        }

        let mut trace = Trace::new(start);
        let first = self.learner.act(start);
        trace.actions.push(first);

        let mut total_reward = 0.0;
        let mut steps = 0;
        let mut terminated = false;

        for t in 0..MAX_EPISODE_STEPS {
            let step = env.step(trace.actions[t]);
            if !accept_step(&step, n_states, NAME) {
                break;
            }
            trace.states.push(step.state);
            trace.rewards.push(step.reward);
            total_reward += step.reward;
            steps += 1;

            if step.terminal {
                terminated = true;
                let horizon = t + 1;
                for tau in horizon.saturating_sub(self.n)..horizon {
                    self.backup(&trace, tau, horizon, false);
                }
                break;
            }

            let next_action = self.learner.act(step.state);
            trace.actions.push(next_action);
            if let Some(tau) = (t + 1).checked_sub(self.n) {
                self.backup(&trace, tau, usize::MAX, true);
            }
        }

        self.learner
            .tally
            .finish(NAME, total_reward, steps, terminated);
        Ok(total_reward)
    }
}

/// States, actions and rewards of the running episode, indexed by time
///
/// `rewards[t]` is the reward received on entering `states[t]`; `rewards[0]` is unused.
struct Trace {
    states: Vec<usize>,
    actions: Vec<usize>,
    rewards: Vec<f64>,
}

impl Trace {
    fn new(start: usize) -> Self {
        Self {
            states: vec![start],
            actions: Vec::new(),
            rewards: vec![0.0],
        }
    }
}

impl<D: Decay> Agent for NStepSarsaAgent<D> {
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
        algo::tabular::{SarsaAgent, TabularConfig},
        env::tests::MockEnv,
        gym::GridWorld,
    };

    #[test]
    fn one_step_matches_sarsa() {
        let mut env = GridWorld::new(4);
        let mut sarsa = SarsaAgent::new(
            &env,
            TabularConfig {
                seed: Some(17),
                ..Default::default()
            },
        )
        .unwrap();
        let mut n_step = NStepSarsaAgent::new(
            &env,
            NStepConfig {
                n: 1,
                seed: Some(17),
                ..Default::default()
            },
        )
        .unwrap();

        for _ in 0..50 {
            let a = sarsa.train_episode(&mut env).unwrap();
            let b = n_step.train_episode(&mut env).unwrap();
            assert_eq!(a, b, "Episodes follow the same trajectory");
        }
        assert_eq!(sarsa.q_table(), n_step.q_table(), "Q-tables are identical");
        assert_eq!(sarsa.metrics(), n_step.metrics());
    }

    #[test]
    fn terminal_flush_uses_truncated_returns() {
        // Always moving right, a corridor of 4 terminates at T = 3 with only the last
        // reward non-zero
        let mut env = MockEnv::new(4);
        let mut agent = NStepSarsaAgent::new(
            &env,
            NStepConfig {
                exploration: EpsilonGreedy::constant(0.0).unwrap(),
                alpha: 1.0,
                gamma: 0.5,
                n: 2,
                seed: Some(1),
            },
        )
        .unwrap();
        for s in 0..3 {
            agent.learner.q_table.set(s, 1, 1.0);
        }

        agent.train_episode(&mut env).unwrap();
        let q = agent.q_table();
        assert_eq!(q.get(0, 1), 0.25, "Bootstrapped from Q(2, right) before the flush");
        assert_eq!(q.get(1, 1), 0.5, "Flushed without bootstrap");
        assert_eq!(q.get(2, 1), 1.0);
    }

    #[test]
    fn episode_shorter_than_n_is_fully_flushed() {
        let mut env = MockEnv::new(3);
        let mut agent = NStepSarsaAgent::new(
            &env,
            NStepConfig {
                exploration: EpsilonGreedy::constant(0.0).unwrap(),
                alpha: 1.0,
                gamma: 0.5,
                n: 5,
                seed: Some(1),
            },
        )
        .unwrap();
        agent.learner.q_table.set(0, 1, 1.0);
        agent.learner.q_table.set(1, 1, 1.0);

        agent.train_episode(&mut env).unwrap();
        assert_eq!(agent.q_table().get(0, 1), 0.5);
        assert_eq!(agent.q_table().get(1, 1), 1.0);
    }

    #[test]
    fn cut_off_episode_is_not_flushed() {
        let mut env = MockEnv::endless(2);
        let mut agent = NStepSarsaAgent::new(
            &env,
            NStepConfig {
                n: 3,
                seed: Some(5),
                ..Default::default()
            },
        )
        .unwrap();
        let total = agent.train_episode(&mut env).unwrap();
        assert_eq!(total, 0.0);
        assert_eq!(env.steps, MAX_EPISODE_STEPS);
        assert!(agent.values().iter().all(|&v| v == 0.0), "No reward, no value");
    }

    #[test]
    fn rejects_zero_n() {
        let env = MockEnv::new(3);
        let result = NStepSarsaAgent::new(
            &env,
            NStepConfig {
                n: 0,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }
}
