//! A driver-facing context that owns one environment and one agent

use serde::Serialize;

use crate::{
    algo::{ensure_dims, Agent, Metrics},
    config::{AlgorithmKind, Hyperparams, SessionConfig},
    env::Environment,
    error::{Error, Result},
    memory::{Episode, Exp},
    util::sanitize,
};

/// A read-only copy of what an agent has learned so far
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Estimated value of every state, always finite
    pub values: Vec<f64>,
    /// Greedy policy, `None` for prediction-only agents
    pub policy: Option<Vec<usize>>,
    pub metrics: Metrics,
}

/// Progress report of a [`Training`] run, emitted after every training primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Primitives completed in this run
    pub completed: usize,
    pub total: usize,
    /// Return of the episode just played; `None` for planning iterations
    pub last_return: Option<f64>,
}

/// Batch size a driver should pull per tick when training for `total` primitives
pub fn default_batch_size(total: usize) -> usize {
    (total / 20).clamp(1, 10)
}

/// Owns an environment and the agent bound to it
pub struct Session {
    env: Box<dyn Environment>,
    agent: Box<dyn Agent>,
    seed: Option<u64>,
}

impl Session {
    /// Build the environment and the agent described by `config`
    ///
    /// **Errors** if the algorithm needs a transition model the environment lacks, or
    /// if a hyperparameter is out of range
    pub fn new(config: SessionConfig) -> Result<Self> {
        let env = config.environment.build(config.seed);
        let agent = config
            .algorithm
            .build(env.as_ref(), &config.params, config.seed)?;
        log::info!(
            "session: {} on {} ({} states, {} actions)",
            agent.name(),
            config.environment,
            env.n_states(),
            env.n_actions()
        );
        Ok(Self {
            env,
            agent,
            seed: config.seed,
        })
    }

    /// Assemble a session from an existing environment and agent
    ///
    /// **Errors** if the agent was built for different dimensions
    pub fn with_parts(env: Box<dyn Environment>, agent: Box<dyn Agent>) -> Result<Self> {
        ensure_dims(agent.dims(), env.as_ref())?;
        Ok(Self {
            env,
            agent,
            seed: None,
        })
    }

    pub fn environment(&self) -> &dyn Environment {
        self.env.as_ref()
    }

    pub fn agent(&self) -> &dyn Agent {
        self.agent.as_ref()
    }

    /// Replace the agent with a fresh one, keeping the environment
    ///
    /// On error the current agent is kept.
    pub fn replace_agent(&mut self, algorithm: AlgorithmKind, params: &Hyperparams) -> Result<()> {
        let agent = algorithm.build(self.env.as_ref(), params, self.seed)?;
        log::info!("session: switching from {} to {}", self.agent.name(), agent.name());
        self.agent = agent;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            values: sanitize(&self.agent.values()),
            policy: self.agent.policy(),
            metrics: self.agent.metrics(),
        }
    }

    /// A resumable training run of at most `total` primitives
    pub fn training(&mut self, total: usize) -> Training<'_> {
        Training {
            session: self,
            completed: 0,
            total,
        }
    }

    /// Follow the greedy policy from a fresh reset without learning
    ///
    /// The rollout stops at a terminal state, after `max_steps` transitions, or at a step
    /// outside the state space. It never runs longer than
    /// [`MAX_EPISODE_STEPS`](crate::memory::MAX_EPISODE_STEPS).
    ///
    /// **Errors** with [`Error::NoPolicy`] for prediction-only agents
    pub fn rollout(&mut self, max_steps: usize) -> Result<Episode> {
        let policy = self.agent.policy().ok_or(Error::NoPolicy {
            algorithm: self.agent.name(),
        })?;
        let n_states = self.env.n_states();

        let mut episode = Episode::new();
        let mut state = self.env.reset();
        while episode.len() < max_steps && !episode.is_full() {
            let action = policy.get(state).copied().unwrap_or_default();
            let step = self.env.step(action);
            if step.state >= n_states {
                log::warn!("session: rollout stopped at invalid state {}", step.state);
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

        Ok(episode)
    }
}

/// Pull-based training of a [`Session`]'s agent
///
/// Every item runs one training primitive of the agent. The run ends after `total`
/// items, once the agent has converged, or after the first error. Dropping the run
/// and starting another continues from the agent's current state.
pub struct Training<'s> {
    session: &'s mut Session,
    completed: usize,
    total: usize,
}

impl Training<'_> {
    /// Pull up to `n` items, stopping at the first error
    pub fn next_batch(&mut self, n: usize) -> Result<Vec<Progress>> {
        self.by_ref().take(n).collect()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }
}

impl Iterator for Training<'_> {
    type Item = Result<Progress>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.completed >= self.total || self.session.agent.is_converged() {
            return None;
        }

        let Session { env, agent, .. } = &mut *self.session;
        match agent.train_iteration(env.as_mut()) {
            Ok(last_return) => {
                self.completed += 1;
                Some(Ok(Progress {
                    completed: self.completed,
                    total: self.total,
                    last_return,
                }))
            }
            Err(e) => {
                self.completed = self.total;
                Some(Err(e))
            }
        }
    }
}
