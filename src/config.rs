//! Serializable session configuration
//!
//! A driver picks an [`EnvironmentKind`] and an [`AlgorithmKind`], fills in
//! [`Hyperparams`] and hands the resulting [`SessionConfig`] to
//! [`Session::new`](crate::session::Session::new).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{
    algo::{
        Agent, MonteCarloAgent, MonteCarloConfig, NStepConfig, NStepSarsaAgent, PlanningConfig,
        PolicyEvaluation, PolicyIteration, QLearningAgent, SarsaAgent, TabularConfig, TdAgent,
        TdConfig, ValueIteration,
    },
    decay::{Constant, Schedule},
    ensure_interval,
    env::Environment,
    error::Result,
    exploration::EpsilonGreedy,
    gym::{Breakout, CartPole, FrozenLake, GridWorld, MountainCar},
};

/// Hyperparameters shared by every algorithm; each agent reads the ones it uses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparams {
    /// **Default**: `0.9`
    pub gamma: f64,
    /// **Default**: `0.1`
    pub alpha: f64,
    /// Exploration probability, unless `epsilon_decay` is set
    ///
    /// **Default**: `0.1`
    pub epsilon: f64,
    /// Per-episode schedule of the exploration probability, overriding `epsilon`
    pub epsilon_decay: Option<Schedule>,
    /// Episodes per training run of the model-free agents
    ///
    /// **Default**: `100`
    pub episodes: usize,
    /// **Default**: `3`
    pub n_step: usize,
    /// **Default**: `1e-4`
    pub theta: f64,
    /// **Default**: `true`
    pub first_visit: bool,
    /// Iterations per training run of the planning agents
    ///
    /// **Default**: `100`
    pub max_iterations: usize,
}

impl Default for Hyperparams {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            alpha: 0.1,
            epsilon: 0.1,
            epsilon_decay: None,
            episodes: 100,
            n_step: 3,
            theta: 1e-4,
            first_visit: true,
            max_iterations: 100,
        }
    }
}

impl Hyperparams {
    /// The epsilon greedy policy described by `epsilon` and `epsilon_decay`
    ///
    /// **Errors** if `epsilon` is not in the interval `[0,1]` or the schedule is invalid
    pub fn exploration(&self) -> Result<EpsilonGreedy<Schedule>> {
        let schedule = match self.epsilon_decay {
            Some(schedule) => {
                schedule.validate()?;
                schedule
            }
            None => {
                let epsilon = self.epsilon;
                ensure_interval!(epsilon, 0.0, 1.0);
                Schedule::Constant(Constant::new(epsilon))
            }
        };
        Ok(EpsilonGreedy::new(schedule))
    }
}

/// The built-in environments
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentKind {
    /// 5×5 [`GridWorld`]
    #[default]
    GridWorld,
    /// 4×4 slippery [`FrozenLake`]
    FrozenLake,
    CartPole,
    MountainCar,
    Breakout,
}

/// Mixed into the session seed so the environment and the agent draw from unrelated streams
const ENVIRONMENT_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// The environment's share of a session seed
pub(crate) fn environment_seed(seed: Option<u64>) -> Option<u64> {
    seed.map(|seed| seed ^ ENVIRONMENT_SEED_MIX)
}

impl EnvironmentKind {
    /// Construct the environment with its default rewards
    ///
    /// `seed` is the session seed; the environment's generator is seeded from a value
    /// derived from it, so an agent built from the same seed never replays its rolls
    pub fn build(self, seed: Option<u64>) -> Box<dyn Environment> {
        let seed = environment_seed(seed);
        match self {
            Self::GridWorld => Box::new(GridWorld::new(5)),
            Self::FrozenLake => {
                let lake = FrozenLake::new(4);
                Box::new(match seed {
                    Some(seed) => lake.seeded(seed),
                    None => lake,
                })
            }
            Self::CartPole => Box::new(CartPole::new()),
            Self::MountainCar => Box::new(MountainCar::new()),
            Self::Breakout => {
                let game = Breakout::new();
                Box::new(match seed {
                    Some(seed) => game.seeded(seed),
                    None => game,
                })
            }
        }
    }
}

/// The implemented algorithms
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    PolicyEvaluation,
    PolicyIteration,
    ValueIteration,
    #[default]
    QLearning,
    Sarsa,
    MonteCarlo,
    Td,
    NStep,
}

impl AlgorithmKind {
    /// Whether the algorithm plans with a transition model instead of sampling experience
    pub fn requires_transition_model(self) -> bool {
        matches!(
            self,
            Self::PolicyEvaluation | Self::PolicyIteration | Self::ValueIteration
        )
    }

    /// Training primitives per run: `max_iterations` for planners, `episodes` otherwise
    pub fn iterations(self, params: &Hyperparams) -> usize {
        if self.requires_transition_model() {
            params.max_iterations
        } else {
            params.episodes
        }
    }

    /// Construct an agent bound to `env`
    ///
    /// Policy evaluation starts from a uniformly random deterministic policy.
    ///
    /// **Errors** if a planner is requested for an environment without a transition
    /// model, or if a hyperparameter is out of range
    pub fn build(
        self,
        env: &dyn Environment,
        params: &Hyperparams,
        seed: Option<u64>,
    ) -> Result<Box<dyn Agent>> {
        let planning = PlanningConfig {
            gamma: params.gamma,
            theta: params.theta,
            seed,
            ..Default::default()
        };
        let tabular = || -> Result<TabularConfig<Schedule>> {
            Ok(TabularConfig {
                exploration: params.exploration()?,
                alpha: params.alpha,
                gamma: params.gamma,
                seed,
            })
        };

        let agent: Box<dyn Agent> = match self {
            Self::PolicyEvaluation => Box::new(PolicyEvaluation::random(env, planning)?),
            Self::PolicyIteration => Box::new(PolicyIteration::new(env, planning)?),
            Self::ValueIteration => Box::new(ValueIteration::new(env, planning)?),
            Self::QLearning => Box::new(QLearningAgent::new(env, tabular()?)?),
            Self::Sarsa => Box::new(SarsaAgent::new(env, tabular()?)?),
            Self::MonteCarlo => Box::new(MonteCarloAgent::new(
                env,
                MonteCarloConfig {
                    exploration: params.exploration()?,
                    gamma: params.gamma,
                    first_visit: params.first_visit,
                    seed,
                },
            )?),
            Self::Td => Box::new(TdAgent::new(
                env,
                TdConfig {
                    alpha: params.alpha,
                    gamma: params.gamma,
                    seed,
                },
            )?),
            Self::NStep => Box::new(NStepSarsaAgent::new(
                env,
                NStepConfig {
                    exploration: params.exploration()?,
                    alpha: params.alpha,
                    gamma: params.gamma,
                    n: params.n_step,
                    seed,
                },
            )?),
        };
        Ok(agent)
    }
}

/// Everything needed to build a [`Session`](crate::session::Session)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub environment: EnvironmentKind,
    pub algorithm: AlgorithmKind,
    pub params: Hyperparams,
    /// Seed for the agent's random number generator; the environment's is derived from it
    pub seed: Option<u64>,
}
