//! Dynamic programming agents
//!
//! These agents plan with an environment's [`TransitionModel`] and never sample experience.
//! Sweeps are synchronous: every state in a sweep is backed up from the previous sweep's values.

use serde::{Deserialize, Serialize};

use crate::{
    ensure_interval,
    env::{Environment, TransitionModel},
    error::{Error, Result},
    util::finite_or_zero,
};

mod policy_evaluation;
mod policy_iteration;
mod value_iteration;

pub use policy_evaluation::PolicyEvaluation;
pub use policy_iteration::PolicyIteration;
pub use value_iteration::ValueIteration;

/// Configuration shared by the planning agents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Discount factor
    ///
    /// **Default**: `0.9`
    pub gamma: f64,
    /// A sweep whose largest value change is below `theta` ends evaluation
    ///
    /// **Default**: `1e-4`
    pub theta: f64,
    /// Evaluation sweeps per policy iteration round
    ///
    /// **Default**: `10`
    pub eval_sweeps: usize,
    /// Seed for the random initial policy of [`PolicyEvaluation::random`]
    pub seed: Option<u64>,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            theta: 1e-4,
            eval_sweeps: 10,
            seed: None,
        }
    }
}

impl PlanningConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        let &Self {
            gamma,
            theta,
            eval_sweeps,
            ..
        } = self;
        ensure_interval!(gamma, 0.0, 1.0);
        if !(theta >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "theta must be non-negative, got {theta}"
            )));
        }
        if eval_sweeps == 0 {
            return Err(Error::InvalidParameter(
                "eval_sweeps must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// The transition model of `env`, or [`Error::ModelRequired`]
pub(crate) fn require_model<'a>(
    env: &'a dyn Environment,
    algorithm: &'static str,
) -> Result<&'a dyn TransitionModel> {
    env.model().ok_or(Error::ModelRequired { algorithm })
}

/// Expected one-step return of taking `action` in `state`, bootstrapping from `values`
///
/// Terminal transitions do not bootstrap; missing or non-finite successor values read as 0.
pub(crate) fn expected_return(
    model: &dyn TransitionModel,
    values: &[f64],
    gamma: f64,
    state: usize,
    action: usize,
) -> f64 {
    model
        .transitions(state, action)
        .iter()
        .map(|t| {
            let next_value = if t.terminal {
                0.0
            } else {
                values
                    .get(t.next_state)
                    .copied()
                    .map(finite_or_zero)
                    .unwrap_or_default()
            };
            t.probability * (t.reward + gamma * next_value)
        })
        .sum()
}

/// The first action with the strictly greatest expected return, and that return
///
/// Non-finite returns never win; if no action has a finite return, action 0 is chosen.
pub(crate) fn greedy(
    model: &dyn TransitionModel,
    values: &[f64],
    gamma: f64,
    state: usize,
    n_actions: usize,
) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for action in 0..n_actions {
        let value = expected_return(model, values, gamma, state, action);
        if value.is_finite() && value > best.1 {
            best = (action, value);
        }
    }
    best
}

/// Keep `new` unless it is non-finite, in which case `old` survives
pub(crate) fn accept_value(old: f64, new: f64) -> f64 {
    if new.is_finite() {
        new
    } else {
        log::trace!("discarding non-finite backup {new}");
        finite_or_zero(old)
    }
}

/// Largest absolute difference between two value arrays
pub(crate) fn max_change(old: &[f64], new: &[f64]) -> f64 {
    old.iter()
        .zip(new)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{env::tests::MockEnv, gym::CartPole};

    #[test]
    fn expected_return_masks_terminal() {
        let env = MockEnv::new(3);
        let values = [5.0, 7.0, 100.0];
        assert_eq!(expected_return(&env, &values, 0.5, 0, 1), 3.5);
        assert_eq!(
            expected_return(&env, &values, 0.5, 1, 1),
            1.0,
            "Terminal successor does not bootstrap"
        );
        assert_eq!(expected_return(&env, &[f64::NAN; 3], 0.5, 0, 1), 0.0);
    }

    #[test]
    fn greedy_prefers_first_best() {
        let env = MockEnv::new(3);
        assert_eq!(greedy(&env, &[0.0; 3], 0.9, 1, 2), (1, 1.0));
        assert_eq!(greedy(&env, &[0.0; 3], 0.9, 0, 2).0, 0, "Ties keep action 0");
    }

    #[test]
    fn model_is_required() {
        assert!(require_model(&MockEnv::new(3), "test").is_ok());
        assert!(matches!(
            require_model(&CartPole::new(), "test"),
            Err(Error::ModelRequired { algorithm: "test" })
        ));
    }

    #[test]
    fn config_validation() {
        assert!(PlanningConfig::default().validate().is_ok());
        let config = PlanningConfig {
            gamma: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = PlanningConfig {
            eval_sweeps: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn max_change_functional() {
        assert_eq!(max_change(&[0.0, 1.0], &[0.5, -1.0]), 2.0);
    }
}
