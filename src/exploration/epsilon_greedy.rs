use rand::{seq::SliceRandom, Rng};

use crate::{
    decay::{self, Decay},
    ensure_interval,
    error::Result,
    util::near_max_indices,
};

use super::Choice;

/// Epsilon greedy exploration policy with time-decaying epsilon threshold
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self { epsilon: decay }
    }

    /// The exploration probability for the given episode, clamped to `[0, 1]`
    pub fn epsilon(&self, episode: u32) -> f64 {
        self.epsilon.evaluate(episode as f64).clamp(0.0, 1.0)
    }

    /// Invoke epsilon greedy policy for current episode
    pub fn choose<R: Rng + ?Sized>(&self, episode: u32, rng: &mut R) -> Choice {
        if rng.gen::<f64>() < self.epsilon(episode) {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }

    /// Select an action given the action values of the current state
    ///
    /// Exploitation picks uniformly among the actions tied for the best finite value.
    /// A row without any finite value, or an empty row, yields a uniformly random action.
    pub fn select<R: Rng + ?Sized>(
        &self,
        row: &[f64],
        n_actions: usize,
        episode: u32,
        rng: &mut R,
    ) -> usize {
        match self.choose(episode, rng) {
            Choice::Explore => rng.gen_range(0..n_actions),
            Choice::Exploit => near_max_indices(row)
                .choose(rng)
                .copied()
                .unwrap_or_else(|| rng.gen_range(0..n_actions)),
        }
    }
}

impl EpsilonGreedy<decay::Constant> {
    /// Epsilon greedy policy with a fixed epsilon
    ///
    /// **Errors** if `epsilon` is not in the interval `[0,1]`
    pub fn constant(epsilon: f64) -> Result<Self> {
        ensure_interval!(epsilon, 0.0, 1.0);
        Ok(Self::new(decay::Constant::new(epsilon)))
    }
}

impl Default for EpsilonGreedy<decay::Constant> {
    fn default() -> Self {
        Self::new(decay::Constant::new(0.1))
    }
}
