/// Maximum number of transitions in a single episode
///
/// Episodes that have not terminated by then are cut off.
pub const MAX_EPISODE_STEPS: usize = 1000;

/// Represents a single step of an episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exp {
    /// The state of the environment before taking the action
    pub state: usize,
    /// The action taken in the given state
    pub action: usize,
    /// The reward received after taking the action
    pub reward: f64,
}

/// The ordered trace of an episode from reset to termination
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Episode {
    steps: Vec<Exp>,
    /// Whether the episode ended in a terminal state, rather than being cut off or aborted
    pub terminated: bool,
}

impl Episode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step
    ///
    /// **Returns** `false` without recording anything once [`MAX_EPISODE_STEPS`] is reached
    pub fn push(&mut self, exp: Exp) -> bool {
        if self.is_full() {
            return false;
        }
        self.steps.push(exp);
        true
    }

    pub fn is_full(&self) -> bool {
        self.steps.len() >= MAX_EPISODE_STEPS
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Exp] {
        &self.steps
    }

    /// Undiscounted sum of rewards
    pub fn total_reward(&self) -> f64 {
        self.steps.iter().map(|e| e.reward).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_is_capped() {
        let mut episode = Episode::new();
        for i in 0..MAX_EPISODE_STEPS {
            assert!(episode.push(Exp {
                state: i,
                action: 0,
                reward: 1.0,
            }));
        }
        assert!(episode.is_full());
        assert!(!episode.push(Exp {
            state: 0,
            action: 0,
            reward: 1.0,
        }));
        assert_eq!(episode.len(), MAX_EPISODE_STEPS);
        assert_eq!(episode.total_reward(), MAX_EPISODE_STEPS as f64);
    }
}
