/// The outcome of a single environment step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Discretized state index after the action was applied
    pub state: usize,
    /// Reward received for the transition
    pub reward: f64,
    /// Whether the episode ended with this transition
    pub terminal: bool,
}

/// One possible outcome of taking an action in a state, as described by a transition model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub next_state: usize,
    pub probability: f64,
    pub reward: f64,
    pub terminal: bool,
}

/// An exact description of the one-step dynamics of an environment
///
/// Required by the dynamic programming agents, which never sample experience.
pub trait TransitionModel {
    /// The distribution over outcomes of taking `action` in `state`
    ///
    /// The probabilities of the returned transitions sum to 1. Calling this never
    /// affects a running episode.
    fn transitions(&self, state: usize, action: usize) -> Vec<Transition>;
}

/// Represents a finite Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// States and actions are indices in `0..n_states()` and `0..n_actions()`. Environments
/// with continuous dynamics discretize their measurements into that index space.
pub trait Environment {
    /// Size of the discrete state space
    fn n_states(&self) -> usize;

    /// Size of the discrete action space
    fn n_actions(&self) -> usize;

    /// Reset the environment to its initial state
    ///
    /// **Returns** the initial state
    fn reset(&mut self) -> usize;

    /// Update the environment in response to an action taken by an agent
    fn step(&mut self, action: usize) -> Step;

    /// The transition model of this environment, if it has one
    fn model(&self) -> Option<&dyn TransitionModel> {
        None
    }

    /// Whether model-based planning is possible in this environment
    fn has_transition_model(&self) -> bool {
        self.model().is_some()
    }

    /// `(n_states, n_actions)`
    fn dims(&self) -> (usize, usize) {
        (self.n_states(), self.n_actions())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A corridor of `len` cells; action 1 moves right, action 0 moves left.
    ///
    /// Reaching the last cell pays 1 and terminates, every other step pays 0.
    /// With `endless` set, the corridor never terminates.
    pub struct MockEnv {
        pub len: usize,
        pub pos: usize,
        pub endless: bool,
        pub steps: usize,
    }

    impl MockEnv {
        pub fn new(len: usize) -> Self {
            Self {
                len,
                pos: 0,
                endless: false,
                steps: 0,
            }
        }

        pub fn endless(len: usize) -> Self {
            Self {
                endless: true,
                ..Self::new(len)
            }
        }

        fn outcome(&self, state: usize, action: usize) -> (usize, f64, bool) {
            let next = match action {
                0 => state.saturating_sub(1),
                _ => (state + 1).min(self.len - 1),
            };
            let done = !self.endless && next == self.len - 1;
            (next, if done { 1.0 } else { 0.0 }, done)
        }
    }

    impl TransitionModel for MockEnv {
        fn transitions(&self, state: usize, action: usize) -> Vec<Transition> {
            let (next_state, reward, terminal) = self.outcome(state, action);
            vec![Transition {
                next_state,
                probability: 1.0,
                reward,
                terminal,
            }]
        }
    }

    impl Environment for MockEnv {
        fn n_states(&self) -> usize {
            self.len
        }

        fn n_actions(&self) -> usize {
            2
        }

        fn reset(&mut self) -> usize {
            self.pos = 0;
            self.pos
        }

        fn step(&mut self, action: usize) -> Step {
            self.steps += 1;
            let (state, reward, terminal) = self.outcome(self.pos, action);
            self.pos = state;
            Step {
                state,
                reward,
                terminal,
            }
        }

        fn model(&self) -> Option<&dyn TransitionModel> {
            Some(self)
        }
    }

    /// An environment without a model whose second step reports a state out of range
    pub struct BrokenEnv;

    impl Environment for BrokenEnv {
        fn n_states(&self) -> usize {
            3
        }

        fn n_actions(&self) -> usize {
            2
        }

        fn reset(&mut self) -> usize {
            0
        }

        fn step(&mut self, action: usize) -> Step {
            Step {
                state: if action == 0 { 1 } else { 99 },
                reward: 0.5,
                terminal: false,
            }
        }
    }

    /// Resets into a state it does not have
    pub struct LostEnv;

    impl Environment for LostEnv {
        fn n_states(&self) -> usize {
            3
        }

        fn n_actions(&self) -> usize {
            2
        }

        fn reset(&mut self) -> usize {
            5
        }

        fn step(&mut self, _action: usize) -> Step {
            Step {
                state: 0,
                reward: 1.0,
                terminal: true,
            }
        }
    }

    #[test]
    fn mock_env_functional() {
        let mut env = MockEnv::new(3);
        assert_eq!(env.dims(), (3, 2));
        assert!(env.has_transition_model());
        assert_eq!(env.reset(), 0);
        assert_eq!(env.step(0).state, 0, "Left wall clamps");
        let step = env.step(1);
        assert_eq!((step.state, step.terminal), (1, false));
        let step = env.step(1);
        assert_eq!((step.state, step.reward, step.terminal), (2, 1.0, true));
        assert!(!BrokenEnv.has_transition_model());
    }

    #[test]
    fn boxed_environment_delegates() {
        let mut env: Box<dyn Environment> = Box::new(MockEnv::new(4));
        assert_eq!(env.dims(), (4, 2));
        assert!(env.has_transition_model());
        assert_eq!(env.reset(), 0);
        assert_eq!(env.step(1).state, 1);
    }
}
