use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::env::{Environment, Step, Transition, TransitionModel};

use super::grid::{Grid, Move};

/// Probability that the intended move is carried out on slippery ice
pub const INTENDED_PROB: f64 = 0.34;
/// Probability of slipping to each side of the intended move
pub const SLIP_PROB: f64 = 0.33;

/// Rewards of the [`FrozenLake`] environment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrozenLakeRewards {
    pub goal: f64,
    pub hole: f64,
    pub step: f64,
}

impl Default for FrozenLakeRewards {
    fn default() -> Self {
        Self {
            goal: 1.0,
            hole: -1.0,
            step: -0.01,
        }
    }
}

/// A slippery grid modelled on the frozen lake of Python [gymnasium](https://gymnasium.farama.org/)
///
/// Moves succeed with probability [`INTENDED_PROB`] and otherwise slip to one of the two
/// orthogonal directions. Falling into a hole or reaching the goal ends the episode.
#[derive(Debug, Clone)]
pub struct FrozenLake {
    grid: Grid,
    holes: Vec<usize>,
    goal: usize,
    slippery: bool,
    rewards: FrozenLakeRewards,
    pos: usize,
    rng: StdRng,
}

impl FrozenLake {
    /// A slippery lake of `size × size` cells with holes at `{5, 7, 11, 12}`
    pub fn new(size: usize) -> Self {
        Self::with_rewards(size, FrozenLakeRewards::default())
    }

    pub fn with_rewards(size: usize, rewards: FrozenLakeRewards) -> Self {
        let grid = Grid::new(size);
        let goal = grid.cells() - 1;
        Self {
            grid,
            holes: [5, 7, 11, 12]
                .into_iter()
                .filter(|&h| h < goal)
                .collect(),
            goal,
            slippery: true,
            rewards,
            pos: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Seed the random source used for slipping
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Turn slipping on or off
    pub fn slippery(mut self, slippery: bool) -> Self {
        self.slippery = slippery;
        self
    }

    /// Replace the hole cells
    pub fn with_holes(mut self, holes: Vec<usize>) -> Self {
        self.holes = holes;
        self
    }

    pub fn holes(&self) -> &[usize] {
        &self.holes
    }

    pub fn goal(&self) -> usize {
        self.goal
    }

    /// `(row, col)` of a state, for display
    pub fn coords(&self, state: usize) -> (usize, usize) {
        self.grid.coords(state)
    }

    fn outcome(&self, state: usize, mv: Move) -> (usize, f64, bool) {
        let next = self.grid.neighbor(state, mv);
        if next == self.goal {
            (next, self.rewards.goal, true)
        } else if self.holes.contains(&next) {
            (next, self.rewards.hole, true)
        } else {
            (next, self.rewards.step, false)
        }
    }
}

impl Default for FrozenLake {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TransitionModel for FrozenLake {
    fn transitions(&self, state: usize, action: usize) -> Vec<Transition> {
        let mv = Move::from_action(action);
        let moves = if self.slippery {
            vec![
                (mv, INTENDED_PROB),
                (mv.left_of(), SLIP_PROB),
                (mv.right_of(), SLIP_PROB),
            ]
        } else {
            vec![(mv, 1.0)]
        };

        let mut result: Vec<Transition> = Vec::with_capacity(moves.len());
        for (mv, probability) in moves {
            let (next_state, reward, terminal) = self.outcome(state, mv);
            match result.iter_mut().find(|t| {
                t.next_state == next_state && t.reward == reward && t.terminal == terminal
            }) {
                Some(existing) => existing.probability += probability,
                None => result.push(Transition {
                    next_state,
                    probability,
                    reward,
                    terminal,
                }),
            }
        }

        result
    }
}

impl Environment for FrozenLake {
    fn n_states(&self) -> usize {
        self.grid.cells()
    }

    fn n_actions(&self) -> usize {
        4
    }

    fn reset(&mut self) -> usize {
        self.pos = 0;
        self.pos
    }

    fn step(&mut self, action: usize) -> Step {
        let mut mv = Move::from_action(action);
        if self.slippery {
            let roll = self.rng.gen::<f64>();
            if roll < SLIP_PROB {
                mv = mv.left_of();
            } else if roll < 2.0 * SLIP_PROB {
                mv = mv.right_of();
            }
        }

        let (state, reward, terminal) = self.outcome(self.pos, mv);
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

#[cfg(test)]
mod tests {
    use statrs::distribution::{Binomial, DiscreteCDF};

    use super::*;

    #[test]
    fn probabilities_sum_to_one() {
        let env = FrozenLake::new(4);
        for state in 0..env.n_states() {
            for action in 0..env.n_actions() {
                let total: f64 = env
                    .transitions(state, action)
                    .iter()
                    .map(|t| t.probability)
                    .sum();
                assert!(
                    (total - 1.0).abs() < 1e-9,
                    "Transitions of ({state}, {action}) sum to {total}"
                );
            }
        }
    }

    #[test]
    fn corner_transitions() {
        let env = FrozenLake::new(4);
        let transitions = env.transitions(0, Move::Right as usize);
        let outcomes: Vec<_> = transitions
            .iter()
            .map(|t| (t.next_state, t.probability))
            .collect();
        assert_eq!(outcomes, vec![(1, 0.34), (0, 0.33), (4, 0.33)]);
    }

    #[test]
    fn duplicate_outcomes_are_merged() {
        let env = FrozenLake::new(4);
        // Up and left are both blocked in the corner
        let transitions = env.transitions(0, Move::Up as usize);
        assert_eq!(transitions.len(), 2, "Blocked moves collapse into one entry");
        assert_eq!(transitions[0].next_state, 0);
        assert!((transitions[0].probability - 0.67).abs() < 1e-12);
        assert_eq!(transitions[1].next_state, 1);
    }

    #[test]
    fn holes_and_goal_terminate() {
        let env = FrozenLake::new(4).slippery(false);
        let hole = env.transitions(1, Move::Down as usize);
        assert_eq!(hole.len(), 1);
        assert_eq!((hole[0].next_state, hole[0].reward, hole[0].terminal), (5, -1.0, true));

        let goal = env.transitions(14, Move::Right as usize);
        assert_eq!((goal[0].next_state, goal[0].reward, goal[0].terminal), (15, 1.0, true));
        assert_eq!(env.coords(14), (3, 2));
    }

    #[test]
    fn slip_frequency_matches_model() {
        const TRIALS: u64 = 5000;
        let mut env = FrozenLake::new(4).seeded(42);
        let mut intended = 0;
        for _ in 0..TRIALS {
            env.reset();
            if env.step(Move::Right as usize).state == 1 {
                intended += 1;
            }
        }

        let binomial = Binomial::new(INTENDED_PROB, TRIALS).unwrap();
        let p = binomial.cdf(intended);
        assert!(
            p > 1e-4 && p < 1.0 - 1e-4,
            "Observed {intended} intended moves in {TRIALS} trials"
        );
    }

    #[test]
    fn seeded_lakes_agree() {
        let mut a = FrozenLake::new(4).seeded(5);
        let mut b = FrozenLake::new(4).seeded(5);
        for action in [1, 2, 2, 1, 0, 3, 2, 1] {
            assert_eq!(a.step(action), b.step(action));
        }
    }
}
