use serde::{Deserialize, Serialize};

use crate::env::{Environment, Step, Transition, TransitionModel};

use super::grid::{Grid, Move};

/// Rewards of the [`GridWorld`] environment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridWorldRewards {
    pub goal: f64,
    pub step: f64,
    pub obstacle: f64,
}

impl Default for GridWorldRewards {
    fn default() -> Self {
        Self {
            goal: 10.0,
            step: -0.1,
            obstacle: -1.0,
        }
    }
}

/// A deterministic square grid with obstacles and a goal in the bottom right corner
///
/// The agent starts in the top left corner. Moving into an obstacle is refused and
/// penalized, reaching the goal ends the episode.
#[derive(Debug, Clone)]
pub struct GridWorld {
    grid: Grid,
    goal: usize,
    obstacles: Vec<usize>,
    rewards: GridWorldRewards,
    pos: usize,
}

impl GridWorld {
    /// A grid of `size × size` cells with the default obstacles `{size + 1, 2 * size + 2}`
    pub fn new(size: usize) -> Self {
        Self::with_rewards(size, GridWorldRewards::default())
    }

    pub fn with_rewards(size: usize, rewards: GridWorldRewards) -> Self {
        let grid = Grid::new(size);
        Self {
            grid,
            goal: grid.cells() - 1,
            obstacles: vec![size + 1, size * 2 + 2],
            rewards,
            pos: 0,
        }
    }

    /// Replace the obstacle cells
    pub fn with_obstacles(mut self, obstacles: Vec<usize>) -> Self {
        self.obstacles = obstacles;
        self
    }

    pub fn goal(&self) -> usize {
        self.goal
    }

    pub fn obstacles(&self) -> &[usize] {
        &self.obstacles
    }

    /// `(row, col)` of a state, for display
    pub fn coords(&self, state: usize) -> (usize, usize) {
        self.grid.coords(state)
    }

    fn outcome(&self, state: usize, action: usize) -> Transition {
        let next = self.grid.neighbor(state, Move::from_action(action));

        if self.obstacles.contains(&next) {
            return Transition {
                next_state: state,
                probability: 1.0,
                reward: self.rewards.obstacle,
                terminal: false,
            };
        }

        let terminal = next == self.goal;
        Transition {
            next_state: next,
            probability: 1.0,
            reward: if terminal {
                self.rewards.goal
            } else {
                self.rewards.step
            },
            terminal,
        }
    }
}

impl Default for GridWorld {
    fn default() -> Self {
        Self::new(5)
    }
}

impl TransitionModel for GridWorld {
    fn transitions(&self, state: usize, action: usize) -> Vec<Transition> {
        vec![self.outcome(state, action)]
    }
}

impl Environment for GridWorld {
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
        let outcome = self.outcome(self.pos, action);
        self.pos = outcome.next_state;
        Step {
            state: outcome.next_state,
            reward: outcome.reward,
            terminal: outcome.terminal,
        }
    }

    fn model(&self) -> Option<&dyn TransitionModel> {
        Some(self)
    }
}
