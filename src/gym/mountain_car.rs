use serde::{Deserialize, Serialize};

use crate::env::{Environment, Step};

use super::bin;

const FORCE: f64 = 0.001;
const GRAVITY: f64 = 0.0025;
const MIN_POSITION: f64 = -1.2;
const MAX_POSITION: f64 = 0.6;
const MAX_SPEED: f64 = 0.07;
const GOAL_POSITION: f64 = 0.5;
const START_POSITION: f64 = -0.5;
const BINS: usize = 10;

/// Rewards and episode length of the [`MountainCar`] environment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountainCarRewards {
    pub goal: f64,
    pub step: f64,
    pub max_steps: u32,
}

impl Default for MountainCarRewards {
    fn default() -> Self {
        Self {
            goal: 0.0,
            step: -1.0,
            max_steps: 200,
        }
    }
}

/// An underpowered car in a valley that has to build momentum to reach the hilltop
///
/// Actions are 0 (push left), 1 (no push) and 2 (push right). The state is a 10×10 grid
/// over position and velocity.
#[derive(Debug, Clone)]
pub struct MountainCar {
    position: f64,
    velocity: f64,
    steps: u32,
    rewards: MountainCarRewards,
}

impl MountainCar {
    pub fn new() -> Self {
        Self::with_rewards(MountainCarRewards::default())
    }

    pub fn with_rewards(rewards: MountainCarRewards) -> Self {
        Self {
            position: START_POSITION,
            velocity: 0.0,
            steps: 0,
            rewards,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    fn state(&self) -> usize {
        let position = bin(self.position, MIN_POSITION, MAX_POSITION, BINS);
        let velocity = bin(self.velocity, -MAX_SPEED, MAX_SPEED, BINS);
        position * BINS + velocity
    }
}

impl Default for MountainCar {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for MountainCar {
    fn n_states(&self) -> usize {
        BINS * BINS
    }

    fn n_actions(&self) -> usize {
        3
    }

    fn reset(&mut self) -> usize {
        *self = Self::with_rewards(self.rewards);
        self.state()
    }

    fn step(&mut self, action: usize) -> Step {
        assert!(action < 3, "Invalid action: {}", action);

        let push = (action as f64 - 1.0) * FORCE;
        self.velocity += push - GRAVITY * (3.0 * self.position).cos();
        self.velocity = self.velocity.clamp(-MAX_SPEED, MAX_SPEED);
        self.position = (self.position + self.velocity).clamp(MIN_POSITION, MAX_POSITION);
        if self.position <= MIN_POSITION {
            self.velocity = 0.0;
        }
        self.steps += 1;

        let reached = self.position >= GOAL_POSITION;
        Step {
            state: self.state(),
            reward: if reached {
                self.rewards.goal
            } else {
                self.rewards.step
            },
            terminal: reached || self.steps >= self.rewards.max_steps,
        }
    }
}
