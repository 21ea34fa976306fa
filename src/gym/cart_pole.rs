use serde::{Deserialize, Serialize};
use strum::{EnumIter, FromRepr, VariantArray};

use crate::env::{Environment, Step};

use super::bin;

const GRAVITY: f64 = 9.8;
const MASS_CART: f64 = 1.0;
const MASS_POLE: f64 = 0.1;
const TOTAL_MASS: f64 = MASS_CART + MASS_POLE;
/// Half the length of the pole
const LENGTH: f64 = 0.5;
const FORCE: f64 = 1.0;
const DT: f64 = 0.02;

const POSITION_LIMIT: f64 = 2.4;
const ANGLE_LIMIT: f64 = 0.42;
const VELOCITY_LIMIT: f64 = 10.0;
const BINS: usize = 10;

/// Actions for the [`CartPole`] environment: pushing the cart left or right
#[derive(FromRepr, EnumIter, VariantArray, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CPAction {
    Left = 0,
    Right = 1,
}

impl From<usize> for CPAction {
    fn from(value: usize) -> Self {
        Self::from_repr(value).unwrap_or_else(|| panic!("Invalid action: {}", value))
    }
}

/// Rewards and episode length of the [`CartPole`] environment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartPoleRewards {
    /// Reward for every step the pole stays up
    pub step: f64,
    /// Reward for the step on which the pole falls or the cart leaves the track
    pub fail: f64,
    pub max_steps: u32,
}

impl Default for CartPoleRewards {
    fn default() -> Self {
        Self {
            step: 1.0,
            fail: 0.0,
            max_steps: 200,
        }
    }
}

/// The classic CartPole reinforcement learning environment
///
/// The continuous state is discretized into a 10×10 grid over cart position and pole angle.
#[derive(Debug, Clone, Default)]
pub struct CartPole {
    position: f64,
    velocity: f64,
    angle: f64,
    angular_velocity: f64,
    steps: u32,
    rewards: CartPoleRewards,
}

impl CartPole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rewards(rewards: CartPoleRewards) -> Self {
        Self {
            rewards,
            ..Self::default()
        }
    }

    /// `[position, velocity, angle, angular velocity]`
    pub fn observation(&self) -> [f64; 4] {
        [
            self.position,
            self.velocity,
            self.angle,
            self.angular_velocity,
        ]
    }

    fn state(&self) -> usize {
        let position = bin(self.position, -POSITION_LIMIT, POSITION_LIMIT, BINS);
        let angle = bin(self.angle, -ANGLE_LIMIT, ANGLE_LIMIT, BINS);
        position * BINS + angle
    }
}

impl Environment for CartPole {
    fn n_states(&self) -> usize {
        BINS * BINS
    }

    fn n_actions(&self) -> usize {
        2
    }

    fn reset(&mut self) -> usize {
        *self = Self::with_rewards(self.rewards);
        self.state()
    }

    fn step(&mut self, action: usize) -> Step {
        let force = match CPAction::from(action) {
            CPAction::Left => -FORCE,
            CPAction::Right => FORCE,
        };

        let (sin, cos) = self.angle.sin_cos();
        let temp =
            (force + MASS_POLE * LENGTH * self.angular_velocity.powi(2) * sin) / TOTAL_MASS;
        let angular_accel = (GRAVITY * sin - cos * temp)
            / (LENGTH * (4.0 / 3.0 - MASS_POLE * cos.powi(2) / TOTAL_MASS));
        let accel = temp - MASS_POLE * LENGTH * angular_accel * cos / TOTAL_MASS;

        // Semi-implicit Euler: velocities first, positions from the new velocities
        self.velocity += accel * DT;
        self.position += self.velocity * DT;
        self.angular_velocity += angular_accel * DT;
        self.angle += self.angular_velocity * DT;
        self.steps += 1;

        let failed = !(self.position.abs() <= POSITION_LIMIT && self.angle.abs() <= ANGLE_LIMIT);

        self.position = self.position.clamp(-POSITION_LIMIT, POSITION_LIMIT);
        self.angle = self.angle.clamp(-ANGLE_LIMIT, ANGLE_LIMIT);
        self.velocity = self.velocity.clamp(-VELOCITY_LIMIT, VELOCITY_LIMIT);
        self.angular_velocity = self
            .angular_velocity
            .clamp(-VELOCITY_LIMIT, VELOCITY_LIMIT);

        Step {
            state: self.state(),
            reward: if failed {
                self.rewards.fail
            } else {
                self.rewards.step
            },
            terminal: failed || self.steps >= self.rewards.max_steps,
        }
    }
}
