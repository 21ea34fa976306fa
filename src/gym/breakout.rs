use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, FromRepr, VariantArray};

use crate::env::{Environment, Step};

use super::bin;

const WIDTH: f64 = 10.0;
const HEIGHT: f64 = 20.0;
const BALL_SPEED: f64 = 0.5;
const PADDLE_REACH: f64 = 1.5;
const BRICK_HALF_SIZE: f64 = 0.8;
const BINS: usize = 10;

/// Paddle actions for the [`Breakout`] environment
#[derive(FromRepr, EnumIter, VariantArray, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Paddle {
    Left = 0,
    Stay = 1,
    Right = 2,
}

/// Rewards of the [`Breakout`] environment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutRewards {
    pub brick: f64,
    pub miss: f64,
    pub step: f64,
    pub win: f64,
}

impl Default for BreakoutRewards {
    fn default() -> Self {
        Self {
            brick: 1.0,
            miss: -1.0,
            step: -0.1,
            win: 10.0,
        }
    }
}

/// A small brick-breaking game on a 10×20 board
///
/// The state index combines coarse bins of the paddle position, the ball's horizontal
/// position and the ball's height as `paddle * 100 + ball_x * 10 + ball_y`.
#[derive(Debug, Clone)]
pub struct Breakout {
    paddle: usize,
    ball: (f64, f64),
    velocity: (f64, f64),
    bricks: Vec<(f64, f64)>,
    score: u32,
    rewards: BreakoutRewards,
    rng: StdRng,
}

impl Breakout {
    pub fn new() -> Self {
        Self::with_rewards(BreakoutRewards::default())
    }

    pub fn with_rewards(rewards: BreakoutRewards) -> Self {
        let mut env = Self {
            paddle: 0,
            ball: (0.0, 0.0),
            velocity: (0.0, 0.0),
            bricks: Vec::new(),
            score: 0,
            rewards,
            rng: StdRng::from_entropy(),
        };
        env.reset();
        env
    }

    /// Seed the random source used for serving and paddle bounces
    ///
    /// The board is reset with the new source.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.reset();
        self
    }

    pub fn bricks_left(&self) -> usize {
        self.bricks.len()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Split a state index into its `(paddle, ball_x, ball_y)` bins, for display
    pub fn decode_state(state: usize) -> (usize, usize, usize) {
        (state / 100, (state % 100) / 10, state % 10)
    }

    fn state(&self) -> usize {
        let paddle = bin(self.paddle as f64, 0.0, WIDTH, BINS);
        let ball_x = bin(self.ball.0, 0.0, WIDTH, BINS);
        let ball_y = bin(self.ball.1, 0.0, HEIGHT, BINS);
        paddle * BINS * BINS + ball_x * BINS + ball_y
    }
}

impl Default for Breakout {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for Breakout {
    fn n_states(&self) -> usize {
        BINS * BINS * BINS
    }

    fn n_actions(&self) -> usize {
        3
    }

    fn reset(&mut self) -> usize {
        let width = WIDTH as usize;
        self.paddle = width / 2;
        self.ball = (WIDTH / 2.0, HEIGHT - 3.0);
        let vx = if self.rng.gen_bool(0.5) {
            BALL_SPEED
        } else {
            -BALL_SPEED
        };
        self.velocity = (vx, -BALL_SPEED);
        self.bricks = (2..6)
            .flat_map(|row| (1..width - 1).map(move |col| (col as f64, row as f64)))
            .collect();
        self.score = 0;
        self.state()
    }

    fn step(&mut self, action: usize) -> Step {
        let width = WIDTH as usize;
        match Paddle::from_repr(action) {
            Some(Paddle::Left) => self.paddle = self.paddle.saturating_sub(1).max(1),
            Some(Paddle::Stay) => {}
            Some(Paddle::Right) => self.paddle = (self.paddle + 1).min(width - 2),
            None => panic!("Invalid action: {}", action),
        }

        let (x, y) = &mut self.ball;
        let (vx, vy) = &mut self.velocity;
        *x += *vx;
        *y += *vy;

        if *x <= 0.0 || *x >= WIDTH - 1.0 {
            *vx = -*vx;
            *x = x.clamp(0.0, WIDTH - 1.0);
        }
        if *y <= 0.0 {
            *vy = -*vy;
            *y = 0.0;
        }

        let mut reward = self.rewards.step;
        let mut terminal = false;

        if *y >= HEIGHT - 2.0 && (*x - self.paddle as f64).abs() <= PADDLE_REACH {
            *vy = -vy.abs();
            *y = HEIGHT - 3.0;
            let jitter = Uniform::new(-0.1, 0.1).sample(&mut self.rng);
            *vx = (*vx + jitter).clamp(-1.0, 1.0);
        }

        if *y >= HEIGHT {
            reward = self.rewards.miss;
            terminal = true;
        }

        let (bx, by) = (*x, *y);
        let mut hits = 0;
        self.bricks.retain(|&(brick_x, brick_y)| {
            let dx = (bx - brick_x).abs();
            let dy = (by - brick_y).abs();
            if dx < BRICK_HALF_SIZE && dy < BRICK_HALF_SIZE {
                hits += 1;
                if dx > dy {
                    *vx = -*vx;
                } else {
                    *vy = -*vy;
                }
                false
            } else {
                true
            }
        });

        if hits > 0 {
            reward = self.rewards.brick;
            self.score += hits;
        }

        if self.bricks.is_empty() {
            reward = self.rewards.win;
            terminal = true;
        }

        let speed = vx.hypot(*vy);
        if speed > 0.0 {
            *vx = *vx / speed * BALL_SPEED;
            *vy = *vy / speed * BALL_SPEED;
        }

        Step {
            state: self.state(),
            reward,
            terminal,
        }
    }
}
