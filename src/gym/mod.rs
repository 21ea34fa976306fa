//! Toy environments with finite, discretized state spaces

pub mod breakout;
pub mod cart_pole;
pub mod frozen_lake;
pub mod grid;
pub mod grid_world;
pub mod mountain_car;

pub use breakout::Breakout;
pub use cart_pole::CartPole;
pub use frozen_lake::FrozenLake;
pub use grid_world::GridWorld;
pub use mountain_car::MountainCar;

/// Index of the bin that `value` falls into when `[min, max]` is split into `bins` equal parts
///
/// Values outside the range are clamped to the outermost bins, non-finite values are read as 0.
pub(crate) fn bin(value: f64, min: f64, max: f64, bins: usize) -> usize {
    let value = crate::util::finite_or_zero(value).clamp(min, max);
    let index = ((value - min) / (max - min) * bins as f64).floor() as usize;
    index.min(bins - 1)
}
