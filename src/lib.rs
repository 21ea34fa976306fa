/// Implemented RL algorithms
pub mod algo;

/// Serializable session configuration
pub mod config;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Data structures
pub mod ds;

/// Environment
pub mod env;

/// Error type
pub mod error;

/// Exploration policies
pub mod exploration;

/// Testing environments
pub mod gym;

/// Episode traces
pub mod memory;

/// Driver-facing session
pub mod session;

mod util;

pub use error::{Error, Result};
pub use session::{Session, Snapshot};
pub use util::TIE_TOLERANCE;
