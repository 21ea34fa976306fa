use thiserror::Error;

/// Errors raised by agents, environments and sessions
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("{algorithm} requires an environment with a transition model")]
    ModelRequired { algorithm: &'static str },

    #[error("environment dimensions do not match the agent: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("{algorithm} is a prediction-only agent and has no policy")]
    NoPolicy { algorithm: &'static str },

    #[error("invalid value for `{name}`: {value} is not in the interval [{min}, {max}]")]
    OutOfInterval {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("`vi - vf` must have same sign as `rate`")]
    InvalidDecay,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;
