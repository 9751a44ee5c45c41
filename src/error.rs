//! Error types for the simulation engine and its collaborators

use thiserror::Error;

use crate::simulation::states::Snapshot;

/// Result type used throughout the library
pub type SimResult<T> = Result<T, SimError>;

/// Errors that can occur while setting up, running or persisting a simulation
#[derive(Error, Debug)]
pub enum SimError {
    /// Invalid setup detected before a run starts; the run never begins
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Non-finite input handed to the force model
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A step produced non-finite (or, in strict mode, out-of-bound) values.
    /// `last_valid` holds the positions after the last fully applied step
    #[error("numeric divergence at step {step}: {reason}")]
    NumericDivergence {
        step: usize,
        reason: String,
        last_valid: Box<Snapshot>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("scenario error: {0}")]
    Scenario(#[from] serde_yaml::Error),
}

impl From<zip::result::ZipError> for SimError {
    fn from(err: zip::result::ZipError) -> Self {
        SimError::Archive(err.to_string())
    }
}
