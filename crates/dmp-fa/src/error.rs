//! Error types for function approximators.

use dmp_core::DmpError;
use thiserror::Error;

/// Errors raised while training or querying a function approximator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FaError {
    #[error("Function approximator used before training")]
    NotTrained,

    #[error("Shape mismatch: {what}")]
    ShapeMismatch { what: String },

    #[error("Invalid configuration: {what}")]
    InvalidConfig { what: String },

    #[error("Training failed: {what}")]
    ConvergenceFailure { what: String },
}

pub type FaResult<T> = Result<T, FaError>;

impl From<FaError> for DmpError {
    fn from(e: FaError) -> Self {
        match e {
            FaError::NotTrained => DmpError::InvalidState {
                what: "function approximator used before training".to_string(),
            },
            FaError::ShapeMismatch { what } => DmpError::InvalidState { what },
            FaError::InvalidConfig { what } => DmpError::InvalidParameter { what },
            FaError::ConvergenceFailure { what } => DmpError::ConvergenceFailure { what },
        }
    }
}
