use thiserror::Error;

pub type DmpResult<T> = Result<T, DmpError>;

/// Error taxonomy shared by the dynamical systems, the DMP and the optimizer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DmpError {
    /// A state vector or matrix had the wrong length or shape.
    #[error("Invalid state: {what}")]
    InvalidState { what: String },

    /// A parameter violated its documented domain (tau <= 0, non-PSD covariance, ...).
    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: String },

    /// A function approximator could not be fitted.
    #[error("Convergence failed: {what}")]
    ConvergenceFailure { what: String },

    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}

impl DmpError {
    pub fn invalid_state(what: impl Into<String>) -> Self {
        DmpError::InvalidState { what: what.into() }
    }

    pub fn invalid_parameter(what: impl Into<String>) -> Self {
        DmpError::InvalidParameter { what: what.into() }
    }
}
