use dmp_core::DmpError;
use thiserror::Error;

pub type BboResult<T> = Result<T, BboError>;

/// Errors from the optimization loop and its collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BboError {
    #[error(transparent)]
    Dmp(#[from] DmpError),

    /// Raised by a task or task solver while producing or scoring a rollout.
    #[error("Task failed: {message}")]
    Task { message: String },

    #[error("Distribution update failed: {what}")]
    Updater { what: String },

    #[error("Configuration error: {what}")]
    Config { what: String },
}

impl BboError {
    pub fn task(message: impl Into<String>) -> Self {
        BboError::Task {
            message: message.into(),
        }
    }

    pub fn updater(what: impl Into<String>) -> Self {
        BboError::Updater { what: what.into() }
    }
}
