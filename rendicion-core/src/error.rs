use thiserror::Error;

use crate::wizard::ReportStep;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// User input failed a shape/range check. Recoverable: re-prompt.
    #[error("validation error: {0}")]
    Validation(String),

    /// A finalize attempt on a request that is not pending, or with missing mandatory fields.
    #[error("finalization error: {0}")]
    Finalization(String),

    #[error("no transition from {from:?} on {event}")]
    InvalidTransition { from: ReportStep, event: String },

    #[error("request not found: {0}")]
    NotFound(String),

    /// A scan result arrived after its scan view was closed.
    #[error("scan result is stale (ticket {0}) and was discarded")]
    StaleScan(u64),

    #[error("draft storage error: {0}")]
    Draft(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn finalization(msg: impl Into<String>) -> Self {
        CoreError::Finalization(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
