use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T, E = BatchError> = std::result::Result<T, E>;

/// Input field rejected before a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationField {
    Url,
    Count,
}

impl fmt::Display for ValidationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationField::Url => f.write_str("url"),
            ValidationField::Count => f.write_str("count"),
        }
    }
}

/// Unified error type covering the failure kinds of a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: ValidationField,
        message: String,
    },
    #[error("malformed report: {0}")]
    MalformedReport(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("no iteration produced usable results")]
    AggregationEmpty,
    #[error("orchestration fault: {0}")]
    OrchestrationFault(String),
    #[error("a batch run is already in progress")]
    AlreadyRunning,
    #[error("cannot reset while a batch run is in progress")]
    ResetWhileRunning,
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BatchError {
    pub fn validation(field: ValidationField, message: impl Into<String>) -> Self {
        BatchError::Validation {
            field,
            message: message.into(),
        }
    }

    /// True for failures that stay inside a single iteration.
    pub fn is_per_iteration(&self) -> bool {
        matches!(
            self,
            BatchError::MalformedReport(_) | BatchError::Transport(_)
        )
    }

    /// Human-readable cause without the variant prefix.
    pub fn cause(&self) -> String {
        match self {
            BatchError::MalformedReport(msg)
            | BatchError::Transport(msg)
            | BatchError::OrchestrationFault(msg)
            | BatchError::Configuration(msg)
            | BatchError::Ops(msg) => msg.clone(),
            BatchError::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
