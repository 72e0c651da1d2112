//! Error taxonomy (§7). Tool and retrieval failures are absorbed into
//! values elsewhere and never reach this type; `CoreError` is reserved for
//! the transport-fatal cases that surface to the caller as an error event.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("classification failed: {0}")]
    Classification(String),

    #[error("provider error: {message}")]
    Provider { retryable: bool, message: String },

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// Stable code for the user-visible failure event (§7).
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::Classification(_) => "internal",
            CoreError::Provider { retryable, .. } => {
                if *retryable {
                    "rate_limited"
                } else {
                    "provider_error"
                }
            }
            CoreError::Persistence(_) => "internal",
            CoreError::Internal(_) => "internal",
        }
    }

    /// Short human message suitable for a retryable notice in the frontend.
    pub fn human_message(&self) -> String {
        match self {
            CoreError::Provider { retryable: true, .. } => {
                "The assistant is busy right now. Please try again in a moment.".to_string()
            }
            CoreError::Provider { retryable: false, .. } => {
                "The assistant couldn't complete that request.".to_string()
            }
            CoreError::Validation(msg) => msg.clone(),
            _ => "Something went wrong processing your message.".to_string(),
        }
    }
}
