//! Explore error types
//!
//! Defines the error conditions surfaced by schema discovery, query building
//! and execution. Per-row decode failures are not here: they are logged and
//! the row is dropped (see [`DecodeError`](crate::explore::DecodeError)).

use thiserror::Error;

use crate::engine::EngineError;

/// Errors that can occur during explore operations
#[derive(Error, Debug)]
pub enum ExploreError {
    /// The request is invalid; always reported to the caller
    #[error("Validation error: {0}")]
    Validation(String),

    /// The engine call failed, including failures reading its result stream
    #[error("Execution error: {0}")]
    Execution(#[from] EngineError),
}

impl ExploreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type for explore operations
pub type ExploreResult<T> = Result<T, ExploreError>;
