//! Engine error types
//!
//! Defines all errors that can occur while talking to the columnar store.

use thiserror::Error;

/// Errors raised by a [`QueryEngine`](crate::engine::QueryEngine)
#[derive(Error, Debug)]
pub enum EngineError {
    /// Could not reach the engine at all
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    /// Transport-level failure (TLS, redirect, body encoding, ...)
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The engine answered with a non-success status
    #[error("Engine error {status}: {message}")]
    Server { status: u16, message: String },

    /// Reading the result stream failed part way through
    #[error("Result stream error: {0}")]
    Stream(String),

    /// The statement could not be bound to its arguments
    #[error("Bind error: {0}")]
    Bind(String),

    /// A scripted fake had no response for the statement
    #[error("No response scripted for statement: {0}")]
    Unscripted(String),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::Server {
            status: 404,
            message: "Code: 60. Table default.nope does not exist".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Engine error 404: Code: 60. Table default.nope does not exist"
        );

        let err = EngineError::Stream("unexpected end of body".to_string());
        assert_eq!(err.to_string(), "Result stream error: unexpected end of body");
    }
}
