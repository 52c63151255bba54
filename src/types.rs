//! Shared error and result types.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MlangoError>;

/// Error type covering the request pipeline, stores and external services.
///
/// Handler-level application failures (bad PIN, unknown recipient, rejected
/// amount) are not errors: handlers convert them into flag transitions so the
/// menu can branch. Everything that reaches this type aborts the request.
#[derive(Debug, Error)]
pub enum MlangoError {
    /// The transport saw a request of the wrong shape.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No session id in the transport metadata.
    #[error("session id missing")]
    SessionMissing,

    /// Input violates shape-level constraints before it reaches the engine.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Storage backend get/put failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// A slot resolved to a backend of an unexpected kind.
    #[error("engine type error: {0}")]
    EngineType(String),

    /// Menu engine failed to initialize.
    #[error("engine init failed: {0}")]
    EngineInit(String),

    /// Menu engine failed during execution.
    #[error("engine exec failed: {0}")]
    EngineExec(String),

    /// Custodial or data API returned a non-2xx envelope.
    #[error("external service error: {message}")]
    External {
        message: String,
        error_code: Option<String>,
    },

    /// Format-level validation failure (PIN, phone, amount).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The caller's context was cancelled mid-request.
    #[error("request cancelled")]
    Cancelled,

    /// Bad startup configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MlangoError {
    /// HTTP status the transport should answer with when this error
    /// escapes the pipeline.
    pub fn http_status(&self) -> u16 {
        match self {
            MlangoError::InvalidRequest(_)
            | MlangoError::SessionMissing
            | MlangoError::InvalidInput(_)
            | MlangoError::Validation(_) => 400,
            _ => 500,
        }
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        MlangoError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(MlangoError::SessionMissing.http_status(), 400);
        assert_eq!(MlangoError::InvalidRequest("x".into()).http_status(), 400);
        assert_eq!(MlangoError::Storage("x".into()).http_status(), 500);
        assert_eq!(MlangoError::EngineExec("x".into()).http_status(), 500);
        assert_eq!(
            MlangoError::External {
                message: "x".into(),
                error_code: None
            }
            .http_status(),
            500
        );
    }
}
