//! Error types for the ML service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input; never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A dependency is not loaded or not reachable
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Language model failed after retrieval succeeded
    #[error("Generation failed: {0}")]
    Generation(String),

    /// An external call exceeded its deadline
    #[error("Dependency timed out: {0}")]
    DependencyTimeout(String),

    /// Embedding provider error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorDb(String),

    /// Relational storage error
    #[error("Storage error: {0}")]
    Database(String),

    /// Regression model artifact error
    #[error("Model error: {0}")]
    Model(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-ready error
    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::NotReady(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error is a timeout and may be retried
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::DependencyTimeout(_) => true,
            Error::Http(err) => err.is_timeout(),
            _ => false,
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::NotReady(_) => "not_ready",
            Error::Generation(_) => "generation_error",
            Error::DependencyTimeout(_) => "dependency_timeout",
            Error::Embedding(_) => "embedding_error",
            Error::VectorDb(_) => "vector_index_error",
            Error::Database(_) => "storage_error",
            Error::Model(_) => "model_error",
            Error::Config(_) => "config_error",
            Error::Io(_) | Error::Json(_) | Error::Http(_) | Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Generation(_) | Error::Embedding(_) => StatusCode::BAD_GATEWAY,
            Error::DependencyTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::VectorDb(_)
            | Error::Database(_)
            | Error::Model(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::Http(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("Task join error: {}", err))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        // Internal details stay in the log, not in the response body
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Request failed ({}): {}", kind, self);
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": {
                "kind": kind,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(Error::validation("x").kind(), "validation_error");
        assert_eq!(Error::not_ready("x").kind(), "not_ready");
        assert_eq!(Error::generation("x").kind(), "generation_error");
        assert_eq!(Error::DependencyTimeout("x".into()).kind(), "dependency_timeout");
        assert_eq!(Error::internal("x").kind(), "internal_error");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::not_ready("x").status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(Error::generation("x").status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            Error::DependencyTimeout("x".into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_only_timeouts_retry() {
        assert!(Error::DependencyTimeout("slow".into()).is_timeout());
        assert!(!Error::validation("bad").is_timeout());
        assert!(!Error::embedding("down").is_timeout());
    }
}
