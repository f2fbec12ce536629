// SPDX-License-Identifier: MIT

//! Typed error handling for lattice-rs
//!
//! One application-level error enum; handlers convert it to an HTTP
//! response, everything below the handlers propagates it with `?`.
//! Resolver failures never appear here: they are encoded inline as marker
//! values in the resolved tree.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::docstore::StoreError;

/// Top-level error type for lattice-rs
#[derive(Debug, Error)]
pub enum LatticeError {
    /// Missing or malformed identifiers on input; reported before any store
    /// mutation is attempted.
    #[error("validation error: {0}")]
    Validation(String),

    /// A directly requested document does not exist.
    #[error("document not found: {path}")]
    NotFound { path: String },

    /// The store failed mid-operation. Partial application is possible and
    /// must be visible, so this is never swallowed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An external service answered with a non-success status.
    #[error("upstream error from {service}: {message}")]
    Upstream { service: String, message: String },

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors (seed files)
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

impl LatticeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }
}

impl From<&str> for LatticeError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for LatticeError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl IntoResponse for LatticeError {
    fn into_response(self) -> Response {
        let status = match &self {
            LatticeError::Validation(_) => StatusCode::BAD_REQUEST,
            LatticeError::NotFound { .. } => StatusCode::NOT_FOUND,
            LatticeError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts() {
        let err: LatticeError = StoreError::transport("socket closed").into();
        assert!(matches!(err, LatticeError::Store(_)));
        assert!(err.to_string().contains("socket closed"));
    }

    #[test]
    fn test_not_found_message_carries_path() {
        let err = LatticeError::not_found("workflows/w1");
        assert_eq!(err.to_string(), "document not found: workflows/w1");
    }
}
