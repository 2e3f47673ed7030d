//! Error types for StockScope services.

use thiserror::Error;

/// Result type alias using the StockScope error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for StockScope services.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A data file exists but could not be read or parsed
    #[error("Failed to read {path}: {message}")]
    DataRead { path: String, message: String },

    /// External service error (market data provider)
    #[error("External service error: {0}")]
    External(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this is a validation error.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidInput(_) => 400,
            Self::External(_) => 502,
            _ => 500,
        }
    }
}

#[cfg(feature = "axum")]
mod response {
    use super::Error;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};

    impl IntoResponse for Error {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

            if status.is_server_error() {
                tracing::error!(status = status.as_u16(), error = %self, "Request failed");
            } else {
                tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
            }

            let body = serde_json::json!({ "error": self.to_string() });
            (status, axum::Json(body)).into_response()
        }
    }
}
