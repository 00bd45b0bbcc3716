//! # Error Handling
//!
//! Defines the application error taxonomy and how each variant is converted
//! to an HTTP response.
//!
//! ## Error Categories:
//! - **Validation**: Client sent a bad upload or malformed parameters (400)
//! - **Unauthorized**: Missing or invalid bearer token (401)
//! - **NotFound**: Requested record doesn't exist (404)
//! - **RateLimited**: Client exceeded the request budget (429)
//! - **Upstream**: The external transcription service failed (502)
//! - **Database / Config / Internal**: Server-side problems (500)
//!
//! ## JSON Response Format:
//! All errors return JSON with a consistent structure:
//! ```json
//! {
//!   "error": {
//!     "type": "validation_error",
//!     "message": "only audio files (mp3, wav, m4a, ogg) are allowed",
//!     "timestamp": "2025-01-01T12:00:00Z"
//!   }
//! }
//! ```

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Application-level error type shared by all components.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client sent invalid or malformed data (bad upload type/size, bad query param)
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or invalid bearer token
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Requested record was not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Client exceeded the rate limit
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The external transcription service failed or was unreachable
    #[error("upstream transcription error: {0}")]
    Upstream(String),

    /// SQLite query or connection failure
    #[error("database error: {0}")]
    Database(String),

    /// Configuration file or environment variable problems
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything else that went wrong server-side
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable error type used in the JSON response body.
    fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::RateLimited(_) => "rate_limited",
            AppError::Upstream(_) => "upstream_error",
            AppError::Database(_) => "database_error",
            AppError::Config(_) => "config_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::RateLimited(msg)
            | AppError::Upstream(msg)
            | AppError::Database(msg)
            | AppError::Config(msg)
            | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.message(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Upstream failures almost always surface as reqwest errors (connect,
/// timeout, body decode), so they map to the 502 variant.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Upstream("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::RateLimited("x".into()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::Database("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_body_has_expected_shape() {
        let resp = AppError::Validation("bad file".into()).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
