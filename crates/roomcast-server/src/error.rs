//! Server and HTTP API errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Failures starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or serving failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The metrics exporter could not be installed.
    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Token verification failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token was supplied.
    #[error("token required")]
    Missing,
    /// The token failed signature, algorithm or expiry checks.
    #[error("invalid or expired token")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// An HTTP error rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400.
    #[error("{0}")]
    BadRequest(String),
    /// 401.
    #[error(transparent)]
    Unauthorized(#[from] AuthError),
    /// 403.
    #[error("{0}")]
    Forbidden(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
