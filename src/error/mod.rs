//! Centralized API error handling
//!
//! Unified error type for API responses with HTTP status mapping and JSON
//! error bodies. Validation failures on the auth endpoints collapse into one
//! generic message so the API does not leak whether a wallet is known, a
//! challenge existed, or a signature was wrong.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::store::StoreError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Internal server error")]
    InternalError(String),

    #[error("Service unavailable")]
    ServiceUnavailable(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to surface to the client. Server faults stay opaque;
    /// their detail goes to the logs only.
    fn client_message(&self) -> String {
        match self {
            ApiError::InternalError(_) => "Internal server error".to_string(),
            ApiError::ServiceUnavailable(_) => "Service temporarily unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        match &self {
            ApiError::InternalError(detail) | ApiError::ServiceUnavailable(detail) => {
                tracing::error!(detail = %detail, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %self, code = %error_code, "Client error occurred");
            }
        }

        let body = ErrorResponse {
            success: false,
            error: ErrorDetails {
                code: error_code.to_string(),
                message: self.client_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) => ApiError::BadRequest(msg),
            // One message for every 401 on the challenge flow: no account
            // enumeration through distinct failures
            AuthError::ChallengeNotFound
            | AuthError::ChallengeExpired
            | AuthError::InvalidSignature => {
                ApiError::Unauthorized("Invalid or expired challenge".to_string())
            }
            AuthError::TokenExpired | AuthError::TokenInvalid | AuthError::SessionRevoked => {
                ApiError::Unauthorized("Invalid or expired token".to_string())
            }
            AuthError::TokenError(detail) => ApiError::InternalError(detail),
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::ServiceUnavailable(err.to_string())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;
