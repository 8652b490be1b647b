//! Authentication middleware
//!
//! Extractor that verifies the bearer token from the Authorization header.
//! Both layers run here: the stateless JWT check and the session membership
//! check, so a revoked or superseded session fails even while its token is
//! still cryptographically valid.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AuthError as ServiceAuthError, AuthService};

/// Authenticated user extracted from a verified bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub wallet_address: String,
}

/// Error response for authentication failures
#[derive(Debug, Serialize)]
struct AuthRejection {
    success: bool,
    error: AuthRejectionDetails,
}

#[derive(Debug, Serialize)]
struct AuthRejectionDetails {
    code: String,
    message: String,
}

impl AuthRejection {
    fn new(code: &str, message: &str) -> Self {
        Self {
            success: false,
            error: AuthRejectionDetails {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AuthRejection::new(
                        "MISSING_TOKEN",
                        "Authorization header with Bearer token required",
                    )
                    .into_response()
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let identity = match auth_service.authenticate_token(bearer.token()).await {
            Ok(identity) => identity,
            // Store faults are retryable server errors, not a bad credential
            Err(ServiceAuthError::Store(e)) => {
                return Err(crate::error::ApiError::from(e).into_response());
            }
            Err(e) => {
                let (code, message) = match e {
                    ServiceAuthError::TokenExpired => ("TOKEN_EXPIRED", "Token has expired"),
                    ServiceAuthError::SessionRevoked => {
                        ("SESSION_REVOKED", "Session has been revoked")
                    }
                    _ => ("INVALID_TOKEN", "Invalid token"),
                };
                return Err(AuthRejection::new(code, message).into_response());
            }
        };

        Ok(AuthenticatedUser {
            user_id: identity.user_id,
            wallet_address: identity.wallet_address,
        })
    }
}
