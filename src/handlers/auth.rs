//! Authentication HTTP handlers
//!
//! Endpoints for wallet-based authentication. Required fields arrive as
//! options so an absent field maps to a 400 rather than a deserialization
//! rejection.

use axum::{extract::State, http::StatusCode, Json};

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{
    ChallengeRequest, ChallengeResponse, UserResponse, VerifyRequest, VerifyResponse,
};
use crate::state::AppState;

fn required<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str, ApiError> {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ApiError::BadRequest(format!("{} is required", name))),
    }
}

/// POST /api/auth/challenge - Request a one-time challenge for a wallet
pub async fn request_challenge(
    State(state): State<AppState>,
    Json(req): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let wallet_address = required(&req.wallet_address, "walletAddress")?;

    let challenge = state.auth_service.issue_challenge(wallet_address).await?;

    Ok(Json(ChallengeResponse {
        success: true,
        challenge: challenge.value,
    }))
}

/// POST /api/auth/verify - Verify a signed challenge and issue a token
pub async fn verify_signature(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let wallet_address = required(&req.wallet_address, "walletAddress")?;
    let signature = required(&req.signature, "signature")?;
    let challenge = required(&req.challenge, "challenge")?;

    let issued = state
        .auth_service
        .verify_and_create_session(wallet_address, signature, challenge)
        .await?;

    Ok(Json(VerifyResponse {
        success: true,
        token: issued.token,
        expires_in: issued.expires_in_seconds.to_string(),
        user: issued.user.into(),
    }))
}

/// POST /api/auth/logout - Revoke the current session
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state.auth_service.logout(&user.wallet_address).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me - Get the current authenticated user
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth_service.current_user(&user.wallet_address).await?;
    Ok(Json(user.into()))
}
