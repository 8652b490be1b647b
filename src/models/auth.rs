//! Authentication models for the DOB Validator backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outstanding authentication challenge, at most one per wallet address.
/// A new challenge for the same wallet supersedes any prior one.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Challenge {
    pub wallet_address: String,
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Active session backing a bearer token, at most one per wallet address.
/// Holds a SHA-256 hash of the token, never the raw token.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Session {
    pub wallet_address: String,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// ============================================================================
// Request/Response DTOs (camelCase per the wire contract)
// ============================================================================

/// Request for an authentication challenge
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    pub wallet_address: Option<String>,
}

/// Response containing the authentication challenge
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub success: bool,
    pub challenge: String,
}

/// Request to verify a signed challenge
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub wallet_address: Option<String>,
    pub signature: Option<String>,
    pub challenge: Option<String>,
}

/// Response with the issued bearer token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub token: String,
    /// Token lifetime in seconds, serialized as a string
    pub expires_in: String,
    pub user: UserResponse,
}

/// User response (sanitized for API)
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
}
