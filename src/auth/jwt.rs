//! JWT token issuance and validation
//!
//! The bearer token is the stateless half of session verification: claims
//! are a fixed struct with exactly the documented fields, and expiry lives
//! in the signed payload. The stateful half (session membership) is checked
//! by the auth service on top of this.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::User;

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// JWT claims for bearer tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Wallet address the token was issued for
    pub wallet: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Generate a bearer token for an authenticated user
pub fn issue_token(
    user: &User,
    secret: &str,
    issued_at: DateTime<Utc>,
    ttl: Duration,
) -> Result<String, JwtError> {
    let claims = Claims {
        sub: user.id.to_string(),
        wallet: user.wallet_address.clone(),
        iat: issued_at.timestamp(),
        exp: (issued_at + ttl).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

/// Verify and decode a bearer token (signature + expiry claim)
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        _ => JwtError::InvalidToken(e.to_string()),
    })?;

    Ok(token_data.claims)
}

/// Extract the user ID from claims
pub fn user_id_from_claims(claims: &Claims) -> Result<Uuid, JwtError> {
    Uuid::parse_str(&claims.sub).map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_user() -> User {
        User {
            id: Uuid::new_v4(),
            wallet_address: "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7"
                .to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify_token() {
        let user = create_test_user();
        let secret = "test-secret-key";

        let token = issue_token(&user, secret, Utc::now(), Duration::days(7)).unwrap();
        assert!(!token.is_empty());

        let claims = verify_token(&token, secret).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.wallet, user.wallet_address);
        assert!(claims.exp > claims.iat);
        assert_eq!(user_id_from_claims(&claims).unwrap(), user.id);
    }

    #[test]
    fn test_expired_token_rejected() {
        let user = create_test_user();
        let secret = "test-secret-key";

        // Issued in the past with a short lifetime; exp is beyond the default
        // clock skew leeway
        let issued = Utc::now() - Duration::hours(2);
        let token = issue_token(&user, secret, issued, Duration::minutes(5)).unwrap();

        let result = verify_token(&token, secret);
        assert!(matches!(result, Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_invalid_token() {
        let result = verify_token("invalid.token.here", "test-secret-key");
        assert!(matches!(result, Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn test_wrong_secret() {
        let user = create_test_user();
        let token = issue_token(&user, "secret1", Utc::now(), Duration::days(7)).unwrap();
        assert!(verify_token(&token, "secret2").is_err());
    }
}
