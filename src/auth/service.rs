//! Authentication service
//!
//! Core business logic for wallet-based challenge/response authentication:
//! issuing one-time challenges, exchanging a signature proof for a bearer
//! token, and the two-layer token check behind authenticated requests.

use chrono::Duration;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{Challenge, Session, User};
use crate::store::{ChallengeStore, SessionStore, StoreError, UserDirectory};

use super::crypto::{decode_stellar_public_key, SignatureVerifier};
use super::jwt::{self, JwtError};

/// Prefix for issued challenge values
const CHALLENGE_PREFIX: &str = "DOB_VALIDATOR_AUTH";

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Challenge not found")]
    ChallengeNotFound,

    #[error("Challenge expired")]
    ChallengeExpired,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Session not found or revoked")]
    SessionRevoked,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Identity extracted from a verified bearer token plus its live session
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub user_id: Uuid,
    pub wallet_address: String,
}

/// Result of a successful verification
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_in_seconds: i64,
    pub user: User,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    challenges: Arc<dyn ChallengeStore>,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserDirectory>,
    verifier: Arc<dyn SignatureVerifier>,
    clock: Arc<dyn Clock>,
    jwt_secret: String,
    challenge_ttl_seconds: i64,
    session_ttl_days: i64,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
        verifier: Arc<dyn SignatureVerifier>,
        clock: Arc<dyn Clock>,
        jwt_secret: String,
        challenge_ttl_seconds: i64,
        session_ttl_days: i64,
    ) -> Self {
        Self {
            challenges,
            sessions,
            users,
            verifier,
            clock,
            jwt_secret,
            challenge_ttl_seconds,
            session_ttl_days,
        }
    }

    /// Issue a one-time challenge for a wallet address.
    ///
    /// Overwrites any prior unconsumed challenge for the same wallet
    /// (supersession, not accumulation). Always succeeds for a well-formed
    /// address regardless of prior state.
    pub async fn issue_challenge(&self, wallet_address: &str) -> Result<Challenge, AuthError> {
        let wallet_address = validate_wallet_address(wallet_address)?;

        let now = self.clock.now();
        let challenge = Challenge {
            wallet_address: wallet_address.to_string(),
            value: generate_challenge_value(now.timestamp()),
            issued_at: now,
            expires_at: now + Duration::seconds(self.challenge_ttl_seconds),
        };

        self.challenges.put(challenge.clone()).await?;

        tracing::debug!(wallet = %wallet_address, "Issued auth challenge");
        Ok(challenge)
    }

    /// Verify a signed challenge and issue a bearer token plus session.
    ///
    /// The challenge is consumed the moment the signature proves out, before
    /// any later step runs. A failure after that point reports a server
    /// error without resurrecting the challenge; the client has to request
    /// a fresh one.
    pub async fn verify_and_create_session(
        &self,
        wallet_address: &str,
        signature: &str,
        challenge_value: &str,
    ) -> Result<IssuedSession, AuthError> {
        let wallet_address = validate_wallet_address(wallet_address)?;
        if signature.trim().is_empty() {
            return Err(AuthError::InvalidInput("signature is required".to_string()));
        }
        if challenge_value.trim().is_empty() {
            return Err(AuthError::InvalidInput("challenge is required".to_string()));
        }

        // Challenges are looked up by wallet, not by value: a superseded
        // value fails here even though it was once issued.
        let stored = self
            .challenges
            .get(wallet_address)
            .await?
            .ok_or(AuthError::ChallengeNotFound)?;

        let now = self.clock.now();
        if stored.is_expired(now) {
            // Evict eagerly; expiry holds whether or not the sweep ran
            self.challenges
                .remove_if_value(wallet_address, &stored.value)
                .await?;
            return Err(AuthError::ChallengeExpired);
        }

        if stored.value != challenge_value {
            return Err(AuthError::ChallengeNotFound);
        }

        match self
            .verifier
            .verify(wallet_address, signature, challenge_value)
        {
            Ok(true) => {}
            Ok(false) => return Err(AuthError::InvalidSignature),
            Err(e) => {
                tracing::debug!(wallet = %wallet_address, error = %e, "Signature rejected");
                return Err(AuthError::InvalidSignature);
            }
        }

        // Single-use guarantee: compare-and-delete on the exact value. If a
        // concurrent verify or a new issue won the race, this loses.
        let consumed = self
            .challenges
            .remove_if_value(wallet_address, challenge_value)
            .await?;
        if !consumed {
            return Err(AuthError::ChallengeNotFound);
        }

        let user = self.users.find_or_create(wallet_address).await?;

        let ttl = Duration::days(self.session_ttl_days);
        let token = jwt::issue_token(&user, &self.jwt_secret, now, ttl)
            .map_err(|e| AuthError::TokenError(e.to_string()))?;

        // One active session per wallet: a new login evicts the previous one
        self.sessions
            .put(Session {
                wallet_address: wallet_address.to_string(),
                user_id: user.id,
                token_hash: hash_token(&token),
                issued_at: now,
                expires_at: now + ttl,
            })
            .await?;

        tracing::info!(wallet = %wallet_address, user_id = %user.id, "Wallet authenticated");

        Ok(IssuedSession {
            token,
            expires_in_seconds: ttl.num_seconds(),
            user,
        })
    }

    /// Two-layer bearer token check: the token must verify on its own
    /// (signature + expiry claim) and its wallet must still hold a session
    /// whose stored hash matches this exact token. Revoked or superseded
    /// sessions fail the second layer even while the token itself is valid.
    pub async fn authenticate_token(
        &self,
        token: &str,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let claims = jwt::verify_token(token, &self.jwt_secret).map_err(|e| match e {
            JwtError::TokenExpired => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })?;

        let user_id = jwt::user_id_from_claims(&claims).map_err(|_| AuthError::TokenInvalid)?;

        let session = self
            .sessions
            .get(&claims.wallet)
            .await?
            .ok_or(AuthError::SessionRevoked)?;

        if session.is_expired(self.clock.now()) {
            return Err(AuthError::SessionRevoked);
        }
        if session.token_hash != hash_token(token) {
            // A newer login replaced this session
            return Err(AuthError::SessionRevoked);
        }

        Ok(AuthenticatedIdentity {
            user_id,
            wallet_address: claims.wallet,
        })
    }

    /// Revoke the wallet's session (logout). Idempotent.
    pub async fn logout(&self, wallet_address: &str) -> Result<(), AuthError> {
        let removed = self.sessions.remove(wallet_address).await?;
        if removed {
            tracing::info!(wallet = %wallet_address, "Session revoked");
        }
        Ok(())
    }

    /// Resolve the user record for an authenticated wallet
    pub async fn current_user(&self, wallet_address: &str) -> Result<User, AuthError> {
        Ok(self.users.find_or_create(wallet_address).await?)
    }
}

fn validate_wallet_address(wallet_address: &str) -> Result<&str, AuthError> {
    let wallet_address = wallet_address.trim();
    if wallet_address.is_empty() {
        return Err(AuthError::InvalidInput(
            "wallet address is required".to_string(),
        ));
    }
    if wallet_address.len() != 56 || decode_stellar_public_key(wallet_address).is_err() {
        return Err(AuthError::InvalidInput(
            "invalid Stellar address format".to_string(),
        ));
    }
    Ok(wallet_address)
}

/// Challenge values carry a timestamp and 16 bytes of entropy; no
/// externally predictable structure beyond the prefix.
fn generate_challenge_value(unix_ts: i64) -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}_{}_{}", CHALLENGE_PREFIX, unix_ts, hex::encode(bytes))
}

/// Hash a token for storage; sessions never hold the raw bearer token
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::crypto::{encode_stellar_address, StellarSignatureVerifier};
    use crate::clock::ManualClock;
    use crate::store::{InMemoryChallengeStore, InMemorySessionStore, InMemoryUserDirectory};
    use base64::Engine;
    use chrono::Utc;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    struct Harness {
        service: AuthService,
        challenges: Arc<InMemoryChallengeStore>,
        clock: ManualClock,
        signing_key: SigningKey,
        wallet: String,
    }

    fn harness() -> Harness {
        let signing_key = SigningKey::generate(&mut OsRng);
        let wallet = encode_stellar_address(&signing_key.verifying_key().to_bytes());
        let clock = ManualClock::new(Utc::now());
        let challenges = Arc::new(InMemoryChallengeStore::new());

        let service = AuthService::new(
            challenges.clone(),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(StellarSignatureVerifier),
            Arc::new(clock.clone()),
            "test-secret".to_string(),
            300,
            7,
        );

        Harness {
            service,
            challenges,
            clock,
            signing_key,
            wallet,
        }
    }

    fn sign(key: &SigningKey, challenge: &str) -> String {
        let signature = key.sign(challenge.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(signature.to_bytes())
    }

    #[tokio::test]
    async fn test_challenge_value_shape() {
        let h = harness();
        let challenge = h.service.issue_challenge(&h.wallet).await.unwrap();
        assert!(challenge.value.starts_with("DOB_VALIDATOR_AUTH_"));
        assert_eq!(challenge.expires_at, challenge.issued_at + Duration::seconds(300));
    }

    #[tokio::test]
    async fn test_issue_challenge_rejects_bad_addresses() {
        let h = harness();
        assert!(matches!(
            h.service.issue_challenge("").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            h.service.issue_challenge("not-a-wallet").await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_full_flow_and_replay_rejected() {
        let h = harness();
        let challenge = h.service.issue_challenge(&h.wallet).await.unwrap();
        let signature = sign(&h.signing_key, &challenge.value);

        let issued = h
            .service
            .verify_and_create_session(&h.wallet, &signature, &challenge.value)
            .await
            .unwrap();

        assert_eq!(issued.user.wallet_address, h.wallet);
        assert_eq!(issued.expires_in_seconds, 7 * 24 * 3600);

        let claims = jwt::verify_token(&issued.token, "test-secret").unwrap();
        assert_eq!(claims.wallet, h.wallet);

        // Same challenge value a second time, identical signature: consumed
        let replay = h
            .service
            .verify_and_create_session(&h.wallet, &signature, &challenge.value)
            .await;
        assert!(matches!(replay, Err(AuthError::ChallengeNotFound)));
    }

    #[tokio::test]
    async fn test_second_issue_supersedes_first() {
        let h = harness();
        let first = h.service.issue_challenge(&h.wallet).await.unwrap();
        let _second = h.service.issue_challenge(&h.wallet).await.unwrap();

        let signature = sign(&h.signing_key, &first.value);
        let result = h
            .service
            .verify_and_create_session(&h.wallet, &signature, &first.value)
            .await;

        // Superseded, not a signature failure
        assert!(matches!(result, Err(AuthError::ChallengeNotFound)));
    }

    #[tokio::test]
    async fn test_expired_challenge_rejected_and_evicted() {
        let h = harness();
        let challenge = h.service.issue_challenge(&h.wallet).await.unwrap();
        let signature = sign(&h.signing_key, &challenge.value);

        // 5 minutes plus one second; no sweep has run
        h.clock.advance(Duration::seconds(301));

        let result = h
            .service
            .verify_and_create_session(&h.wallet, &signature, &challenge.value)
            .await;
        assert!(matches!(result, Err(AuthError::ChallengeExpired)));

        // Eagerly evicted on read
        assert!(h.challenges.get(&h.wallet).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bad_signature_leaves_challenge_intact() {
        let h = harness();
        let challenge = h.service.issue_challenge(&h.wallet).await.unwrap();

        let wrong_key = SigningKey::generate(&mut OsRng);
        let signature = sign(&wrong_key, &challenge.value);

        let result = h
            .service
            .verify_and_create_session(&h.wallet, &signature, &challenge.value)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));

        // Failure before signature success keeps the challenge usable
        assert!(h.challenges.get(&h.wallet).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_challenge() {
        let h = harness();
        let result = h
            .service
            .verify_and_create_session(&h.wallet, "c2ln", "DOB_VALIDATOR_AUTH_1_ff")
            .await;
        assert!(matches!(result, Err(AuthError::ChallengeNotFound)));
    }

    #[tokio::test]
    async fn test_logout_revokes_but_token_still_decodes() {
        let h = harness();
        let challenge = h.service.issue_challenge(&h.wallet).await.unwrap();
        let signature = sign(&h.signing_key, &challenge.value);
        let issued = h
            .service
            .verify_and_create_session(&h.wallet, &signature, &challenge.value)
            .await
            .unwrap();

        assert!(h.service.authenticate_token(&issued.token).await.is_ok());

        h.service.logout(&h.wallet).await.unwrap();

        // Layer (a) still passes: the token is structurally valid and unexpired
        assert!(jwt::verify_token(&issued.token, "test-secret").is_ok());
        // Layer (b) fails: the session is gone
        let result = h.service.authenticate_token(&issued.token).await;
        assert!(matches!(result, Err(AuthError::SessionRevoked)));
    }

    #[tokio::test]
    async fn test_new_login_supersedes_previous_session() {
        let h = harness();

        let first = h.service.issue_challenge(&h.wallet).await.unwrap();
        let old_session = h
            .service
            .verify_and_create_session(&h.wallet, &sign(&h.signing_key, &first.value), &first.value)
            .await
            .unwrap();

        // A later iat makes the second token distinct from the first
        h.clock.advance(Duration::seconds(1));

        let second = h.service.issue_challenge(&h.wallet).await.unwrap();
        let new_session = h
            .service
            .verify_and_create_session(
                &h.wallet,
                &sign(&h.signing_key, &second.value),
                &second.value,
            )
            .await
            .unwrap();

        assert!(h.service.authenticate_token(&new_session.token).await.is_ok());
        let result = h.service.authenticate_token(&old_session.token).await;
        assert!(matches!(result, Err(AuthError::SessionRevoked)));
    }
}
