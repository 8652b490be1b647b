//! Store abstractions for challenges, sessions, and users
//!
//! The auth service only talks to these traits. The in-memory backend covers
//! single-instance deployments and tests; the Postgres backend externalizes
//! the same state so challenges and sessions are visible across instances.
//!
//! Consumption of a challenge goes through `remove_if_value`, a
//! compare-and-delete keyed by the exact challenge value. This is what keeps
//! a verify racing against a supersession or an expiry sweep from succeeding
//! on stale data.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Challenge, Session, User};

mod memory;
mod postgres;

pub use memory::{InMemoryChallengeStore, InMemorySessionStore, InMemoryUserDirectory};
pub use postgres::{PgChallengeStore, PgSessionStore, PgUserDirectory};

/// Store errors. All of these are server-side faults; validation failures
/// are expressed at the auth-service layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Keyed store of outstanding authentication challenges, one per wallet
#[axum::async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Insert or overwrite the challenge for its wallet address
    async fn put(&self, challenge: Challenge) -> Result<(), StoreError>;

    /// Fetch the live challenge for a wallet, if any
    async fn get(&self, wallet_address: &str) -> Result<Option<Challenge>, StoreError>;

    /// Atomically delete the challenge for a wallet only if its stored value
    /// matches `value`. Returns whether a row was removed.
    async fn remove_if_value(&self, wallet_address: &str, value: &str)
        -> Result<bool, StoreError>;

    /// Evict every challenge with `expires_at <= now`; returns the count
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Keyed store of issued sessions, one per wallet
#[axum::async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or overwrite the session for its wallet address
    async fn put(&self, session: Session) -> Result<(), StoreError>;

    /// Fetch the session for a wallet, if any
    async fn get(&self, wallet_address: &str) -> Result<Option<Session>, StoreError>;

    /// Delete the session for a wallet (logout); returns whether one existed
    async fn remove(&self, wallet_address: &str) -> Result<bool, StoreError>;

    /// Evict every session with `expires_at <= now`; returns the count
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// External user identity capability. The auth subsystem only reads and
/// lazily creates users through this boundary.
#[axum::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch the user for a wallet address, creating one on first sight
    async fn find_or_create(&self, wallet_address: &str) -> Result<User, StoreError>;

    /// Fetch the user for a wallet address, if one exists
    async fn find(&self, wallet_address: &str) -> Result<Option<User>, StoreError>;
}
