//! Postgres store backends
//!
//! Externalized variants of the store traits for multi-instance deployments.
//! Atomicity comes from row-level predicates: compare-and-delete is a single
//! `DELETE ... WHERE wallet_address = $1 AND value = $2`.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE auth_challenges (
//!     wallet_address TEXT PRIMARY KEY,
//!     value          TEXT NOT NULL,
//!     issued_at      TIMESTAMPTZ NOT NULL,
//!     expires_at     TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE auth_sessions (
//!     wallet_address TEXT PRIMARY KEY,
//!     user_id        UUID NOT NULL,
//!     token_hash     TEXT NOT NULL,
//!     issued_at      TIMESTAMPTZ NOT NULL,
//!     expires_at     TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE users (
//!     id             UUID PRIMARY KEY,
//!     wallet_address TEXT NOT NULL UNIQUE,
//!     created_at     TIMESTAMPTZ NOT NULL
//! );
//! ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Challenge, Session, User};

use super::{ChallengeStore, SessionStore, StoreError, UserDirectory};

/// Postgres-backed challenge store
#[derive(Clone)]
pub struct PgChallengeStore {
    pool: PgPool,
}

impl PgChallengeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[axum::async_trait]
impl ChallengeStore for PgChallengeStore {
    async fn put(&self, challenge: Challenge) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO auth_challenges (wallet_address, value, issued_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (wallet_address)
            DO UPDATE SET value = $2, issued_at = $3, expires_at = $4
            "#,
        )
        .bind(&challenge.wallet_address)
        .bind(&challenge.value)
        .bind(challenge.issued_at)
        .bind(challenge.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, wallet_address: &str) -> Result<Option<Challenge>, StoreError> {
        let challenge: Option<Challenge> = sqlx::query_as(
            r#"
            SELECT wallet_address, value, issued_at, expires_at
            FROM auth_challenges
            WHERE wallet_address = $1
            "#,
        )
        .bind(wallet_address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(challenge)
    }

    async fn remove_if_value(
        &self,
        wallet_address: &str,
        value: &str,
    ) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM auth_challenges
            WHERE wallet_address = $1 AND value = $2
            "#,
        )
        .bind(wallet_address)
        .bind(value)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM auth_challenges WHERE expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }
}

/// Postgres-backed session store
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[axum::async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, session: Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO auth_sessions (wallet_address, user_id, token_hash, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (wallet_address)
            DO UPDATE SET user_id = $2, token_hash = $3, issued_at = $4, expires_at = $5
            "#,
        )
        .bind(&session.wallet_address)
        .bind(session.user_id)
        .bind(&session.token_hash)
        .bind(session.issued_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, wallet_address: &str) -> Result<Option<Session>, StoreError> {
        let session: Option<Session> = sqlx::query_as(
            r#"
            SELECT wallet_address, user_id, token_hash, issued_at, expires_at
            FROM auth_sessions
            WHERE wallet_address = $1
            "#,
        )
        .bind(wallet_address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn remove(&self, wallet_address: &str) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM auth_sessions WHERE wallet_address = $1
            "#,
        )
        .bind(wallet_address)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM auth_sessions WHERE expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }
}

/// Postgres-backed user directory
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[axum::async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_or_create(&self, wallet_address: &str) -> Result<User, StoreError> {
        if let Some(user) = self.find(wallet_address).await? {
            return Ok(user);
        }

        // Two instances may race here; ON CONFLICT keeps the insert quiet and
        // the follow-up select returns whichever row won.
        sqlx::query(
            r#"
            INSERT INTO users (id, wallet_address, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (wallet_address) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(wallet_address)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let user: User = sqlx::query_as(
            r#"
            SELECT id, wallet_address, created_at
            FROM users
            WHERE wallet_address = $1
            "#,
        )
        .bind(wallet_address)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find(&self, wallet_address: &str) -> Result<Option<User>, StoreError> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT id, wallet_address, created_at
            FROM users
            WHERE wallet_address = $1
            "#,
        )
        .bind(wallet_address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
