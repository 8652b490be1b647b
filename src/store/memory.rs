//! In-memory store backends
//!
//! Each store is a `HashMap` behind a single `tokio::sync::RwLock`, which
//! serializes mutations per store and makes compare-and-delete atomic.
//! Suitable for single-instance deployments and tests.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Challenge, Session, User};

use super::{ChallengeStore, SessionStore, StoreError, UserDirectory};

/// In-memory challenge store
#[derive(Clone, Default)]
pub struct InMemoryChallengeStore {
    entries: Arc<RwLock<HashMap<String, Challenge>>>,
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[axum::async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn put(&self, challenge: Challenge) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(challenge.wallet_address.clone(), challenge);
        Ok(())
    }

    async fn get(&self, wallet_address: &str) -> Result<Option<Challenge>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(wallet_address).cloned())
    }

    async fn remove_if_value(
        &self,
        wallet_address: &str,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        match entries.get(wallet_address) {
            Some(existing) if existing.value == value => {
                entries.remove(wallet_address);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, challenge| !challenge.is_expired(now));
        Ok((before - entries.len()) as u64)
    }
}

/// In-memory session store
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[axum::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: Session) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(session.wallet_address.clone(), session);
        Ok(())
    }

    async fn get(&self, wallet_address: &str) -> Result<Option<Session>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(wallet_address).cloned())
    }

    async fn remove(&self, wallet_address: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(wallet_address).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, session| !session.is_expired(now));
        Ok((before - entries.len()) as u64)
    }
}

/// In-memory user directory
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[axum::async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_or_create(&self, wallet_address: &str) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get(wallet_address) {
            return Ok(user.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            wallet_address: wallet_address.to_string(),
            created_at: Utc::now(),
        };
        users.insert(wallet_address.to_string(), user.clone());
        Ok(user)
    }

    async fn find(&self, wallet_address: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(wallet_address).cloned())
    }
}
