//! Expiry sweep for challenge and session stores
//!
//! A background task that evicts expired entries on a fixed interval, once
//! immediately at startup and then hourly by default. Expiry is also checked
//! on read, so the sweep only reclaims memory; nothing depends on it for
//! correctness.

use std::sync::Arc;
use tokio::sync::watch;

use crate::clock::Clock;
use crate::store::{ChallengeStore, SessionStore, StoreError};

/// Counts removed by one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub challenges_removed: u64,
    pub sessions_removed: u64,
}

/// Periodic store sweeper
pub struct CleanupScheduler {
    challenges: Arc<dyn ChallengeStore>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    interval: std::time::Duration,
}

impl CleanupScheduler {
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            challenges,
            sessions,
            clock,
            interval,
        }
    }

    /// Run one sweep over both stores
    pub async fn sweep(&self) -> Result<SweepStats, StoreError> {
        let now = self.clock.now();
        let challenges_removed = self.challenges.purge_expired(now).await?;
        let sessions_removed = self.sessions.purge_expired(now).await?;
        Ok(SweepStats {
            challenges_removed,
            sessions_removed,
        })
    }

    /// Sweep on the configured interval until the shutdown channel fires.
    /// The first tick completes immediately, so one sweep runs at startup.
    /// A failed sweep is logged and the next scheduled run retries.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        tracing::info!(interval_secs = self.interval.as_secs(), "Cleanup scheduler started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.sweep().await {
                        Ok(stats) => {
                            if stats.challenges_removed > 0 || stats.sessions_removed > 0 {
                                tracing::info!(
                                    challenges = stats.challenges_removed,
                                    sessions = stats.sessions_removed,
                                    "Swept expired auth entries"
                                );
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Expiry sweep failed, will retry");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Cleanup scheduler stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Challenge, Session};
    use crate::store::{InMemoryChallengeStore, InMemorySessionStore};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn scheduler(
        clock: ManualClock,
    ) -> (CleanupScheduler, Arc<InMemoryChallengeStore>, Arc<InMemorySessionStore>) {
        let challenges = Arc::new(InMemoryChallengeStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let scheduler = CleanupScheduler::new(
            challenges.clone(),
            sessions.clone(),
            Arc::new(clock),
            std::time::Duration::from_secs(3600),
        );
        (scheduler, challenges, sessions)
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_entries() {
        let now = Utc::now();
        let clock = ManualClock::new(now);
        let (scheduler, challenges, sessions) = scheduler(clock.clone());

        use crate::store::{ChallengeStore, SessionStore};
        challenges
            .put(Challenge {
                wallet_address: "GAAA".to_string(),
                value: "live".to_string(),
                issued_at: now,
                expires_at: now + Duration::minutes(5),
            })
            .await
            .unwrap();
        challenges
            .put(Challenge {
                wallet_address: "GBBB".to_string(),
                value: "dead".to_string(),
                issued_at: now - Duration::minutes(10),
                expires_at: now - Duration::minutes(5),
            })
            .await
            .unwrap();
        sessions
            .put(Session {
                wallet_address: "GCCC".to_string(),
                user_id: Uuid::new_v4(),
                token_hash: "hash".to_string(),
                issued_at: now - Duration::days(8),
                expires_at: now - Duration::days(1),
            })
            .await
            .unwrap();

        let stats = scheduler.sweep().await.unwrap();
        assert_eq!(stats.challenges_removed, 1);
        assert_eq!(stats.sessions_removed, 1);
        assert!(challenges.get("GAAA").await.unwrap().is_some());
        assert!(challenges.get("GBBB").await.unwrap().is_none());
        assert!(sessions.get("GCCC").await.unwrap().is_none());

        // Sweeping again right away is a no-op
        let stats = scheduler.sweep().await.unwrap();
        assert_eq!(stats.challenges_removed, 0);
        assert_eq!(stats.sessions_removed, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let clock = ManualClock::new(Utc::now());
        let (scheduler, _, _) = scheduler(clock);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(rx));

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
