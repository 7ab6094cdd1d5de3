//! Suspicion scoring and the ban state machine.
//!
//! Every report appends to the player's cheat log and bumps the cumulative
//! score; crossing the threshold converts the record to a permanent ban in
//! the same write. Temporary bans self-clear: the first status check past
//! the expiry persists the cleared record before answering.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::store::{PlayerLocks, StoreError, TrustStore};
use crate::trust::CheatLogEntry;

/// Reason written when the score threshold trips an automatic ban.
pub const AUTO_BAN_REASON: &str = "Multiple cheating violations detected";

/// Escalation policy.
#[derive(Debug, Clone)]
pub struct TrustPolicy {
    /// Suspicious events before a permanent ban.
    pub auto_ban_threshold: u32,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            auto_ban_threshold: 5,
        }
    }
}

/// Result of reporting a suspicious activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuspicionOutcome {
    /// Logged and counted; the player stays unbanned.
    Logged { cheat_score: u32 },
    /// The report tripped the threshold; the player is now permanently
    /// banned.
    Banned { reason: String },
}

/// Current ban status as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanStatus {
    pub banned: bool,
    pub reason: String,
    /// Expiry of a temporary ban; None = no expiry (unbanned, or permanent).
    pub expiry: Option<DateTime<Utc>>,
}

/// Owns all reads and writes of the ban-related record fields.
pub struct TrustLedger {
    store: Arc<dyn TrustStore>,
    clock: Arc<dyn Clock>,
    locks: Arc<PlayerLocks>,
    policy: TrustPolicy,
}

impl TrustLedger {
    pub fn new(
        store: Arc<dyn TrustStore>,
        clock: Arc<dyn Clock>,
        locks: Arc<PlayerLocks>,
        policy: TrustPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            locks,
            policy,
        }
    }

    /// Records a suspicious activity and escalates when the threshold is
    /// reached.
    pub async fn report_suspicious(
        &self,
        player_id: &str,
        activity_type: &str,
    ) -> Result<SuspicionOutcome, StoreError> {
        let _guard = self.locks.acquire(player_id).await;

        let now = self.clock.now();
        let mut record = self.store.load(player_id).await?;

        record.cheat_log.push(CheatLogEntry {
            activity_type: activity_type.to_string(),
            timestamp: now,
        });
        record.cheat_score += 1;

        if record.cheat_score >= self.policy.auto_ban_threshold {
            record.banned = true;
            record.ban_reason = AUTO_BAN_REASON.to_string();
            record.ban_expiry = None;
            self.store.save(player_id, &record).await?;

            warn!(
                player_id = %player_id,
                cheat_score = record.cheat_score,
                activity_type = %activity_type,
                "player auto-banned for repeated cheating violations"
            );
            return Ok(SuspicionOutcome::Banned {
                reason: AUTO_BAN_REASON.to_string(),
            });
        }

        self.store.save(player_id, &record).await?;
        info!(
            player_id = %player_id,
            cheat_score = record.cheat_score,
            activity_type = %activity_type,
            "suspicious activity logged"
        );
        Ok(SuspicionOutcome::Logged {
            cheat_score: record.cheat_score,
        })
    }

    /// Reports the player's ban status, clearing a temporary ban whose
    /// expiry has passed.
    ///
    /// On the clearing call the stored record is reset but the answer still
    /// carries the expired reason and expiry, matching the behavior live
    /// clients already depend on. The cheat score and log are not touched.
    pub async fn check_ban_status(&self, player_id: &str) -> Result<BanStatus, StoreError> {
        let _guard = self.locks.acquire(player_id).await;

        let now = self.clock.now();
        let record = self.store.load(player_id).await?;
        debug!(player_id = %player_id, state = ?record.ban_state(), "ban status check");

        if record.banned {
            if let Some(expiry) = record.ban_expiry {
                if now > expiry {
                    let mut cleared = record.clone();
                    cleared.banned = false;
                    cleared.ban_reason.clear();
                    cleared.ban_expiry = None;
                    self.store.save(player_id, &cleared).await?;

                    info!(player_id = %player_id, "temporary ban expired, player unbanned");
                    return Ok(BanStatus {
                        banned: false,
                        reason: record.ban_reason,
                        expiry: record.ban_expiry,
                    });
                }
            }
        }

        Ok(BanStatus {
            banned: record.banned,
            reason: record.ban_reason,
            expiry: record.ban_expiry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryTrustStore;
    use crate::trust::{BanState, TrustRecord};
    use chrono::{Duration, TimeZone};

    fn ledger() -> (Arc<MemoryTrustStore>, Arc<ManualClock>, TrustLedger) {
        let store = Arc::new(MemoryTrustStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap(),
        ));
        let ledger = TrustLedger::new(
            store.clone(),
            clock.clone(),
            Arc::new(PlayerLocks::new()),
            TrustPolicy::default(),
        );
        (store, clock, ledger)
    }

    #[tokio::test]
    async fn test_reports_accumulate_until_ban() {
        let (store, _, ledger) = ledger();

        for expected in 1..=4u32 {
            let outcome = ledger
                .report_suspicious("player_1", "memory_tamper")
                .await
                .unwrap();
            assert_eq!(
                outcome,
                SuspicionOutcome::Logged {
                    cheat_score: expected
                }
            );
        }

        let outcome = ledger
            .report_suspicious("player_1", "memory_tamper")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SuspicionOutcome::Banned {
                reason: AUTO_BAN_REASON.to_string()
            }
        );

        let record = store.load("player_1").await.unwrap();
        assert!(record.banned);
        assert_eq!(record.ban_expiry, None);
        assert_eq!(record.cheat_score, 5);
        assert_eq!(record.cheat_log.len(), 5);
        assert_eq!(record.ban_state(), BanState::Banned { expiry: None });
    }

    #[tokio::test]
    async fn test_permanent_ban_does_not_expire() {
        let (store, clock, ledger) = ledger();

        let record = TrustRecord {
            banned: true,
            ban_reason: AUTO_BAN_REASON.to_string(),
            ban_expiry: None,
            cheat_score: 5,
            ..TrustRecord::default()
        };
        store.save("player_1", &record).await.unwrap();

        clock.advance(Duration::days(365));
        let status = ledger.check_ban_status("player_1").await.unwrap();
        assert!(status.banned);
        assert_eq!(status.reason, AUTO_BAN_REASON);
        assert_eq!(status.expiry, None);
    }

    #[tokio::test]
    async fn test_expired_temp_ban_clears_on_check() {
        let (store, clock, ledger) = ledger();
        let now = clock.now();

        let record = TrustRecord {
            banned: true,
            ban_reason: "Manual review".to_string(),
            ban_expiry: Some(now - Duration::hours(1)),
            cheat_score: 3,
            cheat_log: vec![CheatLogEntry {
                activity_type: "replay".to_string(),
                timestamp: now - Duration::days(7),
            }],
            ..TrustRecord::default()
        };
        store.save("player_1", &record).await.unwrap();

        // The clearing call answers unbanned but still names the expired ban.
        let status = ledger.check_ban_status("player_1").await.unwrap();
        assert!(!status.banned);
        assert_eq!(status.reason, "Manual review");
        assert_eq!(status.expiry, Some(now - Duration::hours(1)));

        // The stored record is cleared; escalation history survives.
        let stored = store.load("player_1").await.unwrap();
        assert!(!stored.banned);
        assert_eq!(stored.ban_reason, "");
        assert_eq!(stored.ban_expiry, None);
        assert_eq!(stored.cheat_score, 3);
        assert_eq!(stored.cheat_log.len(), 1);

        // Later checks stay unbanned with a clean reason.
        let status = ledger.check_ban_status("player_1").await.unwrap();
        assert!(!status.banned);
        assert_eq!(status.reason, "");
        assert_eq!(status.expiry, None);
    }

    #[tokio::test]
    async fn test_unexpired_temp_ban_reported_unchanged() {
        let (store, clock, ledger) = ledger();
        let expiry = clock.now() + Duration::days(3);

        let record = TrustRecord {
            banned: true,
            ban_reason: "Manual review".to_string(),
            ban_expiry: Some(expiry),
            ..TrustRecord::default()
        };
        store.save("player_1", &record).await.unwrap();

        let status = ledger.check_ban_status("player_1").await.unwrap();
        assert!(status.banned);
        assert_eq!(status.expiry, Some(expiry));
    }

    #[tokio::test]
    async fn test_unknown_player_is_clear() {
        let (_, _, ledger) = ledger();
        let status = ledger.check_ban_status("new_player").await.unwrap();
        assert_eq!(
            status,
            BanStatus {
                banned: false,
                reason: String::new(),
                expiry: None,
            }
        );
    }
}
