//! Cloud-save snapshot validation.
//!
//! Snapshots arrive as a raw JSON string. A payload that does not parse is
//! a [`ValidationFailure::MalformedPayload`], not a rule rejection; parsed
//! snapshots then run bounds checks plus a progression-speed check against
//! the account's age.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::rules::{self, RejectReason, RuleOutcome};
use super::ValidationFailure;
use crate::clock::Clock;
use crate::store::{PlayerLocks, TrustStore};
use crate::trust::TrustRecord;

/// Hard cap on banked archive tokens (10^18).
const MAX_ARCHIVE_TOKENS: i64 = 1_000_000_000_000_000_000;
/// Hard cap on fragments (10^12).
const MAX_FRAGMENTS: i64 = 1_000_000_000_000;
/// Hard cap on lifetime waves (10^9).
const MAX_TOTAL_WAVES: i64 = 1_000_000_000;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Parsed cloud-save snapshot. Ephemeral, input only.
///
/// Absent fields read as 0, so partial uploads from older clients still
/// parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveSnapshot {
    #[serde(default)]
    pub archive_tokens: i64,
    #[serde(default)]
    pub fragments: i64,
    #[serde(default)]
    pub perm_projectile_damage: i64,
    #[serde(default)]
    pub total_waves_completed: i64,
}

/// Operational knobs for the save checks.
#[derive(Debug, Clone)]
pub struct SaveLimits {
    /// Lifetime waves a player may plausibly clear per day of account age.
    pub max_waves_per_day: f64,
}

impl Default for SaveLimits {
    fn default() -> Self {
        Self {
            max_waves_per_day: 100_000.0,
        }
    }
}

/// Outcome of a save validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveVerdict {
    pub accepted: bool,
    pub reason: String,
}

impl SaveVerdict {
    fn accepted() -> Self {
        Self {
            accepted: true,
            reason: "Save data valid".to_string(),
        }
    }

    fn rejected(reason: &RejectReason) -> Self {
        Self {
            accepted: false,
            reason: reason.to_string(),
        }
    }
}

pub(crate) struct SaveContext<'a> {
    snapshot: &'a SaveSnapshot,
    record: &'a TrustRecord,
    now: DateTime<Utc>,
    limits: &'a SaveLimits,
}

fn check_archive_tokens(ctx: &SaveContext<'_>) -> RuleOutcome {
    let value = ctx.snapshot.archive_tokens;
    if !(0..=MAX_ARCHIVE_TOKENS).contains(&value) {
        return RuleOutcome::Reject(RejectReason::ArchiveTokensOutOfRange { value });
    }
    RuleOutcome::Pass
}

fn check_fragments(ctx: &SaveContext<'_>) -> RuleOutcome {
    let value = ctx.snapshot.fragments;
    if !(0..=MAX_FRAGMENTS).contains(&value) {
        return RuleOutcome::Reject(RejectReason::FragmentsOutOfRange { value });
    }
    RuleOutcome::Pass
}

fn check_perm_damage(ctx: &SaveContext<'_>) -> RuleOutcome {
    // The upper bound is the i64 domain itself; only negatives can be
    // out of range.
    let value = ctx.snapshot.perm_projectile_damage;
    if value < 0 {
        return RuleOutcome::Reject(RejectReason::PermDamageNegative { value });
    }
    RuleOutcome::Pass
}

fn check_wave_count(ctx: &SaveContext<'_>) -> RuleOutcome {
    let value = ctx.snapshot.total_waves_completed;
    if !(0..=MAX_TOTAL_WAVES).contains(&value) {
        return RuleOutcome::Reject(RejectReason::WaveCountOutOfRange { value });
    }
    RuleOutcome::Pass
}

fn check_progression_speed(ctx: &SaveContext<'_>) -> RuleOutcome {
    // Unknown creation time means the account is treated as brand new.
    let age_millis = ctx
        .record
        .account_created
        .map(|created| ctx.now.signed_duration_since(created).num_milliseconds())
        .unwrap_or(0)
        .max(0);
    let age_days = age_millis as f64 / MILLIS_PER_DAY;

    if ctx.snapshot.total_waves_completed as f64 > age_days * ctx.limits.max_waves_per_day {
        return RuleOutcome::Reject(RejectReason::ProgressionTooFast);
    }
    RuleOutcome::Pass
}

/// Validates cloud-save snapshots against the player's trust record.
pub struct SaveValidator {
    store: Arc<dyn TrustStore>,
    clock: Arc<dyn Clock>,
    locks: Arc<PlayerLocks>,
    limits: SaveLimits,
}

impl SaveValidator {
    pub fn new(
        store: Arc<dyn TrustStore>,
        clock: Arc<dyn Clock>,
        locks: Arc<PlayerLocks>,
        limits: SaveLimits,
    ) -> Self {
        Self {
            store,
            clock,
            locks,
            limits,
        }
    }

    /// Parses and validates a raw save payload.
    pub async fn validate_save(
        &self,
        player_id: &str,
        save_data_json: &str,
    ) -> Result<SaveVerdict, ValidationFailure> {
        let snapshot: SaveSnapshot =
            serde_json::from_str(save_data_json).map_err(ValidationFailure::MalformedPayload)?;
        self.validate_snapshot(player_id, &snapshot).await
    }

    /// Validates an already-parsed snapshot.
    pub async fn validate_snapshot(
        &self,
        player_id: &str,
        snapshot: &SaveSnapshot,
    ) -> Result<SaveVerdict, ValidationFailure> {
        let _guard = self.locks.acquire(player_id).await;

        let now = self.clock.now();
        let record = self.store.load(player_id).await?;

        let pipeline: [fn(&SaveContext<'_>) -> RuleOutcome; 5] = [
            check_archive_tokens,
            check_fragments,
            check_perm_damage,
            check_wave_count,
            check_progression_speed,
        ];
        let outcome = {
            let ctx = SaveContext {
                snapshot,
                record: &record,
                now,
                limits: &self.limits,
            };
            rules::first_rejection(&ctx, &pipeline)
        };

        if let RuleOutcome::Reject(reason) = outcome {
            debug!(
                player_id = %player_id,
                waves = snapshot.total_waves_completed,
                %reason,
                "save snapshot rejected"
            );
            return Ok(SaveVerdict::rejected(&reason));
        }

        let mut updated = record;
        updated.last_save_validation = Some(now);
        updated.validated_waves = snapshot.total_waves_completed as u64;
        self.store.save(player_id, &updated).await?;

        info!(
            player_id = %player_id,
            waves = snapshot.total_waves_completed,
            "save snapshot validated"
        );
        Ok(SaveVerdict::accepted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ctx_parts() -> (TrustRecord, DateTime<Utc>, SaveLimits) {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        let record = TrustRecord {
            account_created: Some(now - Duration::days(30)),
            ..TrustRecord::default()
        };
        (record, now, SaveLimits::default())
    }

    fn run(
        rule: fn(&SaveContext<'_>) -> RuleOutcome,
        snapshot: &SaveSnapshot,
        record: &TrustRecord,
        now: DateTime<Utc>,
        limits: &SaveLimits,
    ) -> RuleOutcome {
        rule(&SaveContext {
            snapshot,
            record,
            now,
            limits,
        })
    }

    #[test]
    fn test_currency_bounds() {
        let (record, now, limits) = ctx_parts();

        let negative = SaveSnapshot {
            archive_tokens: -1,
            ..SaveSnapshot::default()
        };
        assert_eq!(
            run(check_archive_tokens, &negative, &record, now, &limits),
            RuleOutcome::Reject(RejectReason::ArchiveTokensOutOfRange { value: -1 })
        );

        let over = SaveSnapshot {
            fragments: MAX_FRAGMENTS + 1,
            ..SaveSnapshot::default()
        };
        assert_eq!(
            run(check_fragments, &over, &record, now, &limits),
            RuleOutcome::Reject(RejectReason::FragmentsOutOfRange {
                value: MAX_FRAGMENTS + 1
            })
        );

        let at_cap = SaveSnapshot {
            archive_tokens: MAX_ARCHIVE_TOKENS,
            fragments: MAX_FRAGMENTS,
            ..SaveSnapshot::default()
        };
        assert!(run(check_archive_tokens, &at_cap, &record, now, &limits).is_pass());
        assert!(run(check_fragments, &at_cap, &record, now, &limits).is_pass());
    }

    #[test]
    fn test_perm_damage_only_rejects_negatives() {
        let (record, now, limits) = ctx_parts();

        let max = SaveSnapshot {
            perm_projectile_damage: i64::MAX,
            ..SaveSnapshot::default()
        };
        assert!(run(check_perm_damage, &max, &record, now, &limits).is_pass());

        let negative = SaveSnapshot {
            perm_projectile_damage: -1,
            ..SaveSnapshot::default()
        };
        assert!(!run(check_perm_damage, &negative, &record, now, &limits).is_pass());
    }

    #[test]
    fn test_wave_count_bounds() {
        let (record, now, limits) = ctx_parts();

        let over = SaveSnapshot {
            total_waves_completed: MAX_TOTAL_WAVES + 1,
            ..SaveSnapshot::default()
        };
        assert_eq!(
            run(check_wave_count, &over, &record, now, &limits),
            RuleOutcome::Reject(RejectReason::WaveCountOutOfRange {
                value: MAX_TOTAL_WAVES + 1
            })
        );
    }

    #[test]
    fn test_progression_speed_uses_fractional_days() {
        let (mut record, now, limits) = ctx_parts();
        // Half a day old: 50_000 waves allowed.
        record.account_created = Some(now - Duration::hours(12));

        let ok = SaveSnapshot {
            total_waves_completed: 50_000,
            ..SaveSnapshot::default()
        };
        assert!(run(check_progression_speed, &ok, &record, now, &limits).is_pass());

        let too_fast = SaveSnapshot {
            total_waves_completed: 50_001,
            ..SaveSnapshot::default()
        };
        assert_eq!(
            run(check_progression_speed, &too_fast, &record, now, &limits),
            RuleOutcome::Reject(RejectReason::ProgressionTooFast)
        );
    }

    #[test]
    fn test_unknown_account_age_rejects_any_progress() {
        let (mut record, now, limits) = ctx_parts();
        record.account_created = None;

        let any = SaveSnapshot {
            total_waves_completed: 1,
            ..SaveSnapshot::default()
        };
        assert!(!run(check_progression_speed, &any, &record, now, &limits).is_pass());

        let none = SaveSnapshot::default();
        assert!(run(check_progression_speed, &none, &record, now, &limits).is_pass());
    }

    #[test]
    fn test_snapshot_parsing_defaults() {
        let snapshot: SaveSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot.archive_tokens, 0);
        assert_eq!(snapshot.total_waves_completed, 0);

        let snapshot: SaveSnapshot = serde_json::from_str(
            r#"{"archive_tokens": 500, "fragments": 3, "perm_projectile_damage": 12, "total_waves_completed": 77}"#,
        )
        .unwrap();
        assert_eq!(snapshot.archive_tokens, 500);
        assert_eq!(snapshot.total_waves_completed, 77);
    }
}
