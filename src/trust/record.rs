//! Per-player trust record and its storage codec.
//!
//! The record is the single server-authoritative document about a player:
//! submission pacing, progression high-water marks, the suspicion ledger
//! and ban state. Validators read it, evaluate their rules, and write it
//! back whole — there are no partial commits.
//!
//! Backing stores that only hold string values (the legacy player-data
//! store does) go through [`TrustRecord::to_fields`] /
//! [`TrustRecord::from_fields`], which encode timestamps as epoch
//! milliseconds (`0` = unset), booleans as `"true"`/`"false"` and the cheat
//! log as a JSON array. The rest of the crate only ever sees typed values.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One suspicious-activity entry in the append-only cheat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheatLogEntry {
    /// What was reported, e.g. `"memory_tamper"` or `"impossible_score"`.
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Server-held trust state for a single player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrustRecord {
    /// Last accepted score submission. None = never submitted.
    pub last_score_submit: Option<DateTime<Utc>>,
    /// Accepted submissions inside the current tournament window.
    pub window_submit_count: u32,
    /// Window start the counter last reset against.
    pub last_window_reset: Option<DateTime<Utc>>,
    /// Highest wave the player has ever been credited with. Only increases.
    pub max_wave_reached: u32,
    /// Damage figure of the last accepted score, kept for audit.
    pub last_validated_damage: i64,
    /// Cumulative count of flagged suspicious events.
    pub cheat_score: u32,
    /// Append-only history of suspicious-activity reports.
    pub cheat_log: Vec<CheatLogEntry>,
    pub banned: bool,
    pub ban_reason: String,
    /// Expiry of a temporary ban. None while banned = permanent.
    pub ban_expiry: Option<DateTime<Utc>>,
    /// When the account was created. None = unknown, treated as brand new
    /// by the progression-speed check.
    pub account_created: Option<DateTime<Utc>>,
    pub last_save_validation: Option<DateTime<Utc>>,
    /// Lifetime wave count from the last accepted save snapshot.
    pub validated_waves: u64,
}

/// Ban state machine position derived from a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanState {
    /// No suspicion on file.
    Clear,
    /// Suspicious events recorded, below the ban threshold.
    Flagged { cheat_score: u32 },
    /// Banned; permanent when `expiry` is None.
    Banned { expiry: Option<DateTime<Utc>> },
}

impl TrustRecord {
    pub fn ban_state(&self) -> BanState {
        if self.banned {
            BanState::Banned {
                expiry: self.ban_expiry,
            }
        } else if self.cheat_score > 0 {
            BanState::Flagged {
                cheat_score: self.cheat_score,
            }
        } else {
            BanState::Clear
        }
    }
}

/// Storage field names, shared with the legacy key-value store so existing
/// player records decode unchanged.
pub mod keys {
    pub const LAST_SCORE_SUBMIT: &str = "lastScoreSubmitTime";
    pub const WINDOW_SUBMIT_COUNT: &str = "scoreSubmitCountInWindow";
    pub const LAST_WINDOW_RESET: &str = "lastWindowResetTime";
    pub const MAX_WAVE_REACHED: &str = "maxWaveReached";
    pub const LAST_VALIDATED_DAMAGE: &str = "lastValidatedDamage";
    pub const CHEAT_SCORE: &str = "cheatScore";
    pub const CHEAT_LOG: &str = "cheatLog";
    pub const BANNED: &str = "banned";
    pub const BAN_REASON: &str = "banReason";
    pub const BAN_EXPIRY: &str = "banExpiry";
    pub const ACCOUNT_CREATED: &str = "accountCreatedTime";
    pub const LAST_SAVE_VALIDATION: &str = "lastSaveValidationTime";
    pub const VALIDATED_WAVES: &str = "validatedWaves";
}

impl TrustRecord {
    /// Encodes the record as string-typed fields.
    pub fn to_fields(&self) -> HashMap<String, String> {
        let mut fields = HashMap::new();
        fields.insert(
            keys::LAST_SCORE_SUBMIT.to_string(),
            encode_millis(self.last_score_submit),
        );
        fields.insert(
            keys::WINDOW_SUBMIT_COUNT.to_string(),
            self.window_submit_count.to_string(),
        );
        fields.insert(
            keys::LAST_WINDOW_RESET.to_string(),
            encode_millis(self.last_window_reset),
        );
        fields.insert(
            keys::MAX_WAVE_REACHED.to_string(),
            self.max_wave_reached.to_string(),
        );
        fields.insert(
            keys::LAST_VALIDATED_DAMAGE.to_string(),
            self.last_validated_damage.to_string(),
        );
        fields.insert(keys::CHEAT_SCORE.to_string(), self.cheat_score.to_string());
        fields.insert(
            keys::CHEAT_LOG.to_string(),
            serde_json::to_string(&self.cheat_log).unwrap_or_else(|_| "[]".to_string()),
        );
        fields.insert(keys::BANNED.to_string(), self.banned.to_string());
        fields.insert(keys::BAN_REASON.to_string(), self.ban_reason.clone());
        fields.insert(keys::BAN_EXPIRY.to_string(), encode_millis(self.ban_expiry));
        fields.insert(
            keys::ACCOUNT_CREATED.to_string(),
            encode_millis(self.account_created),
        );
        fields.insert(
            keys::LAST_SAVE_VALIDATION.to_string(),
            encode_millis(self.last_save_validation),
        );
        fields.insert(
            keys::VALIDATED_WAVES.to_string(),
            self.validated_waves.to_string(),
        );
        fields
    }

    /// Decodes a record from string-typed fields. Missing or unparseable
    /// fields fall back to their defaults, so a brand-new player decodes
    /// from an empty map.
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            last_score_submit: decode_millis(fields, keys::LAST_SCORE_SUBMIT),
            window_submit_count: decode_number(fields, keys::WINDOW_SUBMIT_COUNT),
            last_window_reset: decode_millis(fields, keys::LAST_WINDOW_RESET),
            max_wave_reached: decode_number(fields, keys::MAX_WAVE_REACHED),
            last_validated_damage: decode_number(fields, keys::LAST_VALIDATED_DAMAGE),
            cheat_score: decode_number(fields, keys::CHEAT_SCORE),
            cheat_log: fields
                .get(keys::CHEAT_LOG)
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default(),
            banned: fields.get(keys::BANNED).map(String::as_str) == Some("true"),
            ban_reason: fields.get(keys::BAN_REASON).cloned().unwrap_or_default(),
            ban_expiry: decode_millis(fields, keys::BAN_EXPIRY),
            account_created: decode_millis(fields, keys::ACCOUNT_CREATED),
            last_save_validation: decode_millis(fields, keys::LAST_SAVE_VALIDATION),
            validated_waves: decode_number(fields, keys::VALIDATED_WAVES),
        }
    }
}

fn encode_millis(value: Option<DateTime<Utc>>) -> String {
    value.map(|t| t.timestamp_millis()).unwrap_or(0).to_string()
}

fn decode_millis(fields: &HashMap<String, String>, key: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = fields.get(key)?.parse().ok()?;
    if millis == 0 {
        return None;
    }
    Utc.timestamp_millis_opt(millis).single()
}

fn decode_number<T: std::str::FromStr + Default>(fields: &HashMap<String, String>, key: &str) -> T {
    fields
        .get(key)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_decode_to_default_record() {
        let record = TrustRecord::from_fields(&HashMap::new());
        assert_eq!(record, TrustRecord::default());
        assert_eq!(record.ban_state(), BanState::Clear);
    }

    #[test]
    fn test_round_trip() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 30, 0).unwrap();
        let record = TrustRecord {
            last_score_submit: Some(now),
            window_submit_count: 2,
            last_window_reset: Some(now - chrono::Duration::hours(12)),
            max_wave_reached: 73,
            last_validated_damage: 9_000_000,
            cheat_score: 3,
            cheat_log: vec![CheatLogEntry {
                activity_type: "memory_tamper".to_string(),
                timestamp: now,
            }],
            banned: true,
            ban_reason: "Multiple cheating violations detected".to_string(),
            ban_expiry: None,
            account_created: Some(now - chrono::Duration::days(90)),
            last_save_validation: Some(now),
            validated_waves: 12_000,
        };

        let decoded = TrustRecord::from_fields(&record.to_fields());
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_wire_field_names_and_encoding() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let record = TrustRecord {
            last_score_submit: Some(now),
            banned: true,
            cheat_log: vec![CheatLogEntry {
                activity_type: "replay".to_string(),
                timestamp: now,
            }],
            ..TrustRecord::default()
        };

        let fields = record.to_fields();
        assert_eq!(
            fields.get("lastScoreSubmitTime").map(String::as_str),
            Some("1767571200000")
        );
        assert_eq!(fields.get("banned").map(String::as_str), Some("true"));
        // Permanent bans and unset timestamps encode as "0".
        assert_eq!(fields.get("banExpiry").map(String::as_str), Some("0"));

        // The cheat log keeps the legacy wire shape: `type` plus
        // millisecond `timestamp`.
        let log: serde_json::Value =
            serde_json::from_str(fields.get("cheatLog").unwrap()).unwrap();
        assert_eq!(log[0]["type"], "replay");
        assert_eq!(log[0]["timestamp"], 1_767_571_200_000_i64);
    }

    #[test]
    fn test_garbage_fields_fall_back_to_defaults() {
        let mut fields = HashMap::new();
        fields.insert("scoreSubmitCountInWindow".to_string(), "not-a-number".to_string());
        fields.insert("cheatLog".to_string(), "{broken".to_string());
        fields.insert("banned".to_string(), "yes".to_string());

        let record = TrustRecord::from_fields(&fields);
        assert_eq!(record.window_submit_count, 0);
        assert!(record.cheat_log.is_empty());
        assert!(!record.banned);
    }

    #[test]
    fn test_ban_state_derivation() {
        let mut record = TrustRecord::default();
        assert_eq!(record.ban_state(), BanState::Clear);

        record.cheat_score = 2;
        assert_eq!(record.ban_state(), BanState::Flagged { cheat_score: 2 });

        record.banned = true;
        assert_eq!(record.ban_state(), BanState::Banned { expiry: None });
    }
}
