//! Boss Rush score validation.
//!
//! The pipeline runs a fixed order of checks — static bounds, submission
//! pacing, per-window quota, progression, damage plausibility, window
//! state — and stops at the first rejection. The trust record is written
//! exactly once, only when every check passes.
//!
//! ## Damage ceiling model
//!
//! Enemy HP grows 13% per wave on a base of 1000, scaled x5 in Boss Rush;
//! bosses per wave step up every 10 waves and cap at 10; rewards scale 5^tier.
//! The ceiling allows a 1.5x overkill factor on top, and submissions get a
//! further 2x variance margin before they are called impossible.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::rules::{self, RejectReason, RuleOutcome};
use super::tournament::{TournamentSchedule, TournamentWindow};
use crate::clock::Clock;
use crate::store::{PlayerLocks, StoreError, TrustStore};
use crate::trust::TrustRecord;

/// Hard cap on a single submission's damage figure (10^18).
const MAX_DAMAGE: i64 = 1_000_000_000_000_000_000;
/// No run survives past this many waves.
const MAX_WAVES: i32 = 10_000;

// Game-balance constants behind the damage ceiling.
const BASE_ENEMY_HP: f64 = 1000.0;
const HP_GROWTH_PER_WAVE: f64 = 1.13;
const BOSS_RUSH_HP_SCALE: f64 = 5.0;
const TIER_REWARD_BASE: f64 = 5.0;
const MAX_BOSS_COUNT: i32 = 10;
const OVERKILL_FACTOR: f64 = 1.5;
const VARIANCE_MARGIN: f64 = 2.0;

/// A client-submitted Boss Rush score. Ephemeral, input only.
///
/// Absent numbers read as 0 and an absent tier as 1, so older client
/// payloads still parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSubmission {
    #[serde(default)]
    pub damage: i64,
    #[serde(default)]
    pub waves: i32,
    #[serde(default = "default_tier")]
    pub tier: i32,
    /// Client-claimed submission time in epoch millis. Recorded for audit
    /// only; every rule runs against the server clock.
    #[serde(default)]
    pub timestamp: i64,
}

fn default_tier() -> i32 {
    1
}

/// Operational knobs for the pacing rules.
#[derive(Debug, Clone)]
pub struct ScoreLimits {
    /// Minimum time between submissions.
    pub min_submit_interval_secs: i64,
    /// Accepted submissions allowed per tournament window.
    pub max_submits_per_window: u32,
    /// Waves a player may exceed their recorded best by (skill variance).
    pub progression_buffer_waves: u32,
}

impl Default for ScoreLimits {
    fn default() -> Self {
        Self {
            min_submit_interval_secs: 300,
            max_submits_per_window: 3,
            progression_buffer_waves: 10,
        }
    }
}

/// Outcome of a score validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVerdict {
    pub accepted: bool,
    pub reason: String,
    /// Floored damage-per-wave figure, present on acceptance.
    pub damage_per_wave: Option<i64>,
}

impl ScoreVerdict {
    fn accepted(damage_per_wave: i64) -> Self {
        Self {
            accepted: true,
            reason: "Score passed all validation checks".to_string(),
            damage_per_wave: Some(damage_per_wave),
        }
    }

    fn rejected(reason: &RejectReason) -> Self {
        Self {
            accepted: false,
            reason: reason.to_string(),
            damage_per_wave: None,
        }
    }
}

/// Everything a score rule may look at.
pub(crate) struct ScoreContext<'a> {
    submission: &'a ScoreSubmission,
    record: &'a TrustRecord,
    now: DateTime<Utc>,
    window: TournamentWindow,
    limits: &'a ScoreLimits,
}

fn check_bounds(ctx: &ScoreContext<'_>) -> RuleOutcome {
    if ctx.submission.damage <= 0 || ctx.submission.waves <= 0 {
        return RuleOutcome::Reject(RejectReason::InvalidScoreInput);
    }
    if ctx.submission.damage > MAX_DAMAGE {
        return RuleOutcome::Reject(RejectReason::DamageOverflow);
    }
    if ctx.submission.waves > MAX_WAVES {
        return RuleOutcome::Reject(RejectReason::WavesImpossiblyHigh);
    }
    RuleOutcome::Pass
}

fn check_rate_limit(ctx: &ScoreContext<'_>) -> RuleOutcome {
    let min_interval = Duration::seconds(ctx.limits.min_submit_interval_secs);
    if let Some(last) = ctx.record.last_score_submit {
        if ctx.now.signed_duration_since(last) < min_interval {
            return RuleOutcome::Reject(RejectReason::SubmitTooFrequent {
                wait_secs: ctx.limits.min_submit_interval_secs,
            });
        }
    }
    RuleOutcome::Pass
}

fn check_window_quota(ctx: &ScoreContext<'_>) -> RuleOutcome {
    let count = effective_window_count(ctx.record, &ctx.window);
    if count >= ctx.limits.max_submits_per_window {
        return RuleOutcome::Reject(RejectReason::QuotaExhausted {
            limit: ctx.limits.max_submits_per_window,
        });
    }
    RuleOutcome::Pass
}

fn check_progression(ctx: &ScoreContext<'_>) -> RuleOutcome {
    let ceiling =
        i64::from(ctx.record.max_wave_reached) + i64::from(ctx.limits.progression_buffer_waves);
    if i64::from(ctx.submission.waves) > ceiling {
        return RuleOutcome::Reject(RejectReason::ProgressionExceeded {
            max_wave: ctx.record.max_wave_reached,
        });
    }
    RuleOutcome::Pass
}

fn check_plausibility(ctx: &ScoreContext<'_>) -> RuleOutcome {
    let damage_per_wave = ctx.submission.damage as f64 / ctx.submission.waves as f64;
    let ceiling = max_damage_per_wave(ctx.submission.tier, ctx.submission.waves);
    if damage_per_wave > ceiling * VARIANCE_MARGIN {
        return RuleOutcome::Reject(RejectReason::DamageImplausible {
            tier: ctx.submission.tier,
        });
    }
    RuleOutcome::Pass
}

fn check_window_open(ctx: &ScoreContext<'_>) -> RuleOutcome {
    if !ctx.window.is_active {
        return RuleOutcome::Reject(RejectReason::TournamentClosed);
    }
    RuleOutcome::Pass
}

/// Window counter as the quota rule sees it: zero when the current window
/// started after the last recorded reset.
fn effective_window_count(record: &TrustRecord, window: &TournamentWindow) -> u32 {
    let stale = record
        .last_window_reset
        .map_or(true, |reset| reset < window.start);
    if stale {
        0
    } else {
        record.window_submit_count
    }
}

/// Theoretical damage-per-wave ceiling for a tier/wave pair, overkill
/// factor included.
fn max_damage_per_wave(tier: i32, waves: i32) -> f64 {
    let tier_multiplier = TIER_REWARD_BASE.powi(tier);
    let enemy_hp = BASE_ENEMY_HP * HP_GROWTH_PER_WAVE.powi(waves) * BOSS_RUSH_HP_SCALE;
    let boss_count = f64::from((waves / 10 + 1).min(MAX_BOSS_COUNT));
    boss_count * enemy_hp * tier_multiplier * OVERKILL_FACTOR
}

/// Validates Boss Rush score submissions against the player's trust record.
pub struct ScoreValidator {
    store: Arc<dyn TrustStore>,
    clock: Arc<dyn Clock>,
    locks: Arc<PlayerLocks>,
    schedule: TournamentSchedule,
    limits: ScoreLimits,
}

impl ScoreValidator {
    pub fn new(
        store: Arc<dyn TrustStore>,
        clock: Arc<dyn Clock>,
        locks: Arc<PlayerLocks>,
        schedule: TournamentSchedule,
        limits: ScoreLimits,
    ) -> Self {
        Self {
            store,
            clock,
            locks,
            schedule,
            limits,
        }
    }

    /// Runs the full pipeline for one submission.
    ///
    /// Rejections leave the trust record untouched; acceptance commits the
    /// pacing state, progression high-water mark and audit damage in a
    /// single store write.
    pub async fn validate_score(
        &self,
        player_id: &str,
        submission: &ScoreSubmission,
    ) -> Result<ScoreVerdict, StoreError> {
        let _guard = self.locks.acquire(player_id).await;

        let now = self.clock.now();
        let record = self.store.load(player_id).await?;
        let window = self.schedule.window_at(now);

        let pipeline: [fn(&ScoreContext<'_>) -> RuleOutcome; 6] = [
            check_bounds,
            check_rate_limit,
            check_window_quota,
            check_progression,
            check_plausibility,
            check_window_open,
        ];
        let outcome = {
            let ctx = ScoreContext {
                submission,
                record: &record,
                now,
                window,
                limits: &self.limits,
            };
            rules::first_rejection(&ctx, &pipeline)
        };

        if let RuleOutcome::Reject(reason) = outcome {
            debug!(
                player_id = %player_id,
                damage = submission.damage,
                waves = submission.waves,
                tier = submission.tier,
                %reason,
                "score submission rejected"
            );
            return Ok(ScoreVerdict::rejected(&reason));
        }

        let mut updated = record;
        updated.window_submit_count = effective_window_count(&updated, &window) + 1;
        updated.last_score_submit = Some(now);
        updated.last_window_reset = Some(window.start);
        updated.max_wave_reached = updated.max_wave_reached.max(submission.waves as u32);
        updated.last_validated_damage = submission.damage;
        self.store.save(player_id, &updated).await?;

        let damage_per_wave = submission.damage / i64::from(submission.waves);
        info!(
            player_id = %player_id,
            damage = submission.damage,
            waves = submission.waves,
            damage_per_wave,
            "score validated"
        );
        Ok(ScoreVerdict::accepted(damage_per_wave))
    }
}
