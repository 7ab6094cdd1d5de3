//! PostgreSQL trust store using sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{debug, info};

use super::{StoreError, TrustStore};
use crate::trust::{CheatLogEntry, TrustRecord};

pub struct PgTrustStore {
    pool: PgPool,
}

impl PgTrustStore {
    /// Connects to PostgreSQL with a small fixed pool.
    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to connect: {}", e)))?;

        info!("Connected to PostgreSQL trust store");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the trust schema and records table if missing.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        info!("Initializing trust schema...");

        sqlx::query("CREATE SCHEMA IF NOT EXISTS trust")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to create schema: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trust.records (
                player_id VARCHAR(255) PRIMARY KEY,
                last_score_submit TIMESTAMP WITH TIME ZONE,
                window_submit_count INTEGER NOT NULL DEFAULT 0,
                last_window_reset TIMESTAMP WITH TIME ZONE,
                max_wave_reached INTEGER NOT NULL DEFAULT 0,
                last_validated_damage BIGINT NOT NULL DEFAULT 0,
                cheat_score INTEGER NOT NULL DEFAULT 0,
                cheat_log JSONB NOT NULL DEFAULT '[]',
                banned BOOLEAN NOT NULL DEFAULT FALSE,
                ban_reason TEXT NOT NULL DEFAULT '',
                ban_expiry TIMESTAMP WITH TIME ZONE,
                account_created TIMESTAMP WITH TIME ZONE,
                last_save_validation TIMESTAMP WITH TIME ZONE,
                validated_waves BIGINT NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("failed to create records table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trust_records_banned ON trust.records(banned, ban_expiry)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("failed to create ban index: {}", e)))?;

        info!("Trust schema initialized");
        Ok(())
    }
}

#[async_trait]
impl TrustStore for PgTrustStore {
    async fn load(&self, player_id: &str) -> Result<TrustRecord, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT last_score_submit, window_submit_count, last_window_reset,
                   max_wave_reached, last_validated_damage, cheat_score, cheat_log,
                   banned, ban_reason, ban_expiry, account_created,
                   last_save_validation, validated_waves
            FROM trust.records
            WHERE player_id = $1
            "#,
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("failed to load trust record: {}", e)))?;

        let Some(row) = row else {
            debug!(player_id = %player_id, "no trust record, using defaults");
            return Ok(TrustRecord::default());
        };

        let cheat_log_json: serde_json::Value = row.get("cheat_log");
        let cheat_log: Vec<CheatLogEntry> =
            serde_json::from_value(cheat_log_json).unwrap_or_default();

        let window_submit_count: i32 = row.get("window_submit_count");
        let max_wave_reached: i32 = row.get("max_wave_reached");
        let cheat_score: i32 = row.get("cheat_score");
        let validated_waves: i64 = row.get("validated_waves");

        Ok(TrustRecord {
            last_score_submit: row.get::<Option<DateTime<Utc>>, _>("last_score_submit"),
            window_submit_count: window_submit_count.max(0) as u32,
            last_window_reset: row.get::<Option<DateTime<Utc>>, _>("last_window_reset"),
            max_wave_reached: max_wave_reached.max(0) as u32,
            last_validated_damage: row.get("last_validated_damage"),
            cheat_score: cheat_score.max(0) as u32,
            cheat_log,
            banned: row.get("banned"),
            ban_reason: row.get("ban_reason"),
            ban_expiry: row.get::<Option<DateTime<Utc>>, _>("ban_expiry"),
            account_created: row.get::<Option<DateTime<Utc>>, _>("account_created"),
            last_save_validation: row.get::<Option<DateTime<Utc>>, _>("last_save_validation"),
            validated_waves: validated_waves.max(0) as u64,
        })
    }

    async fn save(&self, player_id: &str, record: &TrustRecord) -> Result<(), StoreError> {
        let cheat_log = serde_json::to_value(&record.cheat_log)
            .unwrap_or_else(|_| serde_json::json!([]));

        sqlx::query(
            r#"
            INSERT INTO trust.records
                (player_id, last_score_submit, window_submit_count, last_window_reset,
                 max_wave_reached, last_validated_damage, cheat_score, cheat_log,
                 banned, ban_reason, ban_expiry, account_created,
                 last_save_validation, validated_waves)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (player_id) DO UPDATE SET
                last_score_submit = EXCLUDED.last_score_submit,
                window_submit_count = EXCLUDED.window_submit_count,
                last_window_reset = EXCLUDED.last_window_reset,
                max_wave_reached = EXCLUDED.max_wave_reached,
                last_validated_damage = EXCLUDED.last_validated_damage,
                cheat_score = EXCLUDED.cheat_score,
                cheat_log = EXCLUDED.cheat_log,
                banned = EXCLUDED.banned,
                ban_reason = EXCLUDED.ban_reason,
                ban_expiry = EXCLUDED.ban_expiry,
                account_created = EXCLUDED.account_created,
                last_save_validation = EXCLUDED.last_save_validation,
                validated_waves = EXCLUDED.validated_waves
            "#,
        )
        .bind(player_id)
        .bind(record.last_score_submit)
        .bind(record.window_submit_count as i32)
        .bind(record.last_window_reset)
        .bind(record.max_wave_reached as i32)
        .bind(record.last_validated_damage)
        .bind(record.cheat_score as i32)
        .bind(cheat_log)
        .bind(record.banned)
        .bind(&record.ban_reason)
        .bind(record.ban_expiry)
        .bind(record.account_created)
        .bind(record.last_save_validation)
        .bind(record.validated_waves as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("failed to save trust record: {}", e)))?;

        Ok(())
    }
}
