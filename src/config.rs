//! Configuration management.
//!
//! All settings load from `PLAYGUARD_*` environment variables on top of
//! defaults that match the shipped game. `from_env` validates the result,
//! so a misconfigured deployment fails at startup rather than at the first
//! submission.

use anyhow::{bail, Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::env;

use crate::api::SecurityConfig;
use crate::trust::TrustPolicy;
use crate::validation::{SaveLimits, ScoreLimits, TournamentSchedule};

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// Transport-level rate limiting.
    pub security: TransportConfig,
    /// Weekly tournament schedule.
    pub tournament: TournamentConfig,
    /// Score submission pacing.
    pub score: ScoreRulesConfig,
    /// Save snapshot checks.
    pub save: SaveRulesConfig,
    /// Ban escalation.
    pub trust: TrustConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string.
    pub postgres_url: String,
    /// When false, trust records live in memory only.
    pub postgres_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
    /// Emit request span events.
    pub log_requests: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Requests per minute per client IP.
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Active weekdays, lowercase three-letter names ("mon", "thu", "sat").
    pub active_days: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRulesConfig {
    /// Minimum seconds between score submissions.
    pub min_submit_interval_secs: i64,
    /// Accepted submissions per tournament window.
    pub max_submits_per_window: u32,
    /// Waves a player may exceed their recorded best by.
    pub progression_buffer_waves: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRulesConfig {
    /// Lifetime waves per day of account age the save check tolerates.
    pub max_waves_per_day: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Suspicious events before a permanent ban.
    pub auto_ban_threshold: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8470,
            },
            database: DatabaseConfig {
                postgres_url: "postgresql://localhost:5432/playguard".to_string(),
                postgres_enabled: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                log_requests: false,
            },
            security: TransportConfig {
                rate_limit_per_minute: 60,
            },
            tournament: TournamentConfig {
                active_days: vec!["mon".to_string(), "thu".to_string(), "sat".to_string()],
            },
            score: ScoreRulesConfig {
                min_submit_interval_secs: 300,
                max_submits_per_window: 3,
                progression_buffer_waves: 10,
            },
            save: SaveRulesConfig {
                max_waves_per_day: 100_000.0,
            },
            trust: TrustConfig {
                auto_ban_threshold: 5,
            },
        }
    }
}

impl GuardConfig {
    /// Loads configuration from environment variables and validates it.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var("PLAYGUARD_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("PLAYGUARD_PORT") {
            config.server.port = port.parse().context("Invalid PLAYGUARD_PORT value")?;
        }

        if let Ok(url) = env::var("PLAYGUARD_POSTGRES_URL") {
            config.database.postgres_url = url;
        }
        if let Ok(enabled) = env::var("PLAYGUARD_POSTGRES_ENABLED") {
            config.database.postgres_enabled = enabled
                .parse()
                .context("Invalid PLAYGUARD_POSTGRES_ENABLED value")?;
        }

        if let Ok(level) = env::var("PLAYGUARD_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(log_requests) = env::var("PLAYGUARD_LOG_REQUESTS") {
            config.logging.log_requests = log_requests
                .parse()
                .context("Invalid PLAYGUARD_LOG_REQUESTS value")?;
        }

        if let Ok(rate_limit) = env::var("PLAYGUARD_RATE_LIMIT_PER_MINUTE") {
            config.security.rate_limit_per_minute = rate_limit
                .parse()
                .context("Invalid PLAYGUARD_RATE_LIMIT_PER_MINUTE value")?;
        }

        if let Ok(days) = env::var("PLAYGUARD_TOURNAMENT_DAYS") {
            config.tournament.active_days = days
                .split(',')
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect();
        }

        if let Ok(interval) = env::var("PLAYGUARD_MIN_SUBMIT_INTERVAL_SECS") {
            config.score.min_submit_interval_secs = interval
                .parse()
                .context("Invalid PLAYGUARD_MIN_SUBMIT_INTERVAL_SECS value")?;
        }
        if let Ok(quota) = env::var("PLAYGUARD_MAX_SUBMITS_PER_WINDOW") {
            config.score.max_submits_per_window = quota
                .parse()
                .context("Invalid PLAYGUARD_MAX_SUBMITS_PER_WINDOW value")?;
        }
        if let Ok(buffer) = env::var("PLAYGUARD_PROGRESSION_BUFFER_WAVES") {
            config.score.progression_buffer_waves = buffer
                .parse()
                .context("Invalid PLAYGUARD_PROGRESSION_BUFFER_WAVES value")?;
        }

        if let Ok(per_day) = env::var("PLAYGUARD_MAX_WAVES_PER_DAY") {
            config.save.max_waves_per_day = per_day
                .parse()
                .context("Invalid PLAYGUARD_MAX_WAVES_PER_DAY value")?;
        }

        if let Ok(threshold) = env::var("PLAYGUARD_AUTO_BAN_THRESHOLD") {
            config.trust.auto_ban_threshold = threshold
                .parse()
                .context("Invalid PLAYGUARD_AUTO_BAN_THRESHOLD value")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the validators cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.score.min_submit_interval_secs <= 0 {
            bail!("min_submit_interval_secs must be positive");
        }
        if self.score.max_submits_per_window == 0 {
            bail!("max_submits_per_window must be at least 1");
        }
        if self.save.max_waves_per_day <= 0.0 {
            bail!("max_waves_per_day must be positive");
        }
        if self.trust.auto_ban_threshold == 0 {
            bail!("auto_ban_threshold must be at least 1");
        }
        // Surfaces an empty or unparseable schedule at startup.
        self.tournament.schedule()?;
        Ok(())
    }
}

impl TournamentConfig {
    /// Builds the schedule the window calculator runs against.
    pub fn schedule(&self) -> Result<TournamentSchedule> {
        let mut days = Vec::new();
        for name in &self.active_days {
            days.push(parse_weekday(name)?);
        }
        TournamentSchedule::new(days)
    }
}

impl ScoreRulesConfig {
    pub fn to_limits(&self) -> ScoreLimits {
        ScoreLimits {
            min_submit_interval_secs: self.min_submit_interval_secs,
            max_submits_per_window: self.max_submits_per_window,
            progression_buffer_waves: self.progression_buffer_waves,
        }
    }
}

impl SaveRulesConfig {
    pub fn to_limits(&self) -> SaveLimits {
        SaveLimits {
            max_waves_per_day: self.max_waves_per_day,
        }
    }
}

impl TrustConfig {
    pub fn to_policy(&self) -> TrustPolicy {
        TrustPolicy {
            auto_ban_threshold: self.auto_ban_threshold,
        }
    }
}

impl TransportConfig {
    pub fn to_security(&self) -> SecurityConfig {
        SecurityConfig {
            rate_limit_per_minute: self.rate_limit_per_minute,
        }
    }
}

fn parse_weekday(name: &str) -> Result<Weekday> {
    match name.to_lowercase().as_str() {
        "mon" | "monday" => Ok(Weekday::Mon),
        "tue" | "tuesday" => Ok(Weekday::Tue),
        "wed" | "wednesday" => Ok(Weekday::Wed),
        "thu" | "thursday" => Ok(Weekday::Thu),
        "fri" | "friday" => Ok(Weekday::Fri),
        "sat" | "saturday" => Ok(Weekday::Sat),
        "sun" | "sunday" => Ok(Weekday::Sun),
        other => bail!("Unknown weekday in tournament schedule: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GuardConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_schedule_parses() {
        use chrono::{TimeZone, Utc};

        let config = GuardConfig::default();
        let schedule = config.tournament.schedule().unwrap();
        // 2026-01-08 is a Thursday.
        let thursday = Utc.with_ymd_and_hms(2026, 1, 8, 9, 0, 0).unwrap();
        assert!(schedule.window_at(thursday).is_active);
    }

    #[test]
    fn test_bad_weekday_rejected() {
        let config = TournamentConfig {
            active_days: vec!["mon".to_string(), "someday".to_string()],
        };
        assert!(config.schedule().is_err());
    }

    #[test]
    fn test_empty_schedule_rejected() {
        let mut config = GuardConfig::default();
        config.tournament.active_days.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = GuardConfig::default();
        config.score.min_submit_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
