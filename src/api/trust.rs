//! Trust ledger API endpoints.
//!
//! Endpoints:
//!   GET  /{player_id}/ban    -> Current ban status (clears expired bans)
//!   POST /{player_id}/report -> Report suspicious activity

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::trust::{BanStatus, SuspicionOutcome, TrustLedger};

/// Trust API state.
#[derive(Clone)]
pub struct TrustApiState {
    pub ledger: Arc<TrustLedger>,
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Ban status response. `expiry_time` is epoch millis; 0 means no expiry
/// (unbanned, or a permanent ban).
#[derive(Debug, Serialize)]
pub struct BanStatusResponse {
    pub banned: bool,
    pub reason: String,
    pub expiry_time: i64,
}

impl From<BanStatus> for BanStatusResponse {
    fn from(status: BanStatus) -> Self {
        Self {
            banned: status.banned,
            reason: status.reason,
            expiry_time: status
                .expiry
                .map(|t| t.timestamp_millis())
                .unwrap_or(0),
        }
    }
}

/// Suspicious activity report.
#[derive(Debug, Deserialize)]
pub struct ReportActivityRequest {
    #[serde(default = "default_activity_type")]
    pub activity_type: String,
}

fn default_activity_type() -> String {
    "unknown".to_string()
}

/// Report outcome.
#[derive(Debug, Serialize)]
pub struct ReportActivityResponse {
    pub banned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cheat_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<SuspicionOutcome> for ReportActivityResponse {
    fn from(outcome: SuspicionOutcome) -> Self {
        match outcome {
            SuspicionOutcome::Logged { cheat_score } => Self {
                banned: false,
                cheat_score: Some(cheat_score),
                warning: Some("Suspicious activity logged".to_string()),
                reason: None,
            },
            SuspicionOutcome::Banned { reason } => Self {
                banned: true,
                cheat_score: None,
                warning: None,
                reason: Some(reason),
            },
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Report the player's current ban status.
pub async fn check_ban_status(
    State(state): State<TrustApiState>,
    Path(player_id): Path<String>,
) -> Result<Json<BanStatusResponse>, StatusCode> {
    match state.ledger.check_ban_status(&player_id).await {
        Ok(status) => Ok(Json(status.into())),
        Err(e) => {
            error!(player_id = %player_id, error = %e, "ban status check failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Record a suspicious activity report against the player.
pub async fn report_suspicious(
    State(state): State<TrustApiState>,
    Path(player_id): Path<String>,
    Json(request): Json<ReportActivityRequest>,
) -> Result<Json<ReportActivityResponse>, StatusCode> {
    info!(
        player_id = %player_id,
        activity_type = %request.activity_type,
        "suspicious activity reported"
    );

    match state
        .ledger
        .report_suspicious(&player_id, &request.activity_type)
        .await
    {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => {
            error!(player_id = %player_id, error = %e, "suspicious activity report failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

pub fn create_router(state: TrustApiState) -> Router {
    Router::new()
        .route("/{player_id}/ban", get(check_ban_status))
        .route("/{player_id}/report", post(report_suspicious))
        .with_state(state)
}
