//! Validation API endpoints.
//!
//! Endpoints:
//!   POST /score -> Validate a Boss Rush score submission
//!   POST /save  -> Validate a cloud-save snapshot

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::validation::{
    SaveValidator, SaveVerdict, ScoreSubmission, ScoreValidator, ScoreVerdict, ValidationFailure,
};

/// Validation API state.
#[derive(Clone)]
pub struct ValidationApiState {
    pub score: Arc<ScoreValidator>,
    pub save: Arc<SaveValidator>,
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Score validation request.
#[derive(Debug, Deserialize)]
pub struct ValidateScoreRequest {
    pub player_id: String,
    #[serde(flatten)]
    pub submission: ScoreSubmission,
}

/// Score validation response.
#[derive(Debug, Serialize)]
pub struct ValidateScoreResponse {
    pub valid: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_per_wave: Option<i64>,
}

impl From<ScoreVerdict> for ValidateScoreResponse {
    fn from(verdict: ScoreVerdict) -> Self {
        Self {
            valid: verdict.accepted,
            reason: verdict.reason,
            damage_per_wave: verdict.damage_per_wave,
        }
    }
}

/// Save validation request. `save_data` is the raw snapshot JSON string as
/// uploaded by the client.
#[derive(Debug, Deserialize)]
pub struct ValidateSaveRequest {
    pub player_id: String,
    #[serde(default)]
    pub save_data: String,
}

/// Save validation response.
#[derive(Debug, Serialize)]
pub struct ValidateSaveResponse {
    pub valid: bool,
    pub reason: String,
}

impl From<SaveVerdict> for ValidateSaveResponse {
    fn from(verdict: SaveVerdict) -> Self {
        Self {
            valid: verdict.accepted,
            reason: verdict.reason,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Validate a Boss Rush score submission.
pub async fn validate_score(
    State(state): State<ValidationApiState>,
    Json(request): Json<ValidateScoreRequest>,
) -> Result<Json<ValidateScoreResponse>, StatusCode> {
    info!(
        player_id = %request.player_id,
        damage = request.submission.damage,
        waves = request.submission.waves,
        tier = request.submission.tier,
        client_timestamp = request.submission.timestamp,
        "validating score submission"
    );

    match state
        .score
        .validate_score(&request.player_id, &request.submission)
        .await
    {
        Ok(verdict) => Ok(Json(verdict.into())),
        Err(e) => {
            error!(player_id = %request.player_id, error = %e, "score validation failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Validate a cloud-save snapshot.
pub async fn validate_save(
    State(state): State<ValidationApiState>,
    Json(request): Json<ValidateSaveRequest>,
) -> Result<Json<ValidateSaveResponse>, StatusCode> {
    info!(player_id = %request.player_id, "validating cloud save");

    match state
        .save
        .validate_save(&request.player_id, &request.save_data)
        .await
    {
        Ok(verdict) => Ok(Json(verdict.into())),
        // An unparseable payload is a rejection, not a server fault.
        Err(failure @ ValidationFailure::MalformedPayload(_)) => {
            Ok(Json(ValidateSaveResponse {
                valid: false,
                reason: failure.to_string(),
            }))
        }
        Err(e) => {
            error!(player_id = %request.player_id, error = %e, "save validation failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

pub fn create_router(state: ValidationApiState) -> Router {
    Router::new()
        .route("/score", post(validate_score))
        .route("/save", post(validate_save))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::RejectReason;

    #[test]
    fn test_score_response_from_verdict() {
        let verdict = ScoreVerdict {
            accepted: true,
            reason: "Score passed all validation checks".to_string(),
            damage_per_wave: Some(1234),
        };
        let response: ValidateScoreResponse = verdict.into();
        assert!(response.valid);
        assert_eq!(response.damage_per_wave, Some(1234));
    }

    #[test]
    fn test_rejected_score_omits_damage_per_wave() {
        let verdict = ScoreVerdict {
            accepted: false,
            reason: RejectReason::TournamentClosed.to_string(),
            damage_per_wave: None,
        };
        let response: ValidateScoreResponse = verdict.into();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["valid"], false);
        assert!(json.get("damage_per_wave").is_none());
    }

    #[test]
    fn test_score_request_applies_submission_defaults() {
        let request: ValidateScoreRequest =
            serde_json::from_str(r#"{"player_id": "p1", "damage": 500, "waves": 5}"#).unwrap();
        assert_eq!(request.submission.damage, 500);
        assert_eq!(request.submission.tier, 1);
        assert_eq!(request.submission.timestamp, 0);
    }
}
