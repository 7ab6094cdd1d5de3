//! Submission validation: tournament windows, the score rule pipeline and
//! cloud-save checks.

pub mod rules;
pub mod save;
pub mod score;
pub mod tournament;

pub use rules::{RejectReason, RuleOutcome};
pub use save::{SaveLimits, SaveSnapshot, SaveValidator, SaveVerdict};
pub use score::{ScoreLimits, ScoreSubmission, ScoreValidator, ScoreVerdict};
pub use tournament::{TournamentSchedule, TournamentWindow};

use crate::store::StoreError;

/// A validation operation that could not produce a verdict.
///
/// Rule rejections are ordinary verdicts; this type covers the two failure
/// modes outside the rules: input that does not parse, and trust-store
/// outages. Neither leaves any trace in stored state.
#[derive(Debug)]
pub enum ValidationFailure {
    /// The payload could not be parsed into the expected shape.
    MalformedPayload(serde_json::Error),
    /// Reading or writing the trust record failed.
    Store(StoreError),
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationFailure::MalformedPayload(e) => write!(f, "JSON parse error: {}", e),
            ValidationFailure::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ValidationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidationFailure::MalformedPayload(e) => Some(e),
            ValidationFailure::Store(e) => Some(e),
        }
    }
}

impl From<StoreError> for ValidationFailure {
    fn from(e: StoreError) -> Self {
        ValidationFailure::Store(e)
    }
}
