//! Playguard — server-side gameplay claim validation and player trust.
//!
//! Adjudicates client-submitted gameplay claims (Boss Rush leaderboard
//! scores, cloud-save snapshots) against server-held trust records, and
//! maintains a per-player suspicion score with automatic ban escalation.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Environment-driven configuration
//! ├── clock.rs       - Injected time source
//! ├── validation/    - Submission validation
//! │   ├── rules.rs      - Rule outcomes, reject reasons, pipeline runner
//! │   ├── tournament.rs - Tournament window calculator
//! │   ├── score.rs      - Boss Rush score pipeline
//! │   └── save.rs       - Cloud-save snapshot checks
//! ├── trust/         - Per-player trust state
//! │   ├── record.rs  - Trust record + string-field storage codec
//! │   └── ledger.rs  - Suspicion scoring & ban state machine
//! ├── store/         - Trust record persistence
//! │   ├── memory.rs  - In-memory store (fallback + test fake)
//! │   └── postgres.rs - PostgreSQL store (sqlx)
//! └── api/           - HTTP endpoints & transport middleware
//! ```

pub mod api;
pub mod clock;
pub mod config;
pub mod store;
pub mod trust;
pub mod validation;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GuardConfig;
pub use store::{MemoryTrustStore, PgTrustStore, PlayerLocks, StoreError, TrustStore};
pub use trust::{
    BanState, BanStatus, CheatLogEntry, SuspicionOutcome, TrustLedger, TrustPolicy, TrustRecord,
    AUTO_BAN_REASON,
};
pub use validation::{
    RejectReason, RuleOutcome, SaveLimits, SaveSnapshot, SaveValidator, SaveVerdict, ScoreLimits,
    ScoreSubmission, ScoreValidator, ScoreVerdict, TournamentSchedule, TournamentWindow,
    ValidationFailure,
};

// Re-export API types
pub use api::{
    create_trust_router, create_validation_router, SecurityConfig, SecurityState, TrustApiState,
    ValidationApiState,
};
