//! Rule pipeline plumbing shared by the score and save validators.
//!
//! Each check is an independent predicate over its validator's context and
//! yields a [`RuleOutcome`]; the runner folds an ordered list of checks and
//! stops at the first rejection. Rejections carry a typed reason so tests
//! can assert on the exact rule that fired.

/// Result of evaluating a single validation rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Pass,
    Reject(RejectReason),
}

impl RuleOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, RuleOutcome::Pass)
    }
}

/// Why a submission was turned away.
///
/// The `Display` text is the player-facing reason string.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Zero or negative damage/wave count on a score submission.
    InvalidScoreInput,
    /// Damage beyond what the game can produce.
    DamageOverflow,
    /// Wave count beyond any survivable run.
    WavesImpossiblyHigh,
    /// Submitted again before the cooldown elapsed.
    SubmitTooFrequent { wait_secs: i64 },
    /// Per-tournament submission quota used up.
    QuotaExhausted { limit: u32 },
    /// Claimed waves exceed the player's recorded progression.
    ProgressionExceeded { max_wave: u32 },
    /// Damage per wave above the theoretical ceiling for the tier.
    DamageImplausible { tier: i32 },
    /// No tournament window is open right now.
    TournamentClosed,
    /// Save snapshot currency out of bounds.
    ArchiveTokensOutOfRange { value: i64 },
    /// Save snapshot fragment count out of bounds.
    FragmentsOutOfRange { value: i64 },
    /// Save snapshot permanent upgrade below zero.
    PermDamageNegative { value: i64 },
    /// Save snapshot lifetime wave count out of bounds.
    WaveCountOutOfRange { value: i64 },
    /// Lifetime waves incompatible with the account's age.
    ProgressionTooFast,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::InvalidScoreInput => write!(f, "Invalid damage or wave count"),
            RejectReason::DamageOverflow => {
                write!(f, "Damage exceeds maximum possible value")
            }
            RejectReason::WavesImpossiblyHigh => write!(f, "Wave count impossibly high"),
            RejectReason::SubmitTooFrequent { wait_secs } => write!(
                f,
                "Submission too frequent. Wait {} seconds between attempts.",
                wait_secs
            ),
            RejectReason::QuotaExhausted { limit } => {
                write!(f, "Maximum {} submissions per tournament reached", limit)
            }
            RejectReason::ProgressionExceeded { max_wave } => write!(
                f,
                "Wave count exceeds player progression (max: {})",
                max_wave
            ),
            RejectReason::DamageImplausible { tier } => {
                write!(f, "Damage per wave impossibly high for tier {}", tier)
            }
            RejectReason::TournamentClosed => write!(f, "Boss Rush not currently active"),
            RejectReason::ArchiveTokensOutOfRange { value } => {
                write!(f, "Invalid archive token value: {}", value)
            }
            RejectReason::FragmentsOutOfRange { value } => {
                write!(f, "Invalid fragments value: {}", value)
            }
            RejectReason::PermDamageNegative { value } => {
                write!(f, "Invalid permanent damage value: {}", value)
            }
            RejectReason::WaveCountOutOfRange { value } => {
                write!(f, "Invalid wave count: {}", value)
            }
            RejectReason::ProgressionTooFast => {
                write!(f, "Progression too fast for account age")
            }
        }
    }
}

impl std::error::Error for RejectReason {}

/// Runs rules in order and returns the first rejection, or `Pass` when all
/// rules accept.
pub(crate) fn first_rejection<C, F>(ctx: &C, rules: &[F]) -> RuleOutcome
where
    F: Fn(&C) -> RuleOutcome,
{
    for rule in rules {
        if let RuleOutcome::Reject(reason) = rule(ctx) {
            return RuleOutcome::Reject(reason);
        }
    }
    RuleOutcome::Pass
}
