//! Per-player trust state: the persisted record and the ledger that drives
//! suspicion scoring and ban transitions.

pub mod ledger;
pub mod record;

pub use ledger::{BanStatus, SuspicionOutcome, TrustLedger, TrustPolicy, AUTO_BAN_REASON};
pub use record::{keys, BanState, CheatLogEntry, TrustRecord};
