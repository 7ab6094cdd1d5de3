//! Trust record persistence.
//!
//! Validators talk to an injected [`TrustStore`]; the concrete backend is
//! picked at startup (PostgreSQL when enabled, otherwise the in-memory
//! store). [`PlayerLocks`] serializes the read-evaluate-write cycle per
//! player so near-simultaneous submissions cannot both pass the pacing
//! checks against a stale read.

pub mod memory;
pub mod postgres;

pub use memory::MemoryTrustStore;
pub use postgres::PgTrustStore;

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::trust::TrustRecord;

/// Infrastructure failure reading or writing trust state. The request that
/// hit it has no observable effect on stored state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(detail) => write!(f, "trust store unavailable: {}", detail),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence boundary for [`TrustRecord`]s.
///
/// `load` returns a default record for unknown players; `save` replaces the
/// whole record in one call, so an update either fully applies or not at
/// all.
#[async_trait]
pub trait TrustStore: Send + Sync {
    async fn load(&self, player_id: &str) -> Result<TrustRecord, StoreError>;
    async fn save(&self, player_id: &str, record: &TrustRecord) -> Result<(), StoreError>;
}

/// Keyed async mutexes, one per player id. Different players never contend.
#[derive(Debug, Default)]
pub struct PlayerLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PlayerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for one player, creating it on first use.
    pub async fn acquire(&self, player_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(player_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}
