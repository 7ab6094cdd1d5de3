//! In-memory trust store.
//!
//! Backs the service when PostgreSQL is disabled and doubles as the test
//! fake. Records are held the way the legacy backing store holds them —
//! as string-typed field maps — and round-trip through the record codec on
//! every access, so the storage encoding stays covered in-process.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

use super::{StoreError, TrustStore};
use crate::trust::TrustRecord;

#[derive(Debug, Default)]
pub struct MemoryTrustStore {
    players: DashMap<String, HashMap<String, String>>,
}

impl MemoryTrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of players with a stored record.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[async_trait]
impl TrustStore for MemoryTrustStore {
    async fn load(&self, player_id: &str) -> Result<TrustRecord, StoreError> {
        Ok(self
            .players
            .get(player_id)
            .map(|fields| TrustRecord::from_fields(&fields))
            .unwrap_or_default())
    }

    async fn save(&self, player_id: &str, record: &TrustRecord) -> Result<(), StoreError> {
        self.players
            .insert(player_id.to_string(), record.to_fields());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_unknown_player_loads_default() {
        let store = MemoryTrustStore::new();
        let record = store.load("nobody").await.unwrap();
        assert_eq!(record, TrustRecord::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let store = MemoryTrustStore::new();
        let record = TrustRecord {
            max_wave_reached: 42,
            window_submit_count: 2,
            last_score_submit: Some(Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap()),
            ..TrustRecord::default()
        };

        store.save("player_1", &record).await.unwrap();
        assert_eq!(store.load("player_1").await.unwrap(), record);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_save_replaces_whole_record() {
        let store = MemoryTrustStore::new();
        let first = TrustRecord {
            cheat_score: 4,
            ..TrustRecord::default()
        };
        store.save("player_1", &first).await.unwrap();

        let second = TrustRecord {
            max_wave_reached: 7,
            ..TrustRecord::default()
        };
        store.save("player_1", &second).await.unwrap();

        let loaded = store.load("player_1").await.unwrap();
        assert_eq!(loaded.cheat_score, 0);
        assert_eq!(loaded.max_wave_reached, 7);
    }
}
