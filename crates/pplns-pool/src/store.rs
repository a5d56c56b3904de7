//! In-process partials store.
//!
//! Implements [`PartialsStore`] over plain collections behind a
//! [`parking_lot::RwLock`]. Keeps every partial (failed ones included), one
//! [`FarmerRecord`] per launcher, and a counter of metric updates. Used by the
//! replay tool and by tests; a production pool plugs in its database here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use pplns_core::error::StoreError;
use pplns_core::traits::PartialsStore;
use pplns_core::types::{LauncherId, PartialRecord, PplnsShare, PuzzleHash};

/// A partial as persisted, including its rejection reason if any.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredPartial {
    pub launcher_id: LauncherId,
    pub timestamp: u64,
    pub difficulty: u64,
    pub error: Option<String>,
}

/// Per-farmer data the pool keeps alongside partials.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FarmerRecord {
    pub payout_instructions: Option<PuzzleHash>,
    pub estimated_size: u64,
    pub points: u64,
    pub share: PplnsShare,
}

#[derive(Default)]
struct MemoryState {
    partials: Vec<StoredPartial>,
    farmers: HashMap<LauncherId, FarmerRecord>,
    metric_updates: u64,
}

/// Thread-safe in-memory [`PartialsStore`].
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a farmer's payout destination.
    pub fn set_payout_instructions(&self, launcher_id: LauncherId, puzzle_hash: PuzzleHash) {
        self.state
            .write()
            .farmers
            .entry(launcher_id)
            .or_default()
            .payout_instructions = Some(puzzle_hash);
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn farmer(&self, launcher_id: &LauncherId) -> Option<FarmerRecord> {
        self.state.read().farmers.get(launcher_id).cloned()
    }

    /// Every stored partial in insertion order.
    pub fn partials(&self) -> Vec<StoredPartial> {
        self.state.read().partials.clone()
    }

    /// Number of derived-metric updates received.
    pub fn metric_updates(&self) -> u64 {
        self.state.read().metric_updates
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl PartialsStore for MemoryStore {
    async fn get_recent_partials(&self, since: u64) -> Result<Vec<PartialRecord>, StoreError> {
        self.check_available()?;
        let mut records: Vec<PartialRecord> = self
            .state
            .read()
            .partials
            .iter()
            .filter(|p| p.error.is_none() && p.timestamp >= since)
            .map(|p| PartialRecord {
                launcher_id: p.launcher_id,
                timestamp: p.timestamp,
                difficulty: p.difficulty,
            })
            .collect();
        records.sort_by_key(|r| (r.launcher_id, r.timestamp));
        Ok(records)
    }

    async fn add_partial(
        &self,
        launcher_id: &LauncherId,
        timestamp: u64,
        difficulty: u64,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        self.state.write().partials.push(StoredPartial {
            launcher_id: *launcher_id,
            timestamp,
            difficulty,
            error: error.map(str::to_string),
        });
        Ok(())
    }

    async fn update_estimated_size_and_pplns(
        &self,
        launcher_id: &LauncherId,
        estimated_size: u64,
        points: u64,
        share: PplnsShare,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.state.write();
        let farmer = state.farmers.entry(*launcher_id).or_default();
        farmer.estimated_size = estimated_size;
        farmer.points = points;
        farmer.share = share;
        state.metric_updates += 1;
        Ok(())
    }

    async fn get_launcher_id_and_payout_instructions(
        &self,
    ) -> Result<HashMap<LauncherId, PuzzleHash>, StoreError> {
        self.check_available()?;
        Ok(self
            .state
            .read()
            .farmers
            .iter()
            .filter_map(|(id, f)| f.payout_instructions.map(|ph| (*id, ph)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pplns_core::types::Bytes32;

    fn lid(seed: u8) -> LauncherId {
        Bytes32([seed; 32])
    }

    #[tokio::test]
    async fn recent_partials_filtered_and_ordered() {
        let store = MemoryStore::new();
        store.add_partial(&lid(2), 30, 1, None).await.unwrap();
        store.add_partial(&lid(1), 20, 1, None).await.unwrap();
        store.add_partial(&lid(1), 5, 1, None).await.unwrap();
        store.add_partial(&lid(1), 25, 1, Some("stale")).await.unwrap();
        store.add_partial(&lid(2), 10, 1, None).await.unwrap();

        let recent = store.get_recent_partials(10).await.unwrap();
        let got: Vec<(u8, u64)> = recent
            .iter()
            .map(|r| (r.launcher_id.0[0], r.timestamp))
            .collect();
        assert_eq!(got, vec![(1, 20), (2, 10), (2, 30)]);
        assert_eq!(store.partials().len(), 5);
    }

    #[tokio::test]
    async fn metric_update_creates_farmer_record() {
        let store = MemoryStore::new();
        let share = PplnsShare::from_ratio(1, 2).unwrap();
        store
            .update_estimated_size_and_pplns(&lid(1), 1_000, 50, share)
            .await
            .unwrap();
        let farmer = store.farmer(&lid(1)).unwrap();
        assert_eq!(farmer.points, 50);
        assert_eq!(farmer.estimated_size, 1_000);
        assert_eq!(farmer.share, share);
        assert_eq!(farmer.payout_instructions, None);
        assert_eq!(store.metric_updates(), 1);
    }

    #[tokio::test]
    async fn payout_instructions_only_for_known_destinations() {
        let store = MemoryStore::new();
        store.set_payout_instructions(lid(1), Bytes32([0xaa; 32]));
        store
            .update_estimated_size_and_pplns(&lid(2), 0, 0, PplnsShare::ZERO)
            .await
            .unwrap();
        let map = store.get_launcher_id_and_payout_instructions().await.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&lid(1)), Some(&Bytes32([0xaa; 32])));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert_eq!(
            store.add_partial(&lid(1), 1, 1, None).await.unwrap_err(),
            StoreError::Unavailable
        );
        assert_eq!(
            store.get_recent_partials(0).await.unwrap_err(),
            StoreError::Unavailable
        );
        store.set_unavailable(false);
        assert!(store.add_partial(&lid(1), 1, 1, None).await.is_ok());
    }
}
