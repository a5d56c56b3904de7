//! Trait interfaces for PPLNS partials tracking.
//!
//! - [`PartialsStore`]: durable storage of partials and farmer records
//!   (implemented by the pool's database layer; `pplns-pool` ships an
//!   in-memory implementation)

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{LauncherId, PartialRecord, PplnsShare, PuzzleHash};

/// Durable store for raw partials and per-farmer derived metrics.
///
/// The store is the source of truth; the in-memory cache is rebuilt from it
/// at startup. Timeouts and retries are the implementation's concern.
#[async_trait]
pub trait PartialsStore: Send + Sync {
    /// All successful partials with `timestamp >= since`, ordered by launcher
    /// and then by timestamp.
    async fn get_recent_partials(&self, since: u64) -> Result<Vec<PartialRecord>, StoreError>;

    /// Persist one partial. Called for every submission, including failed ones
    /// (`error` carries the rejection reason).
    async fn add_partial(
        &self,
        launcher_id: &LauncherId,
        timestamp: u64,
        difficulty: u64,
        error: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Record the latest derived metrics for a farmer.
    async fn update_estimated_size_and_pplns(
        &self,
        launcher_id: &LauncherId,
        estimated_size: u64,
        points: u64,
        share: PplnsShare,
    ) -> Result<(), StoreError>;

    /// Payout destination for every known farmer.
    async fn get_launcher_id_and_payout_instructions(
        &self,
    ) -> Result<HashMap<LauncherId, PuzzleHash>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bytes32;
    use std::sync::Mutex;

    // ------------------------------------------------------------------
    // Mock: PartialsStore
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MockStore {
        partials: Mutex<Vec<(PartialRecord, Option<String>)>>,
        fail_writes: bool,
    }

    #[async_trait]
    impl PartialsStore for MockStore {
        async fn get_recent_partials(&self, since: u64) -> Result<Vec<PartialRecord>, StoreError> {
            let partials = self.partials.lock().map_err(|e| StoreError::Backend(e.to_string()))?;
            Ok(partials
                .iter()
                .filter(|(r, err)| err.is_none() && r.timestamp >= since)
                .map(|(r, _)| *r)
                .collect())
        }

        async fn add_partial(
            &self,
            launcher_id: &LauncherId,
            timestamp: u64,
            difficulty: u64,
            error: Option<&str>,
        ) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::Unavailable);
            }
            let record = PartialRecord {
                launcher_id: *launcher_id,
                timestamp,
                difficulty,
            };
            self.partials
                .lock()
                .map_err(|e| StoreError::Backend(e.to_string()))?
                .push((record, error.map(str::to_string)));
            Ok(())
        }

        async fn update_estimated_size_and_pplns(
            &self,
            _launcher_id: &LauncherId,
            _estimated_size: u64,
            _points: u64,
            _share: PplnsShare,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get_launcher_id_and_payout_instructions(
            &self,
        ) -> Result<HashMap<LauncherId, PuzzleHash>, StoreError> {
            Ok(HashMap::new())
        }
    }

    #[tokio::test]
    async fn store_is_object_safe() {
        let store: Box<dyn PartialsStore> = Box::new(MockStore::default());
        let lid = Bytes32([1; 32]);
        store.add_partial(&lid, 10, 5, None).await.unwrap();
        store.add_partial(&lid, 11, 5, Some("invalid proof")).await.unwrap();
        let recent = store.get_recent_partials(0).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].timestamp, 10);
    }

    #[tokio::test]
    async fn store_errors_surface() {
        let store = MockStore {
            fail_writes: true,
            ..MockStore::default()
        };
        let err = store.add_partial(&Bytes32::ZERO, 1, 1, None).await.unwrap_err();
        assert_eq!(err, StoreError::Unavailable);
    }
}
