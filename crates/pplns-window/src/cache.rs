//! Shared partials cache: one [`WindowedSum`] per launcher plus a global one.
//!
//! A single [`parking_lot::Mutex`] guards the launcher map and every windowed
//! sum inside it, including the global sum. The lock is synchronous and is
//! never held across an `.await`: [`AggregationCache::add`] takes it for the
//! two insertions (and the points snapshot the metrics need), releases it,
//! and only then talks to the store. A slow store therefore never blocks
//! ingestion for other launchers.
//!
//! Callers that must see a consistent view across launchers (the payout pass)
//! take a [`CacheGuard`] via [`AggregationCache::lock`] and iterate under it.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use pplns_core::clock::Clock;
use pplns_core::config::PoolConfig;
use pplns_core::constants::{GIB, METRICS_UPDATE_INTERVAL};
use pplns_core::error::StoreError;
use pplns_core::traits::PartialsStore;
use pplns_core::types::{DerivedMetrics, LauncherId, Partial, PartialRecord};

use crate::interval::WindowedSum;
use crate::metrics;

struct CacheState {
    launchers: BTreeMap<LauncherId, WindowedSum>,
    all: WindowedSum,
}

/// Concurrent home for per-launcher and global windowed sums.
pub struct AggregationCache {
    state: Mutex<CacheState>,
    store: Arc<dyn PartialsStore>,
    clock: Arc<dyn Clock>,
    config: PoolConfig,
}

impl AggregationCache {
    /// Create an empty cache. `config` is assumed validated.
    pub fn new(store: Arc<dyn PartialsStore>, config: PoolConfig, clock: Arc<dyn Clock>) -> Self {
        let all = WindowedSum::new(config.pplns_interval);
        Self {
            state: Mutex::new(CacheState {
                launchers: BTreeMap::new(),
                all,
            }),
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Acquire the cache lock for a multi-step read.
    ///
    /// Do not hold the guard across an `.await`.
    pub fn lock(&self) -> CacheGuard<'_> {
        CacheGuard {
            state: self.state.lock(),
            keep_interval: self.config.pplns_interval,
        }
    }

    /// Global windowed points.
    pub fn total_points(&self) -> u64 {
        self.state.lock().all.points()
    }

    /// Rebuild windows from stored history without evicting.
    ///
    /// `records` must be ordered by timestamp within each launcher. The global
    /// sum is replayed in timestamp order across launchers so that its front
    /// stays the oldest partial. Returns the number of partials replayed.
    pub fn hydrate<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = PartialRecord>,
    {
        let mut records: Vec<PartialRecord> = records.into_iter().collect();
        let keep = self.config.pplns_interval;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        for record in &records {
            state
                .launchers
                .entry(record.launcher_id)
                .or_insert_with(|| WindowedSum::new(keep))
                .replay(record.partial());
        }
        // Stable sort keeps per-launcher order for equal timestamps.
        records.sort_by_key(|r| r.timestamp);
        for record in &records {
            state.all.replay(record.partial());
        }
        records.len()
    }

    /// Add an accepted partial for `launcher_id`.
    ///
    /// Every [`METRICS_UPDATE_INTERVAL`]th partial for a launcher recomputes
    /// its estimated size and PPLNS share and reports them to the store.
    /// Returns the reported metrics, if any were reported.
    pub async fn add(
        &self,
        launcher_id: LauncherId,
        partial: Partial,
    ) -> Result<Option<DerivedMetrics>, StoreError> {
        let now = self.clock.now();
        let snapshot = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let keep = self.config.pplns_interval;
            let sum = state
                .launchers
                .entry(launcher_id)
                .or_insert_with(|| WindowedSum::new(keep));
            let seq = sum.push(partial, now);
            let points = (seq % METRICS_UPDATE_INTERVAL == 0)
                .then(|| metrics::window_points(sum, &self.config, partial.timestamp));
            let before = state.all.len();
            state.all.push(partial, now);
            let evicted = before + 1 - state.all.len();
            if evicted > 0 {
                debug!(evicted, "pplns: expired partials evicted from global window");
            }
            points.map(|p| (p, state.all.points()))
        };

        let Some((points, total_points)) = snapshot else {
            return Ok(None);
        };

        let Some(metrics) = metrics::derive(launcher_id, points, total_points, &self.config) else {
            warn!(%launcher_id, points, "pplns: global points are zero, share undefined; skipping update");
            return Ok(None);
        };

        let size_gib = metrics.estimated_size as f64 / GIB as f64;
        info!(
            %launcher_id,
            points,
            estimated_size = metrics.estimated_size,
            share = %metrics.share,
            "pplns: updating farmer metrics ({size_gib:.3} GiB)"
        );
        self.store
            .update_estimated_size_and_pplns(&launcher_id, metrics.estimated_size, points, metrics.share)
            .await?;
        Ok(Some(metrics))
    }
}

/// Exclusive access to the cache contents.
///
/// Holds the cache lock until dropped. Not `Send`; keep it out of `.await`s.
pub struct CacheGuard<'a> {
    state: MutexGuard<'a, CacheState>,
    keep_interval: u64,
}

impl CacheGuard<'_> {
    /// Windowed sum for `launcher_id`, inserting an empty one if absent.
    ///
    /// This is a mutating read: an unknown launcher stays in the map
    /// afterwards, so repeated reads return the same (empty) entry and a
    /// later add finds it.
    pub fn get_or_create(&mut self, launcher_id: &LauncherId) -> &mut WindowedSum {
        let keep = self.keep_interval;
        self.state
            .launchers
            .entry(*launcher_id)
            .or_insert_with(|| WindowedSum::new(keep))
    }

    /// Windowed sum for `launcher_id` without inserting.
    pub fn get(&self, launcher_id: &LauncherId) -> Option<&WindowedSum> {
        self.state.launchers.get(launcher_id)
    }

    pub fn contains(&self, launcher_id: &LauncherId) -> bool {
        self.state.launchers.contains_key(launcher_id)
    }

    /// All launchers in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, LauncherId, WindowedSum> {
        self.state.launchers.iter()
    }

    /// Evict expired partials from every launcher and from the global sum.
    ///
    /// Launchers only evict on their own pushes, so an idle launcher keeps
    /// stale points until swept. Callers reading points across launchers
    /// sweep first. Returns the number of partials removed from launchers.
    pub fn evict_expired(&mut self, now: u64) -> usize {
        let state = &mut *self.state;
        state.all.evict_expired(now);
        state
            .launchers
            .values_mut()
            .map(|sum| sum.evict_expired(now))
            .sum()
    }

    /// The global windowed sum.
    pub fn all(&self) -> &WindowedSum {
        &self.state.all
    }

    pub fn len(&self) -> usize {
        self.state.launchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.launchers.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
