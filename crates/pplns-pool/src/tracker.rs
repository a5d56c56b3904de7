//! Partials tracker: the store plus the windowed cache.
//!
//! [`ContributionTracker`] is built once at startup and shared (behind an
//! `Arc`) with every submission handler and the payout job. Ingestion writes
//! to the store first and only then to the cache, so a crash in between
//! leaves the store ahead; [`ContributionTracker::hydrate`] rebuilds the
//! cache from the store on the next start.

use std::sync::Arc;

use tracing::{debug, error, info};

use pplns_core::clock::{Clock, SystemClock};
use pplns_core::config::PoolConfig;
use pplns_core::error::PoolError;
use pplns_core::traits::PartialsStore;
use pplns_core::types::{DerivedMetrics, LauncherId, Partial, PayoutEntry, PayoutShares};
use pplns_window::cache::AggregationCache;

/// Tracks partials per launcher and computes PPLNS payout input.
pub struct ContributionTracker {
    store: Arc<dyn PartialsStore>,
    cache: AggregationCache,
    clock: Arc<dyn Clock>,
}

impl ContributionTracker {
    /// Create a tracker reading wall-clock time.
    pub fn new(store: Arc<dyn PartialsStore>, config: PoolConfig) -> Result<Self, PoolError> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a tracker with an explicit time source.
    pub fn with_clock(
        store: Arc<dyn PartialsStore>,
        config: PoolConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        let cache = AggregationCache::new(Arc::clone(&store), config, Arc::clone(&clock));
        Ok(Self {
            store,
            cache,
            clock,
        })
    }

    pub fn config(&self) -> &PoolConfig {
        self.cache.config()
    }

    pub fn cache(&self) -> &AggregationCache {
        &self.cache
    }

    /// Fill the cache with the last `pplns_interval` seconds of partials.
    ///
    /// Must complete before ingestion starts. Returns the number of partials
    /// replayed.
    pub async fn hydrate(&self) -> Result<usize, PoolError> {
        let since = self
            .clock
            .now()
            .saturating_sub(self.config().pplns_interval);
        let records = self.store.get_recent_partials(since).await?;
        let replayed = self.cache.hydrate(records);

        let guard = self.cache.lock();
        info!(
            replayed,
            launchers = guard.len(),
            total_points = guard.all().points(),
            since,
            "partials: cache loaded from store"
        );
        Ok(replayed)
    }

    /// Record a partial submission.
    ///
    /// Every submission is persisted, including failed ones. Only successful
    /// partials (`error == None`) reach the cache. Returns the derived metrics
    /// if this partial triggered a metrics update.
    pub async fn ingest(
        &self,
        launcher_id: LauncherId,
        timestamp: u64,
        difficulty: u64,
        error: Option<&str>,
    ) -> Result<Option<DerivedMetrics>, PoolError> {
        self.store
            .add_partial(&launcher_id, timestamp, difficulty, error)
            .await?;

        if let Some(reason) = error {
            debug!(%launcher_id, timestamp, difficulty, reason, "partials: failed partial stored");
            return Ok(None);
        }

        let metrics = self
            .cache
            .add(launcher_id, Partial::new(timestamp, difficulty))
            .await?;
        Ok(metrics)
    }

    /// Up to `count` most recent partials for a launcher, newest first.
    ///
    /// Difficulty adjustment expects descending order. Expired partials are
    /// evicted first. Unknown launchers get an empty window created for them.
    pub fn recent_partials(&self, launcher_id: &LauncherId, count: usize) -> Vec<Partial> {
        let now = self.clock.now();
        let mut guard = self.cache.lock();
        let sum = guard.get_or_create(launcher_id);
        sum.evict_expired(now);
        sum.recent(count)
    }

    /// Points and payout destination for every launcher with points, plus the
    /// global total.
    ///
    /// The cache lock is held for the whole iteration so the entries and the
    /// total come from one consistent snapshot. Every window is swept to the
    /// current time first, so idle launchers do not keep expired points.
    /// Launchers without payout instructions are logged and left out.
    pub async fn compute_payout_shares(&self) -> Result<PayoutShares, PoolError> {
        let instructions = self.store.get_launcher_id_and_payout_instructions().await?;

        let now = self.clock.now();
        let mut guard = self.cache.lock();
        let evicted = guard.evict_expired(now);
        if evicted > 0 {
            debug!(evicted, now, "partials: swept idle launchers before payout pass");
        }
        let mut entries = Vec::new();
        for (launcher_id, sum) in guard.iter() {
            let points = sum.points();
            if points == 0 {
                continue;
            }
            let Some(puzzle_hash) = instructions.get(launcher_id) else {
                error!(
                    %launcher_id,
                    points,
                    "partials: did not find payout instructions; skipping launcher"
                );
                continue;
            };
            entries.push(PayoutEntry {
                points,
                puzzle_hash: *puzzle_hash,
            });
        }

        Ok(PayoutShares {
            entries,
            total_points: guard.all().points(),
        })
    }
}
