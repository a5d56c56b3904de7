//! Windowed sum of partial difficulties.
//!
//! A [`WindowedSum`] holds one launcher's (or the whole pool's) partials in a
//! [`VecDeque`] ordered by timestamp, together with a running `points` total.
//!
//! # Design
//!
//! Partials arrive in non-decreasing timestamp order, so eviction only has to
//! look at the front of the deque: every partial older than
//! `now - keep_interval` is popped and its difficulty subtracted, stopping at
//! the first one still inside the window. Out-of-order input is a caller
//! contract violation and is not checked.
//!
//! Two insertion modes exist:
//! - [`WindowedSum::push`] for live traffic, which evicts after appending.
//! - [`WindowedSum::replay`] for startup hydration from the store, which never
//!   evicts so replayed history is not dropped against the wall clock.

use std::collections::VecDeque;
use std::fmt;

use pplns_core::types::Partial;

/// Partials inside the retention window and the sum of their difficulties.
#[derive(Clone, PartialEq, Eq)]
pub struct WindowedSum {
    partials: VecDeque<Partial>,
    points: u64,
    additions: u64,
    keep_interval: u64,
}

impl WindowedSum {
    /// Create an empty sum retaining partials for `keep_interval` seconds.
    pub fn new(keep_interval: u64) -> Self {
        Self {
            partials: VecDeque::new(),
            points: 0,
            additions: 0,
            keep_interval,
        }
    }

    /// Append a live partial and evict everything older than
    /// `now - keep_interval`.
    ///
    /// Returns the sequence number of this insertion, starting at 1 for the
    /// first partial ever added.
    pub fn push(&mut self, partial: Partial, now: u64) -> u64 {
        let seq = self.append(partial);
        self.evict_expired(now);
        seq
    }

    /// Append a historical partial without evicting. Used only when
    /// rebuilding the window from the store.
    pub fn replay(&mut self, partial: Partial) -> u64 {
        self.append(partial)
    }

    fn append(&mut self, partial: Partial) -> u64 {
        self.partials.push_back(partial);
        self.points = self.points.saturating_add(partial.difficulty);
        self.additions += 1;
        self.additions
    }

    /// Drop partials with `timestamp < now - keep_interval` from the front.
    ///
    /// Returns the number of partials removed.
    pub fn evict_expired(&mut self, now: u64) -> usize {
        let cutoff = now.saturating_sub(self.keep_interval);
        let mut removed = 0;
        while let Some(front) = self.partials.front() {
            if front.timestamp >= cutoff {
                break;
            }
            self.points = self.points.saturating_sub(front.difficulty);
            self.partials.pop_front();
            removed += 1;
        }
        removed
    }

    /// Sum of difficulties with `timestamp >= reference - window`.
    ///
    /// Lets share math use a narrower window than the one retained.
    pub fn points_in_window(&self, reference: u64, window: u64) -> u64 {
        let since = reference.saturating_sub(window);
        self.partials
            .iter()
            .rev()
            .take_while(|p| p.timestamp >= since)
            .map(|p| p.difficulty)
            .sum()
    }

    /// Up to `count` most recent partials, newest first.
    pub fn recent(&self, count: usize) -> Vec<Partial> {
        self.partials.iter().rev().take(count).copied().collect()
    }

    /// Sum of difficulties currently retained.
    pub fn points(&self) -> u64 {
        self.points
    }

    /// Number of partials ever added (live or replayed).
    pub fn additions(&self) -> u64 {
        self.additions
    }

    pub fn keep_interval(&self) -> u64 {
        self.keep_interval
    }

    pub fn len(&self) -> usize {
        self.partials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    /// Retained partials, oldest first.
    pub fn partials(&self) -> &VecDeque<Partial> {
        &self.partials
    }
}

impl fmt::Debug for WindowedSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowedSum")
            .field("points", &self.points)
            .field("len", &self.partials.len())
            .field("additions", &self.additions)
            .field("keep_interval", &self.keep_interval)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(timestamp: u64, difficulty: u64) -> Partial {
        Partial::new(timestamp, difficulty)
    }

    #[test]
    fn empty_sum() {
        let mut ws = WindowedSum::new(100);
        assert_eq!(ws.points(), 0);
        assert!(ws.is_empty());
        assert_eq!(ws.evict_expired(1_000), 0);
        assert_eq!(ws.points_in_window(1_000, 10), 0);
        assert!(ws.recent(5).is_empty());
    }

    #[test]
    fn sequence_starts_at_one_and_increases() {
        let mut ws = WindowedSum::new(100);
        assert_eq!(ws.push(p(1, 1), 1), 1);
        assert_eq!(ws.push(p(2, 1), 2), 2);
        assert_eq!(ws.replay(p(3, 1)), 3);
        assert_eq!(ws.additions(), 3);
    }

    #[test]
    fn counter_survives_eviction() {
        let mut ws = WindowedSum::new(10);
        ws.push(p(0, 5), 0);
        ws.push(p(1, 5), 1);
        // Both expire here, but the counter keeps counting.
        assert_eq!(ws.push(p(100, 5), 100), 3);
        assert_eq!(ws.len(), 1);
        assert_eq!(ws.points(), 5);
    }

    /// Retention 100s: three partials at 0, 50, 90 stay at now=95 (cutoff
    /// clamps to 0); at now=150 only t=0 is strictly older than the cutoff.
    #[test]
    fn eviction_boundary_is_inclusive() {
        let mut ws = WindowedSum::new(100);
        ws.push(p(0, 10), 95);
        ws.push(p(50, 20), 95);
        ws.push(p(90, 5), 95);
        assert_eq!(ws.points(), 35);

        assert_eq!(ws.evict_expired(150), 1);
        assert_eq!(ws.points(), 25);
        assert_eq!(ws.partials().front(), Some(&p(50, 20)));
    }

    #[test]
    fn push_evicts_after_append() {
        let mut ws = WindowedSum::new(100);
        ws.push(p(0, 10), 0);
        ws.push(p(50, 20), 50);
        ws.push(p(151, 1), 151);
        // cutoff = 51 removes t=0 and t=50.
        assert_eq!(ws.points(), 1);
        assert_eq!(ws.len(), 1);
    }

    #[test]
    fn replay_never_evicts() {
        let mut ws = WindowedSum::new(10);
        ws.replay(p(0, 1));
        ws.replay(p(1_000, 1));
        assert_eq!(ws.len(), 2);
        assert_eq!(ws.points(), 2);
        // The next live push catches up.
        ws.push(p(1_001, 1), 1_001);
        assert_eq!(ws.len(), 2);
        assert_eq!(ws.points(), 2);
    }

    #[test]
    fn points_in_window_subrange() {
        let mut ws = WindowedSum::new(1_000);
        for (t, d) in [(10, 1), (20, 2), (30, 4), (40, 8)] {
            ws.push(p(t, d), t);
        }
        assert_eq!(ws.points_in_window(40, 10), 12);
        assert_eq!(ws.points_in_window(40, 20), 14);
        assert_eq!(ws.points_in_window(40, 1_000), 15);
        assert_eq!(ws.points_in_window(100, 10), 0);
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let mut ws = WindowedSum::new(100);
        for (t, d) in [(1, 5), (2, 7), (3, 9)] {
            ws.push(p(t, d), t);
        }
        assert_eq!(ws.recent(2), vec![p(3, 9), p(2, 7)]);
        assert_eq!(ws.recent(10).len(), 3);
        assert!(ws.recent(0).is_empty());
    }

    #[test]
    fn debug_shows_points() {
        let mut ws = WindowedSum::new(100);
        ws.push(p(1, 42), 1);
        let s = format!("{ws:?}");
        assert!(s.contains("points: 42"), "{s}");
    }

    fn sorted_partials() -> impl Strategy<Value = Vec<(u64, u64)>> {
        prop::collection::vec((0u64..50, 0u64..1_000), 0..200).prop_map(|steps| {
            let mut t = 0u64;
            steps
                .into_iter()
                .map(|(dt, d)| {
                    t += dt;
                    (t, d)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn points_match_retained_sum(
            partials in sorted_partials(),
            keep in 1u64..500,
        ) {
            let mut ws = WindowedSum::new(keep);
            for (i, &(t, d)) in partials.iter().enumerate() {
                ws.push(p(t, d), t);
                let cutoff = t.saturating_sub(keep);
                let expected: u64 = partials[..=i]
                    .iter()
                    .filter(|(ts, _)| *ts >= cutoff)
                    .map(|(_, d)| d)
                    .sum();
                prop_assert_eq!(ws.points(), expected);
                prop_assert!(ws.partials().iter().all(|p| p.timestamp >= cutoff));
            }
        }

        #[test]
        fn points_in_window_never_exceeds_points(
            partials in sorted_partials(),
            keep in 1u64..500,
            window in 0u64..1_000,
        ) {
            let mut ws = WindowedSum::new(keep);
            for &(t, d) in &partials {
                ws.push(p(t, d), t);
            }
            let reference = partials.last().map(|(t, _)| *t).unwrap_or(0);
            prop_assert!(ws.points_in_window(reference, window) <= ws.points());
        }
    }
}
