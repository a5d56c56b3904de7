//! # pplns-pool: Partials tracking for a PPLNS pool.
//!
//! Composes the store and the windowed cache:
//! - [`tracker::ContributionTracker`]: hydration, ingestion, recent-partials
//!   queries, and the payout pass
//! - [`store::MemoryStore`]: in-process [`PartialsStore`] implementation
//!
//! [`PartialsStore`]: pplns_core::traits::PartialsStore

pub mod store;
pub mod tracker;

pub use store::{FarmerRecord, MemoryStore, StoredPartial};
pub use tracker::ContributionTracker;
