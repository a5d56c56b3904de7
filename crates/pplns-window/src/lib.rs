//! # pplns-window: Windowed difficulty sums for PPLNS.
//!
//! All point and share calculations use integer arithmetic.
//!
//! - **Windowed sums**: [`WindowedSum`] keeps a launcher's partials in
//!   submission order with a running total, evicting from the front once a
//!   partial falls out of the retention window.
//! - **Shared cache**: [`AggregationCache`] holds one windowed sum per launcher
//!   plus a global one behind a single lock, and reports derived metrics to
//!   the store every [`METRICS_UPDATE_INTERVAL`] partials per launcher.
//! - **Derived metrics**: [`metrics`] turns windowed points into an estimated
//!   farm size and a PPLNS share.
//!
//! [`METRICS_UPDATE_INTERVAL`]: pplns_core::constants::METRICS_UPDATE_INTERVAL

pub mod cache;
pub mod interval;
pub mod metrics;

pub use cache::{AggregationCache, CacheGuard};
pub use interval::WindowedSum;
pub use metrics::{estimated_size, window_points};
