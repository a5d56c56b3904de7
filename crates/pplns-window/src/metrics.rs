//! Derived metrics: windowed points, estimated farm size, and PPLNS share.
//!
//! Integer arithmetic with u128 intermediates. The size calibration constant
//! is carried in atto-units so `points / (time_target * 1.088e-15)` becomes
//! `points * 10^18 / (time_target * 1088)`.

use pplns_core::config::PoolConfig;
use pplns_core::constants::ATTO_PRECISION;
use pplns_core::types::{DerivedMetrics, LauncherId, PplnsShare};

use crate::interval::WindowedSum;

/// Points used for share and size math.
///
/// When the retention window equals the time target the running total is
/// used as is. Otherwise only partials within `time_target` seconds of
/// `reference` count.
pub fn window_points(sum: &WindowedSum, config: &PoolConfig, reference: u64) -> u64 {
    if config.window_matches_time_target() {
        sum.points()
    } else {
        sum.points_in_window(reference, config.time_target)
    }
}

/// Estimated farm size in bytes for `points` earned over `time_target` seconds.
///
/// Returns 0 if the denominator is zero. Saturates at `u64::MAX`.
pub fn estimated_size(points: u64, config: &PoolConfig) -> u64 {
    let denom = (config.time_target as u128) * (config.size_constant_atto as u128);
    if denom == 0 {
        return 0;
    }
    // u64::MAX * 10^18 fits in u128.
    let mut size = points as u128 * ATTO_PRECISION / denom;
    if let Some(divisor) = config.network.size_divisor() {
        size /= divisor as u128;
    }
    u64::try_from(size).unwrap_or(u64::MAX)
}

/// Full metric set for a launcher, or `None` while the global total is zero.
pub fn derive(
    launcher_id: LauncherId,
    points: u64,
    total_points: u64,
    config: &PoolConfig,
) -> Option<DerivedMetrics> {
    let share = PplnsShare::from_ratio(points, total_points)?;
    Some(DerivedMetrics {
        launcher_id,
        points,
        estimated_size: estimated_size(points, config),
        share,
    })
}
