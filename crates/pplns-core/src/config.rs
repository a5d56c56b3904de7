//! Pool configuration consumed by the partials cache and tracker.
//!
//! [`PoolConfig`] is a plain value object. Reading it from the pool's config
//! file is the caller's job; missing fields fall back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_PPLNS_INTERVAL, DEFAULT_SIZE_CONSTANT_ATTO, DEFAULT_TIME_TARGET, NetworkType,
};
use crate::error::ConfigError;

/// Settings for windowed points and derived metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// How long partials are kept in the window, in seconds.
    pub pplns_interval: u64,
    /// Reward epoch length in seconds. Used for size estimation, and as a
    /// narrower summation window when it differs from `pplns_interval`.
    pub time_target: u64,
    /// Size calibration constant in atto-units (10^-18) per difficulty per second.
    pub size_constant_atto: u64,
    /// Network the pool farms on.
    pub network: NetworkType,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pplns_interval: DEFAULT_PPLNS_INTERVAL,
            time_target: DEFAULT_TIME_TARGET,
            size_constant_atto: DEFAULT_SIZE_CONSTANT_ATTO,
            network: NetworkType::Mainnet,
        }
    }
}

impl PoolConfig {
    /// Reject settings that would make window or size math meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pplns_interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.time_target == 0 {
            return Err(ConfigError::ZeroTimeTarget);
        }
        if self.size_constant_atto == 0 {
            return Err(ConfigError::ZeroSizeConstant);
        }
        Ok(())
    }

    /// Whether share math can use the full retained window directly.
    pub fn window_matches_time_target(&self) -> bool {
        self.pplns_interval == self.time_target
    }
}
