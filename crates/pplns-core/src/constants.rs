//! Pool constants. All time values in Unix seconds, all weights in difficulty units.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default retention window for partials: one day.
pub const DEFAULT_PPLNS_INTERVAL: u64 = 86_400;

/// Default pool reward time target: one day.
pub const DEFAULT_TIME_TARGET: u64 = 86_400;

/// Denominator for constants expressed in atto-units (10^-18).
pub const ATTO_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Default size calibration constant, in atto-units per difficulty per second.
///
/// 1088 atto = 1.088e-15.
pub const DEFAULT_SIZE_CONSTANT_ATTO: u64 = 1_088;

/// Fixed-point denominator for [`PplnsShare`](crate::types::PplnsShare).
pub const SHARE_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Divisor applied to the estimated size on the reduced-difficulty test network.
pub const TESTNET7_SIZE_DIVISOR: u64 = 14_680_000;

/// Derived metrics are recomputed on every Nth accepted partial per launcher.
pub const METRICS_UPDATE_INTERVAL: u64 = 5;

/// Bytes per GiB, for log output.
pub const GIB: u64 = 1 << 30;

/// Network the pool is farming on.
///
/// Only affects estimated size reporting: the reduced-difficulty test network
/// applies [`TESTNET7_SIZE_DIVISOR`].
///
/// # Examples
///
/// ```
/// use pplns_core::constants::NetworkType;
/// let net: NetworkType = "testnet7".parse().unwrap();
/// assert_eq!(net, NetworkType::Testnet7);
/// assert_eq!(net.size_divisor(), Some(14_680_000));
/// assert_eq!(NetworkType::default().size_divisor(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Production network.
    #[default]
    Mainnet,
    /// Reduced-difficulty test network.
    Testnet7,
}

impl NetworkType {
    /// Divisor correction for estimated size, if this network needs one.
    pub fn size_divisor(&self) -> Option<u64> {
        match self {
            Self::Mainnet => None,
            Self::Testnet7 => Some(TESTNET7_SIZE_DIVISOR),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet7 => "testnet7",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet7" => Ok(Self::Testnet7),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_parse_roundtrip() {
        for net in [NetworkType::Mainnet, NetworkType::Testnet7] {
            assert_eq!(net.as_str().parse::<NetworkType>().unwrap(), net);
        }
    }

    #[test]
    fn network_parse_case_insensitive() {
        assert_eq!("TestNet7".parse::<NetworkType>().unwrap(), NetworkType::Testnet7);
    }

    #[test]
    fn network_parse_unknown() {
        let err = "testnet10".parse::<NetworkType>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownNetwork("testnet10".into()));
    }

    #[test]
    fn network_serde_lowercase() {
        let json = serde_json::to_string(&NetworkType::Testnet7).unwrap();
        assert_eq!(json, "\"testnet7\"");
        let back: NetworkType = serde_json::from_str("\"mainnet\"").unwrap();
        assert_eq!(back, NetworkType::Mainnet);
    }

    #[test]
    fn precision_constants() {
        assert_eq!(ATTO_PRECISION, 10u128.pow(18));
        assert_eq!(SHARE_PRECISION, 10u128.pow(18));
        assert_eq!(GIB, 1_073_741_824);
    }
}
