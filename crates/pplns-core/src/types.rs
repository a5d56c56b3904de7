//! Core pool types: identifiers, partials, shares, and payout pass output.
//!
//! Timestamps are Unix seconds and difficulties are unsigned integers, both u64
//! per pool convention.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::SHARE_PRECISION;
use crate::error::ParseError;

/// A 32-byte identifier, rendered as lowercase hex.
///
/// Serializes as a hex string so that JSON records stay human readable.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(try_from = "String", into = "String")]
pub struct Bytes32(pub [u8; 32]);

/// Identifies a participant (a farmer's singleton launcher).
pub type LauncherId = Bytes32;

/// Payout destination for a participant.
pub type PuzzleHash = Bytes32;

impl Bytes32 {
    pub const ZERO: Self = Self([0u8; 32]);

    /// Lowercase hex encoding, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Bytes32 {
    type Err = ParseError;

    /// Parse 64 hex characters, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParseError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl TryFrom<String> for Bytes32 {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Bytes32> for String {
    fn from(b: Bytes32) -> Self {
        b.to_hex()
    }
}

impl From<[u8; 32]> for Bytes32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Bytes32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// One accepted partial: when it was submitted and the difficulty it carried.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Partial {
    pub timestamp: u64,
    pub difficulty: u64,
}

impl Partial {
    pub fn new(timestamp: u64, difficulty: u64) -> Self {
        Self {
            timestamp,
            difficulty,
        }
    }
}

impl From<(u64, u64)> for Partial {
    fn from((timestamp, difficulty): (u64, u64)) -> Self {
        Self::new(timestamp, difficulty)
    }
}

/// A partial keyed by the launcher that submitted it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartialRecord {
    pub launcher_id: LauncherId,
    pub timestamp: u64,
    pub difficulty: u64,
}

impl PartialRecord {
    pub fn partial(&self) -> Partial {
        Partial::new(self.timestamp, self.difficulty)
    }
}

/// A launcher's proportional share of the global windowed points.
///
/// Fixed-point with [`SHARE_PRECISION`] (10^18) as denominator. Computed by
/// integer division, so terminating fractions such as 25/100 are exact.
///
/// # Examples
///
/// ```
/// use pplns_core::types::PplnsShare;
/// let share = PplnsShare::from_ratio(25, 100).unwrap();
/// assert_eq!(share.parts(), 250_000_000_000_000_000);
/// assert_eq!(share.to_string(), "0.25000");
/// assert!(PplnsShare::from_ratio(1, 0).is_none());
/// ```
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct PplnsShare(u128);

impl PplnsShare {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(SHARE_PRECISION);

    /// `points / total` in fixed point. `None` when `total` is zero.
    pub fn from_ratio(points: u64, total: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }
        // u64::MAX * 10^18 < u128::MAX, so this cannot overflow.
        Some(Self(points as u128 * SHARE_PRECISION / total as u128))
    }

    /// Numerator over [`SHARE_PRECISION`].
    pub fn parts(&self) -> u128 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / SHARE_PRECISION as f64
    }
}

impl fmt::Display for PplnsShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Five decimals, truncated.
        let whole = self.0 / SHARE_PRECISION;
        let frac = (self.0 % SHARE_PRECISION) / 10u128.pow(13);
        write!(f, "{whole}.{frac:05}")
    }
}

/// Metrics derived from a launcher's windowed points and reported to the store.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerivedMetrics {
    pub launcher_id: LauncherId,
    /// Windowed points the metrics were derived from.
    pub points: u64,
    /// Estimated farm size in bytes.
    pub estimated_size: u64,
    pub share: PplnsShare,
}

/// One payable participant in a payout pass.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayoutEntry {
    pub points: u64,
    pub puzzle_hash: PuzzleHash,
}

/// Result of a payout pass: payable participants plus the global points total.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct PayoutShares {
    pub entries: Vec<PayoutEntry>,
    pub total_points: u64,
}

impl PayoutShares {
    /// Sum of points across payable entries. Less than `total_points` when
    /// participants were skipped for missing payout instructions.
    pub fn payable_points(&self) -> u64 {
        self.entries.iter().map(|e| e.points).sum()
    }
}
