//! # pplns-core
//! Foundation types and traits for PPLNS partials tracking.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PoolConfig;
pub use constants::NetworkType;
pub use error::{ConfigError, ParseError, PoolError, StoreError};
pub use traits::PartialsStore;
pub use types::{
    Bytes32, DerivedMetrics, LauncherId, Partial, PartialRecord, PayoutEntry, PayoutShares,
    PplnsShare, PuzzleHash,
};
