//! Error types for PPLNS partials tracking.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend: {0}")] Backend(String),
    #[error("store unavailable")] Unavailable,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("pplns_interval must be non-zero")] ZeroInterval,
    #[error("time_target must be non-zero")] ZeroTimeTarget,
    #[error("size_constant_atto must be non-zero")] ZeroSizeConstant,
    #[error("unknown network: {0}")] UnknownNetwork(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("invalid length: expected 32 bytes, got {0}")] InvalidLength(usize),
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error(transparent)] Store(#[from] StoreError),
    #[error(transparent)] Config(#[from] ConfigError),
}
