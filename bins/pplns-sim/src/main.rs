//! PPLNS replay tool.
//!
//! Reads a JSON-lines file of partial submissions and a JSON object mapping
//! launcher ids to payout puzzle hashes, feeds them through a
//! [`ContributionTracker`] backed by an in-memory store, and prints the
//! resulting payout shares as JSON on stdout. The tracker's clock follows the
//! timestamp of each replayed partial.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{error, info};

use pplns_core::clock::{Clock, ManualClock};
use pplns_core::config::PoolConfig;
use pplns_core::constants::{DEFAULT_PPLNS_INTERVAL, DEFAULT_TIME_TARGET, NetworkType};
use pplns_core::types::{LauncherId, PayoutShares, PuzzleHash};
use pplns_pool::{ContributionTracker, MemoryStore};

/// CLI arguments for the replay tool.
#[derive(Debug, Parser)]
#[command(name = "pplns-sim")]
#[command(about = "Replay pool partials and print PPLNS payout shares", long_about = None)]
struct Args {
    /// JSON-lines file, one partial per line.
    #[arg(long)]
    partials: PathBuf,

    /// JSON object mapping launcher id (hex) to payout puzzle hash (hex).
    #[arg(long)]
    payouts: Option<PathBuf>,

    /// Retention window in seconds.
    #[arg(long, default_value_t = DEFAULT_PPLNS_INTERVAL)]
    pplns_interval: u64,

    /// Expected seconds between partials at difficulty 1.
    #[arg(long, default_value_t = DEFAULT_TIME_TARGET)]
    time_target: u64,

    /// Network the pool runs on (mainnet or testnet7).
    #[arg(long, default_value = "mainnet")]
    network: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json").
    #[arg(long, default_value = "text")]
    log_format: String,
}

/// One line of the partials file.
#[derive(Debug, Clone, Deserialize)]
struct PartialLine {
    launcher_id: LauncherId,
    timestamp: u64,
    difficulty: u64,
    #[serde(default)]
    error: Option<String>,
}

fn load_partials(path: &Path) -> Result<Vec<PartialLine>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read partials file {}", path.display()))?;
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: malformed partial", path.display(), i + 1))
        })
        .collect()
}

fn load_payouts(path: &Path) -> Result<HashMap<LauncherId, PuzzleHash>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read payouts file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{}: malformed payout instructions", path.display()))
}

/// Replay `partials` in file order and run one payout pass at the end.
async fn replay(
    config: PoolConfig,
    partials: Vec<PartialLine>,
    payouts: HashMap<LauncherId, PuzzleHash>,
) -> Result<PayoutShares> {
    let store = Arc::new(MemoryStore::new());
    for (launcher_id, puzzle_hash) in payouts {
        store.set_payout_instructions(launcher_id, puzzle_hash);
    }

    let start = partials.first().map(|p| p.timestamp).unwrap_or(0);
    let clock = Arc::new(ManualClock::new(start));
    let tracker = ContributionTracker::with_clock(store.clone(), config, clock.clone())
        .context("invalid pool configuration")?;

    let mut updates = 0u64;
    for line in &partials {
        // The clock never runs backwards, even if the file is out of order.
        if line.timestamp > clock.now() {
            clock.set(line.timestamp);
        }
        let metrics = tracker
            .ingest(
                line.launcher_id,
                line.timestamp,
                line.difficulty,
                line.error.as_deref(),
            )
            .await
            .with_context(|| format!("failed to ingest partial from {}", line.launcher_id))?;
        if metrics.is_some() {
            updates += 1;
        }
    }

    let shares = tracker
        .compute_payout_shares()
        .await
        .context("payout pass failed")?;
    info!(
        partials = partials.len(),
        updates,
        stored = store.partials().len(),
        total_points = shares.total_points,
        payable_points = shares.payable_points(),
        "pplns: replay complete"
    );
    Ok(shares)
}

async fn run(args: Args) -> Result<()> {
    let network: NetworkType = args.network.parse()?;
    let config = PoolConfig {
        pplns_interval: args.pplns_interval,
        time_target: args.time_target,
        network,
        ..PoolConfig::default()
    };

    let partials = load_partials(&args.partials)?;
    let payouts = match &args.payouts {
        Some(path) => load_payouts(path)?,
        None => HashMap::new(),
    };

    let shares = replay(config, partials, payouts).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&shares).context("failed to encode payout shares")?
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    if let Err(e) = run(args).await {
        error!("{e:#}");
        process::exit(1);
    }
}

/// Logs go to stderr so stdout carries only the JSON result.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
