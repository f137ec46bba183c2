//! Long/Short Portfolio Example
//!
//! Loads asset data and a covariance table from tab-delimited files, builds
//! the cardinality-constrained mean-variance model, solves it with Clarabel
//! branch-and-bound and prints the resulting allocation.
//!
//! ```text
//! cargo run --example long_short [assets.tsv covariance.tsv]
//! ```
//!
//! Set `RUST_LOG=mvportfolio=debug` to follow the solve.

use std::path::PathBuf;
use std::time::Duration;

use mvportfolio::data::load_universe;
use mvportfolio::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/data");
    let mut args = std::env::args().skip(1);
    let assets_path = args.next().map_or_else(|| data_dir.join("assets.tsv"), PathBuf::from);
    let covariance_path = args
        .next()
        .map_or_else(|| data_dir.join("covariance.tsv"), PathBuf::from);

    println!("=== Long/Short Portfolio ===\n");

    let universe = load_universe(&assets_path, &covariance_path)?;
    println!("Universe: {} assets", universe.len());

    // At most 4 names, at least 20% long and 10% short.
    let config = ModelConfig::default()
        .with_risk_aversion(0.5)
        .with_cardinality(4)
        .with_net_long(0.2, 1.0)
        .with_net_short(0.1, 1.0);
    println!(
        "Risk aversion: {}, cardinality: {}\n",
        config.risk_aversion, config.cardinality
    );

    let options = SolveOptions::default().with_time_limit(Duration::from_secs(60));
    let outcome = optimize(
        &universe,
        config,
        &ClarabelSolver::new(),
        &options,
        AnalysisConfig::default(),
    )?;

    match outcome {
        PortfolioOutcome::Solved(report) => println!("{}", report),
        PortfolioOutcome::Unsolved(status) => println!("No portfolio: solver status {}", status),
    }

    Ok(())
}
