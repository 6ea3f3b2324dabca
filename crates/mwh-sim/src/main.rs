//! mwh-sim - Scenario Runner
//!
//! Replays a JSON scenario of page events against a media coordinator and
//! prints the state after every step.

mod host;
mod scenario;
mod sim;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: mwh-sim <scenario.json>")?;

    tracing::info!(path = %path.display(), "Starting scenario");

    let scenario = Scenario::load(&path)?;
    let reports = sim::run(&scenario)?;

    let json = serde_json::to_string_pretty(&reports).context("serializing reports")?;
    println!("{json}");

    Ok(())
}
