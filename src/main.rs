//! # Stock News Refresh
//!
//! A batch job that keeps per-company stock records current: it searches a
//! news discovery service for articles about each tracked company, scrapes a
//! representative image for every new article, pulls daily closing prices,
//! aligns a price to each article date, and upserts the merged record into a
//! CouchDB-compatible document store.
//!
//! ## Usage
//!
//! ```sh
//! DISCOVERY_API_KEY=... MARKET_DATA_API_KEY=... stock_news_refresh -c stocks.yaml
//! ```
//!
//! ## Architecture
//!
//! The job follows a pipeline architecture:
//! 1. **Targets**: Explicit `--company` list, or every company in the store
//! 2. **Discovery**: Query news per company (concurrent, all-settle)
//! 3. **Prices**: Refresh and trim closing prices for companies with new articles
//! 4. **Images**: Scrape new article pages for a representative image
//! 5. **Output**: Upsert each record; optionally write a JSON run snapshot

use std::error::Error;

use clap::Parser;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod articles;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod prices;
mod settle;
mod sources;
mod store;
mod updater;
mod utils;

use cli::Cli;
use config::Config;
use error::UpdateError;
use outputs::json::{RunSnapshot, write_snapshot};
use sources::{DiscoveryClient, HttpPageFetcher, MarketDataClient};
use store::CouchStore;
use updater::{StockUpdater, UpdaterSettings};
use utils::ensure_writable_dir;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("stock refresh starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(config = %args.config, companies = ?args.companies, json_output_dir = ?args.json_output_dir, "Parsed CLI arguments");

    // ---- Load & validate config ----
    let config = prepare(&args).await?;

    // ---- Collaborators ----
    let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    let updater = StockUpdater::new(
        UpdaterSettings::from(&config),
        DiscoveryClient::new(http.clone(), &config.discovery)?,
        MarketDataClient::new(http.clone(), &config.market_data)?,
        CouchStore::new(http.clone(), &config.store)?,
        HttpPageFetcher::new(http),
    );

    // ---- Run ----
    let report = match updater.run(args.target_companies()).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Refresh run failed");
            return Err(e.into());
        }
    };

    for failure in &report.failures {
        warn!(company = %failure.company, stage = ?failure.stage, error = %failure.error, "Company update degraded");
    }

    // ---- Snapshot output ----
    if let Some(dir) = &args.json_output_dir {
        let snapshot = RunSnapshot::now(&report);
        if let Err(e) = write_snapshot(&snapshot, dir).await {
            error!(error = %e, "Failed to write run snapshot");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        records = report.records.len(),
        failures = report.failures.len(),
        "Execution complete"
    );

    Ok(())
}

/// Load, override and validate the config, then check the snapshot directory.
///
/// The snapshot directory is only created once the config has been accepted.
#[instrument(level = "info", skip_all, fields(config = %args.config))]
async fn prepare(args: &Cli) -> Result<Config, UpdateError> {
    let mut config = Config::load(&args.config).await?;
    config.apply_overrides(args);
    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration rejected");
        return Err(e);
    }

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }
    Ok(config)
}
