//! JSON snapshot of a refresh run.
//!
//! # Output Structure
//!
//! Files are organized by date; a later run on the same day replaces the
//! earlier snapshot:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     └── stocks.json
//! ```

use chrono::Local;
use serde::Serialize;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::error::UpdateError;
use crate::models::StockRecord;
use crate::updater::{CompanyFailure, UpdateReport};

/// What a snapshot file contains.
#[derive(Debug, Serialize)]
pub struct RunSnapshot<'a> {
    /// The date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// The local time the snapshot was taken.
    pub local_time: String,
    pub records: &'a [StockRecord],
    pub failures: &'a [CompanyFailure],
}

impl<'a> RunSnapshot<'a> {
    pub fn now(report: &'a UpdateReport) -> Self {
        let now = Local::now();
        Self {
            local_date: now.date_naive().to_string(),
            local_time: now.time().format("%H:%M:%S").to_string(),
            records: &report.records,
            failures: &report.failures,
        }
    }
}

/// Write `snapshot` to `{json_output_dir}/{local_date}/stocks.json`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_snapshot(
    snapshot: &RunSnapshot<'_>,
    json_output_dir: &str,
) -> Result<String, UpdateError> {
    let json = serde_json::to_string_pretty(snapshot)?;

    let full_json_dir = format!(
        "{}/{}",
        json_output_dir.trim_end_matches('/'),
        snapshot.local_date
    );
    info!(%full_json_dir, "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(%full_json_dir, error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let output_json_filename = format!("{}/stocks.json", full_json_dir);
    fs::write(&output_json_filename, json).await?;
    info!(path = %output_json_filename, records = snapshot.records.len(), "Wrote run snapshot");

    Ok(output_json_filename)
}
