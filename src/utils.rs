//! Utility functions for date conversion, string manipulation, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - Conversion between the article date format and the market-data date format
//! - String truncation for logging remote payloads
//! - File system validation for output directories

use chrono::NaiveDate;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::error::UpdateError;

/// Date format used by the market-data service for price keys.
pub const MARKET_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date format stored on articles.
pub const ARTICLE_DATE_FORMAT: &str = "%m/%d/%Y";

/// Parse a market-data date (`YYYY-MM-DD`).
pub fn parse_market_date(value: &str) -> Result<NaiveDate, UpdateError> {
    NaiveDate::parse_from_str(value, MARKET_DATE_FORMAT).map_err(|_| UpdateError::Date {
        value: value.to_string(),
        format: MARKET_DATE_FORMAT,
    })
}

/// Parse an article date (`MM/DD/YYYY`).
pub fn parse_article_date(value: &str) -> Result<NaiveDate, UpdateError> {
    NaiveDate::parse_from_str(value, ARTICLE_DATE_FORMAT).map_err(|_| UpdateError::Date {
        value: value.to_string(),
        format: ARTICLE_DATE_FORMAT,
    })
}

/// Convert an article date into the market-data key format.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(to_market_date("01/25/2018").unwrap(), "2018-01-25");
/// ```
pub fn to_market_date(article_date: &str) -> Result<String, UpdateError> {
    Ok(parse_article_date(article_date)?
        .format(MARKET_DATE_FORMAT)
        .to_string())
}

/// Convert a market-data date into the article date format.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(to_article_date("2018-01-25").unwrap(), "01/25/2018");
/// ```
pub fn to_article_date(market_date: &str) -> Result<String, UpdateError> {
    Ok(parse_market_date(market_date)?
        .format(ARTICLE_DATE_FORMAT)
        .to_string())
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and
/// byte count indicator appended. The cut is moved back to the nearest
/// character boundary.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), UpdateError> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    fs::File::create(&probe_path).await?;
    if let Err(e) = fs::remove_file(&probe_path).await {
        warn!(probe = %probe_path, error = %e, "Could not remove write probe");
    }
    info!("Output directory is writable");
    Ok(())
}
