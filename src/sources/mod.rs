//! Clients for the external services a refresh run reads from.
//!
//! Each collaborator is a small trait so the updater can be driven by
//! in-memory doubles in tests, plus one HTTP implementation.
//!
//! | Concern | Module | Trait | HTTP client |
//! |---------|--------|-------|-------------|
//! | News search with sentiment | [`discovery`] | [`DiscoverySource`] | [`DiscoveryClient`] |
//! | Daily closing prices | [`market_data`] | [`MarketData`] | [`MarketDataClient`] |
//! | Article pages and images | [`images`] | [`PageFetcher`] | [`HttpPageFetcher`] |
//!
//! Failures are returned as [`UpdateError`]; deciding whether one is fatal is
//! left to the caller.

pub mod discovery;
pub mod images;
pub mod market_data;

pub use discovery::{DiscoveryClient, DiscoverySource};
pub use images::{HttpPageFetcher, PageFetcher};
pub use market_data::{MarketData, MarketDataClient};

use crate::error::UpdateError;
use crate::utils::truncate_for_log;
use tracing::debug;

/// Read a response body, turning non-2xx statuses into [`UpdateError::Status`].
pub(crate) async fn success_text(resp: reqwest::Response) -> Result<String, UpdateError> {
    let status = resp.status();
    let url = resp.url().to_string();
    if !status.is_success() {
        if let Ok(body) = resp.text().await {
            debug!(%url, status = status.as_u16(), body = %truncate_for_log(&body, 300), "Error response body");
        }
        return Err(UpdateError::Status {
            status: status.as_u16(),
            url,
        });
    }
    Ok(resp.text().await?)
}
