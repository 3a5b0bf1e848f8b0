//! Daily closing prices from an Alpha-Vantage-style market data API.
//!
//! `GET {url}/query?function=TIME_SERIES_DAILY&symbol=..&apikey=..` returns
//!
//! ```text
//! {
//!   "Meta Data": { ... },
//!   "Time Series (Daily)": {
//!     "2018-01-25": { "1. open": "...", "4. close": "12.0000", ... }
//!   }
//! }
//! ```
//!
//! Throttled or rejected calls come back as `200 OK` with an `"Error Message"`,
//! `"Note"` or `"Information"` key instead of the series.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::MarketDataConfig;
use crate::error::UpdateError;
use crate::models::PriceHistory;
use crate::sources::success_text;

/// A source of historical daily closing prices.
pub trait MarketData {
    /// Closing prices for `ticker`, keyed by `YYYY-MM-DD`.
    async fn price_history(&self, ticker: &str) -> Result<PriceHistory, UpdateError>;
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    series: Option<HashMap<String, DailyBar>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "4. close")]
    close: Option<String>,
}

/// HTTP client for the daily time series endpoint.
#[derive(Debug, Clone)]
pub struct MarketDataClient {
    http: Client,
    endpoint: Url,
    api_key: String,
    output_size: String,
}

impl MarketDataClient {
    pub fn new(http: Client, config: &MarketDataConfig) -> Result<Self, UpdateError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| UpdateError::Config("market_data.api_key is not set".to_string()))?;
        let endpoint = Url::parse(&format!("{}/query", config.url.trim_end_matches('/')))?;
        Ok(Self {
            http,
            endpoint,
            api_key,
            output_size: config.output_size.clone(),
        })
    }
}

impl MarketData for MarketDataClient {
    #[instrument(level = "info", skip(self))]
    async fn price_history(&self, ticker: &str) -> Result<PriceHistory, UpdateError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("function", "TIME_SERIES_DAILY")
            .append_pair("symbol", ticker)
            .append_pair("outputsize", &self.output_size)
            .append_pair("apikey", &self.api_key);

        let resp = self.http.get(url).send().await?;
        let body = success_text(resp).await?;
        let response: DailyResponse = serde_json::from_str(&body)?;
        let history = parse_daily(response)?;
        info!(points = history.len(), "Fetched price history");
        Ok(history)
    }
}

fn parse_daily(response: DailyResponse) -> Result<PriceHistory, UpdateError> {
    let Some(series) = response.series else {
        let reason = response
            .error_message
            .or(response.note)
            .or(response.information)
            .unwrap_or_else(|| "missing daily time series".to_string());
        return Err(UpdateError::Data(reason));
    };

    let mut history = PriceHistory::new();
    for (date, bar) in series {
        let Some(close) = bar.close else {
            warn!(%date, "Daily bar without close");
            continue;
        };
        match close.trim().parse::<f64>() {
            Ok(price) => {
                history.insert(date, price);
            }
            Err(e) => warn!(%date, %close, error = %e, "Unparseable close"),
        }
    }
    Ok(history)
}
