//! Data models for tracked companies, their news history, and price points.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Company`]: A configured company name and its market symbol
//! - [`Article`]: A news article found by the discovery service
//! - [`StockRecord`]: The persisted per-company aggregate
//! - [`PricePair`]: A transient (date, closing price) point used for alignment
//!
//! Persisted models use camelCase field names to match the documents already
//! stored in the database.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ticker assigned to companies that are not in the configured company list.
pub const UNRESOLVED_TICKER: &str = "not found";

/// Closing prices keyed by market-data date (`YYYY-MM-DD`).
pub type PriceHistory = BTreeMap<String, f64>;

/// A company the job knows how to look up.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Company {
    /// Display name, also used as the discovery query term.
    pub name: String,
    /// Market symbol used for price lookups.
    pub ticker: String,
}

/// A news article about a company.
///
/// Articles are unique by `url` within one company's history.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub url: String,
    pub title: String,
    /// Name of the publishing site.
    pub source: String,
    /// Publication date in the article date format (`MM/DD/YYYY`).
    pub date: String,
    /// Sentiment label reported by the discovery service.
    pub sentiment: String,
    /// Representative image scraped from the article page.
    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// The persisted aggregate for one company.
///
/// `history` is ordered most-recent-first and bounded by the configured
/// maximum. `price_history` holds only the dates the history needs after a
/// refresh.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    pub company: String,
    pub ticker: String,
    #[serde(default)]
    pub history: Vec<Article>,
    #[serde(default)]
    pub price_history: PriceHistory,
}

impl StockRecord {
    /// Create an empty record for a company seen for the first time.
    pub fn new(company: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            ticker: ticker.into(),
            history: Vec::new(),
            price_history: PriceHistory::new(),
        }
    }

    /// Whether the ticker was resolved against the configured company list.
    pub fn has_ticker(&self) -> bool {
        !self.ticker.is_empty() && self.ticker != UNRESOLVED_TICKER
    }
}

/// A single closing price on a market-data date.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePair {
    /// Date in the market-data format (`YYYY-MM-DD`).
    pub date: String,
    pub price: f64,
}

impl PricePair {
    pub fn new(date: impl Into<String>, price: f64) -> Self {
        Self {
            date: date.into(),
            price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_serialization_uses_image_url_key() {
        let article = Article {
            url: "https://example.com/a".to_string(),
            title: "Title".to_string(),
            source: "example.com".to_string(),
            date: "01/25/2018".to_string(),
            sentiment: "positive".to_string(),
            image_url: Some("https://example.com/a.png".to_string()),
        };

        let json = serde_json::to_string(&article).unwrap();
        assert!(json.contains(r#""imageURL":"https://example.com/a.png""#));
    }

    #[test]
    fn test_article_without_image_omits_key() {
        let article = Article {
            url: "https://example.com/a".to_string(),
            title: "Title".to_string(),
            source: "example.com".to_string(),
            date: "01/25/2018".to_string(),
            sentiment: "neutral".to_string(),
            image_url: None,
        };

        let json = serde_json::to_string(&article).unwrap();
        assert!(!json.contains("imageURL"));
    }

    #[test]
    fn test_stock_record_deserialization_ignores_store_metadata() {
        let json = r#"{
            "_id": "IBM",
            "_rev": "3-abc",
            "company": "IBM",
            "ticker": "IBM",
            "history": [],
            "priceHistory": {"2018-01-25": 12.5}
        }"#;

        let record: StockRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.company, "IBM");
        assert_eq!(record.price_history.get("2018-01-25"), Some(&12.5));
    }

    #[test]
    fn test_stock_record_missing_collections_default_empty() {
        let json = r#"{"company": "Acme", "ticker": "not found"}"#;
        let record: StockRecord = serde_json::from_str(json).unwrap();
        assert!(record.history.is_empty());
        assert!(record.price_history.is_empty());
        assert!(!record.has_ticker());
    }

    #[test]
    fn test_new_record_has_ticker() {
        let record = StockRecord::new("IBM", "IBM");
        assert!(record.has_ticker());
        assert!(record.history.is_empty());
    }
}
