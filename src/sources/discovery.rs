//! News discovery client.
//!
//! Queries a Watson-Discovery-style news collection for a company name and
//! maps each enriched result onto an [`Article`].
//!
//! # Field Mapping
//!
//! | Result field | Article field |
//! |--------------|---------------|
//! | `url` | `url` |
//! | `title` | `title` |
//! | `host` | `source` |
//! | `crawl_date` (RFC 3339) | `date` (`MM/DD/YYYY`) |
//! | `enriched_text.sentiment.document.label` | `sentiment` |

use chrono::DateTime;
use itertools::Itertools;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::DiscoveryConfig;
use crate::error::UpdateError;
use crate::models::Article;
use crate::sources::success_text;
use crate::utils::{ARTICLE_DATE_FORMAT, to_article_date};

/// Sentiment used when the enrichment carries no label.
const DEFAULT_SENTIMENT: &str = "neutral";

/// A source of news articles about a company.
pub trait DiscoverySource {
    /// Articles mentioning `company`, without duplicate URLs.
    async fn query(&self, company: &str) -> Result<Vec<Article>, UpdateError>;
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    url: Option<String>,
    title: Option<String>,
    host: Option<String>,
    crawl_date: Option<String>,
    enriched_text: Option<EnrichedText>,
}

#[derive(Debug, Deserialize)]
struct EnrichedText {
    sentiment: Option<Sentiment>,
}

#[derive(Debug, Deserialize)]
struct Sentiment {
    document: Option<DocumentSentiment>,
}

#[derive(Debug, Deserialize)]
struct DocumentSentiment {
    label: Option<String>,
}

/// HTTP client for the discovery query endpoint.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    http: Client,
    endpoint: Url,
    api_key: String,
    version: String,
    count: u32,
}

impl DiscoveryClient {
    pub fn new(http: Client, config: &DiscoveryConfig) -> Result<Self, UpdateError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| UpdateError::Config("discovery.api_key is not set".to_string()))?;
        let endpoint = Url::parse(&format!(
            "{}/v1/environments/{}/collections/{}/query",
            config.url.trim_end_matches('/'),
            urlencoding::encode(&config.environment_id),
            urlencoding::encode(&config.collection_id),
        ))?;

        Ok(Self {
            http,
            endpoint,
            api_key,
            version: config.version.clone(),
            count: config.count,
        })
    }
}

impl DiscoverySource for DiscoveryClient {
    #[instrument(level = "info", skip(self))]
    async fn query(&self, company: &str) -> Result<Vec<Article>, UpdateError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("version", &self.version)
            .append_pair("query", company)
            .append_pair("count", &self.count.to_string());

        let resp = self
            .http
            .get(url)
            .basic_auth("apikey", Some(&self.api_key))
            .send()
            .await?;
        let body = success_text(resp).await?;
        let response: QueryResponse = serde_json::from_str(&body)?;

        let raw_count = response.results.len();
        let articles = parse_results(response);
        info!(raw = raw_count, kept = articles.len(), "Discovery query complete");
        Ok(articles)
    }
}

fn parse_results(response: QueryResponse) -> Vec<Article> {
    response
        .results
        .into_iter()
        .filter_map(|raw| {
            let url = raw.url.filter(|u| !u.trim().is_empty())?;
            let Some(date) = raw.crawl_date.as_deref().and_then(crawl_date_to_article_date) else {
                debug!(%url, crawl_date = ?raw.crawl_date, "Dropping result without usable date");
                return None;
            };
            let sentiment = raw
                .enriched_text
                .and_then(|e| e.sentiment)
                .and_then(|s| s.document)
                .and_then(|d| d.label)
                .unwrap_or_else(|| DEFAULT_SENTIMENT.to_string());

            Some(Article {
                url,
                title: raw.title.unwrap_or_default(),
                source: raw.host.unwrap_or_default(),
                date,
                sentiment,
                image_url: None,
            })
        })
        .unique_by(|a| a.url.clone())
        .collect()
}

// Crawl dates are RFC 3339; bare `YYYY-MM-DD` prefixes are accepted as well.
fn crawl_date_to_article_date(crawl_date: &str) -> Option<String> {
    match DateTime::parse_from_rfc3339(crawl_date) {
        Ok(dt) => Some(dt.date_naive().format(ARTICLE_DATE_FORMAT).to_string()),
        Err(_) => to_article_date(crawl_date.get(..10)?).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;

    fn body() -> String {
        r#"{
          "matching_results": 3,
          "results": [
            {
              "url": "https://news.example.com/ibm-1",
              "title": "IBM beats estimates",
              "host": "news.example.com",
              "crawl_date": "2018-01-25T14:03:00Z",
              "enriched_text": {"sentiment": {"document": {"label": "positive", "score": 0.7}}}
            },
            {
              "url": "https://news.example.com/ibm-1",
              "title": "IBM beats estimates (syndicated)",
              "host": "other.example.com",
              "crawl_date": "2018-01-25T15:00:00Z"
            },
            {
              "url": "https://news.example.com/ibm-2",
              "title": "IBM cloud",
              "host": "news.example.com",
              "crawl_date": "not a date"
            },
            {
              "title": "No url",
              "crawl_date": "2018-01-25T15:00:00Z"
            },
            {
              "url": "https://blog.example.com/ibm-3",
              "title": "Quiet day",
              "host": "blog.example.com",
              "crawl_date": "2018-01-26"
            }
          ]
        }"#
        .to_string()
    }

    fn config(url: String) -> DiscoveryConfig {
        DiscoveryConfig {
            url,
            api_key: Some("secret".to_string()),
            environment_id: "system".to_string(),
            collection_id: "news-en".to_string(),
            version: "2018-12-03".to_string(),
            count: 10,
        }
    }

    #[test]
    fn test_crawl_date_conversion() {
        assert_eq!(
            crawl_date_to_article_date("2018-01-25T23:59:00Z").as_deref(),
            Some("01/25/2018")
        );
        assert_eq!(
            crawl_date_to_article_date("2018-01-25").as_deref(),
            Some("01/25/2018")
        );
        assert_eq!(crawl_date_to_article_date("Jan 25"), None);
    }

    #[tokio::test]
    async fn test_query_maps_and_dedupes_results() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/environments/system/collections/news-en/query")
                .query_param("query", "IBM")
                .query_param("count", "10")
                .query_param("version", "2018-12-03")
                .header_exists("authorization");
            then.status(200)
                .header("content-type", "application/json")
                .body(body());
        });

        let client = DiscoveryClient::new(Client::new(), &config(server.base_url())).unwrap();
        let articles = client.query("IBM").await.unwrap();
        mock.assert();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].url, "https://news.example.com/ibm-1");
        assert_eq!(articles[0].title, "IBM beats estimates");
        assert_eq!(articles[0].source, "news.example.com");
        assert_eq!(articles[0].date, "01/25/2018");
        assert_eq!(articles[0].sentiment, "positive");
        assert_eq!(articles[1].sentiment, DEFAULT_SENTIMENT);
        assert_eq!(articles[1].date, "01/26/2018");
    }

    #[tokio::test]
    async fn test_query_status_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(401).body("unauthorized");
        });

        let client = DiscoveryClient::new(Client::new(), &config(server.base_url())).unwrap();
        match client.query("IBM").await {
            Err(UpdateError::Status { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_api_key() {
        let mut cfg = config("http://localhost".to_string());
        cfg.api_key = None;
        assert!(matches!(
            DiscoveryClient::new(Client::new(), &cfg),
            Err(UpdateError::Config(_))
        ));
    }
}
