//! YAML configuration for the refresh job.
//!
//! ```yaml
//! max_history: 50
//! companies:
//!   - name: IBM
//!     ticker: IBM
//! discovery:
//!   url: https://discovery.example.com
//!   environment_id: system
//!   collection_id: news-en
//! market_data:
//!   url: https://www.alphavantage.co
//! store:
//!   url: https://couch.example.com
//!   database: stocks
//! ```
//!
//! API keys and store credentials are normally supplied through the
//! environment (see [`crate::cli::Cli`]) and merged in with
//! [`Config::apply_overrides`].

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, instrument};

use crate::cli::Cli;
use crate::error::UpdateError;
use crate::models::Company;

fn default_max_history() -> usize {
    50
}

fn default_image_concurrency() -> usize {
    8
}

fn default_discovery_version() -> String {
    "2018-12-03".to_string()
}

fn default_discovery_count() -> u32 {
    50
}

fn default_output_size() -> String {
    "compact".to_string()
}

/// Top-level job configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Maximum number of articles kept per company.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Page fetches in flight at once while resolving article images.
    #[serde(default = "default_image_concurrency")]
    pub image_concurrency: usize,
    /// Static company list used for ticker lookup.
    #[serde(default)]
    pub companies: Vec<Company>,
    pub discovery: DiscoveryConfig,
    pub market_data: MarketDataConfig,
    pub store: StoreConfig,
}

/// Connection settings for the news discovery service.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub environment_id: String,
    #[serde(default)]
    pub collection_id: String,
    #[serde(default = "default_discovery_version")]
    pub version: String,
    /// Number of results requested per query.
    #[serde(default = "default_discovery_count")]
    pub count: u32,
}

/// Connection settings for the daily price service.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MarketDataConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// `compact` (last 100 closes) or `full`.
    #[serde(default = "default_output_size")]
    pub output_size: String,
}

/// Connection settings for the document database.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Config {
    /// Read and parse a YAML config file.
    #[instrument(level = "info")]
    pub async fn load(path: &str) -> Result<Self, UpdateError> {
        let text = fs::read_to_string(path).await?;
        let config = Self::from_yaml(&text)?;
        info!(
            companies = config.companies.len(),
            max_history = config.max_history,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, UpdateError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Layer command-line and environment values over the file values.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(key) = &cli.discovery_api_key {
            self.discovery.api_key = Some(key.clone());
        }
        if let Some(key) = &cli.market_data_api_key {
            self.market_data.api_key = Some(key.clone());
        }
        if let Some(user) = &cli.store_username {
            self.store.username = Some(user.clone());
        }
        if let Some(password) = &cli.store_password {
            self.store.password = Some(password.clone());
        }
        if let Some(max) = cli.max_history {
            self.max_history = max;
        }
    }

    /// Reject settings that would make every collaborator call fail.
    pub fn validate(&self) -> Result<(), UpdateError> {
        fn require(value: &str, what: &str) -> Result<(), UpdateError> {
            if value.trim().is_empty() {
                return Err(UpdateError::Config(format!("{what} is not set")));
            }
            Ok(())
        }

        require(&self.discovery.url, "discovery.url")?;
        require(&self.discovery.environment_id, "discovery.environment_id")?;
        require(&self.discovery.collection_id, "discovery.collection_id")?;
        require(
            self.discovery.api_key.as_deref().unwrap_or_default(),
            "discovery.api_key",
        )?;
        require(&self.market_data.url, "market_data.url")?;
        require(
            self.market_data.api_key.as_deref().unwrap_or_default(),
            "market_data.api_key",
        )?;
        require(&self.store.url, "store.url")?;
        require(&self.store.database, "store.database")?;

        if self.max_history == 0 {
            return Err(UpdateError::Config("max_history must be at least 1".to_string()));
        }
        if self.image_concurrency == 0 {
            return Err(UpdateError::Config(
                "image_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
