//! Command-line interface definitions for the stock refresh job.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials can be provided via command-line flags or environment variables.

use clap::Parser;

/// Command-line arguments for the stock refresh job.
///
/// # Examples
///
/// ```sh
/// # Refresh every company already in the store
/// stock_news_refresh -c stocks.yaml
///
/// # Refresh two companies and keep a JSON snapshot of the run
/// stock_news_refresh -c stocks.yaml --company IBM --company Apple -j ./runs
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "stocks.yaml")]
    pub config: String,

    /// Company to refresh (repeatable); defaults to every company in the store
    #[arg(long = "company")]
    pub companies: Vec<String>,

    /// Output directory for a JSON snapshot of the run
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Override the configured maximum articles per company
    #[arg(long)]
    pub max_history: Option<usize>,

    /// Discovery service API key
    #[arg(long, env = "DISCOVERY_API_KEY", hide_env_values = true)]
    pub discovery_api_key: Option<String>,

    /// Market data API key
    #[arg(long, env = "MARKET_DATA_API_KEY", hide_env_values = true)]
    pub market_data_api_key: Option<String>,

    /// Document store username
    #[arg(long, env = "STORE_USERNAME")]
    pub store_username: Option<String>,

    /// Document store password
    #[arg(long, env = "STORE_PASSWORD", hide_env_values = true)]
    pub store_password: Option<String>,
}

impl Cli {
    /// Explicit company list, or `None` to refresh everything in the store.
    pub fn target_companies(&self) -> Option<Vec<String>> {
        if self.companies.is_empty() {
            None
        } else {
            Some(self.companies.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["stock_news_refresh"]);
        assert_eq!(cli.config, "stocks.yaml");
        assert!(cli.json_output_dir.is_none());
        assert_eq!(cli.target_companies(), None);
    }

    #[test]
    fn test_cli_repeated_companies() {
        let cli = Cli::parse_from([
            "stock_news_refresh",
            "-c",
            "/etc/stocks.yaml",
            "--company",
            "IBM",
            "--company",
            "Apple",
            "-j",
            "/tmp/runs",
        ]);

        assert_eq!(cli.config, "/etc/stocks.yaml");
        assert_eq!(
            cli.target_companies(),
            Some(vec!["IBM".to_string(), "Apple".to_string()])
        );
        assert_eq!(cli.json_output_dir.as_deref(), Some("/tmp/runs"));
    }
}
