//! Error type shared by every stage of the refresh pipeline.

use thiserror::Error;

/// The error type for all fallible operations in this crate.
///
/// Only [`UpdateError::Config`], [`UpdateError::NoCompanies`] and a failed
/// store listing abort a run. Everything else is absorbed per company by the
/// updater and reported as a soft failure.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// A collaborator is missing required settings.
    #[error("not configured: {0}")]
    Config(String),

    /// Target resolution produced an empty company list.
    #[error("no companies to process")]
    NoCompanies,

    /// An error occurred during an HTTP request.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned an unsuccessful HTTP status code.
    #[error("Unexpected response status: {status} at {url}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The URL that returned the error.
        url: String,
    },

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The data received from a service was in an unexpected format or was missing a field.
    #[error("Data format unexpected or missing field: {0}")]
    Data(String),

    /// A date string did not match the expected format.
    #[error("invalid date {value:?}, expected format {format}")]
    Date {
        value: String,
        format: &'static str,
    },
}
