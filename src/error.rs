//! Error types for the socks-hunter crate.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while sourcing, validating and applying proxies.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A setting has a value that cannot be used.
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    /// No FOFA api key was configured.
    #[error("FOFA api key is missing (set fofa.api_key or SOCKS_HUNTER_FOFA_KEY)")]
    MissingApiKey,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with a non-success status.
    #[error("request failed with status: {0}")]
    UnexpectedStatus(reqwest::StatusCode),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// FOFA reported an error in the response body.
    #[error("FOFA error: {0}")]
    Fofa(String),

    /// FOFA rejected the api key.
    #[error("invalid FOFA api key: {0}")]
    InvalidApiKey(String),

    /// A candidate string is not a usable `host:port`.
    #[error("invalid candidate {input:?}: {reason}")]
    InvalidCandidate { input: String, reason: &'static str },

    /// The external proxy process could not be controlled.
    #[error("proxy process: {0}")]
    Process(String),
}
