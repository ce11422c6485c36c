//! Paper-Harvest: a conference archive crawler and paper annotator
//!
//! This crate walks a proceedings archive organized by year, downloads each
//! paper's PDF and records its metadata in a CSV file. A second pass reads that
//! CSV, scrapes an abstract per paper and asks a classification service to
//! assign every paper to one of a fixed set of categories.

pub mod annotate;
pub mod config;
pub mod crawler;
pub mod output;

use thiserror::Error;

/// Main error type for Paper-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output sink error: {0}")]
    Sink(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing API key: set annotation.api-key or GEMINI_API_KEY")]
    MissingApiKey,
}

/// Result type alias for Paper-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Crawler, DownloadOutcome, PaperOutcome, YearOutcome};
pub use output::{PaperRecord, PaperSink, SinkHandle};
