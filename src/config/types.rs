use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable consulted when `annotation.api-key` is not set
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for Paper-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub annotation: AnnotationConfig,
}

/// Crawl pass configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Root of the proceedings site, e.g. `https://papers.nips.cc`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// First year to crawl (inclusive)
    #[serde(rename = "start-year")]
    pub start_year: i32,

    /// Last year to crawl (inclusive)
    #[serde(rename = "end-year")]
    pub end_year: i32,

    /// Directory receiving the CSV and one PDF folder per year
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// File name of the metadata CSV inside `output-dir`
    #[serde(rename = "csv-name")]
    pub csv_name: String,

    /// User-Agent sent on every page and PDF request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Disable TLS certificate and hostname verification
    #[serde(rename = "accept-invalid-certs")]
    pub accept_invalid_certs: bool,

    /// Upper bound on paper fetches in flight per year (unbounded if absent)
    #[serde(rename = "max-concurrent-papers")]
    pub max_concurrent_papers: Option<usize>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://papers.nips.cc".to_string(),
            start_year: 2019,
            end_year: 2023,
            output_dir: PathBuf::from("./papers"),
            csv_name: "papers.csv".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: false,
            max_concurrent_papers: None,
        }
    }
}

impl CrawlerConfig {
    /// Path of the metadata CSV
    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(&self.csv_name)
    }
}

/// Retry policies, one per kind of request
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Paper detail pages and PDF downloads
    pub page: RetryPolicyConfig,

    /// Year listing pages
    pub year: RetryPolicyConfig,

    /// Abstract scraping during annotation
    #[serde(rename = "abstract")]
    pub abstract_page: RetryPolicyConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            page: RetryPolicyConfig::new(2, 90, 3_000, 10_000),
            year: RetryPolicyConfig::new(2, 90, 5_000, 15_000),
            abstract_page: RetryPolicyConfig::new(5, 60, 2_000, 2_000),
        }
    }
}

/// A single retry policy as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryPolicyConfig {
    /// Total number of attempts, including the first
    pub attempts: u32,

    /// Ceiling on each attempt (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Lower bound of the pause between attempts (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the pause between attempts (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,
}

impl RetryPolicyConfig {
    pub const fn new(attempts: u32, timeout_secs: u64, min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            attempts,
            timeout_secs,
            min_delay_ms,
            max_delay_ms,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Annotation pass configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Classification service key; falls back to `GEMINI_API_KEY`
    #[serde(rename = "api-key")]
    pub api_key: Option<String>,

    /// CSV produced by the crawl pass
    #[serde(rename = "input-path")]
    pub input_path: PathBuf,

    /// Enriched output, also read back as the resume set
    #[serde(rename = "output-path")]
    pub output_path: PathBuf,

    /// Allowed category labels
    pub categories: Vec<String>,

    /// Papers per classification request
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Abstract fetches in flight at once
    #[serde(rename = "concurrency-limit")]
    pub concurrency_limit: usize,

    /// Attempts made against the classification service per batch
    #[serde(rename = "retry-budget")]
    pub retry_budget: u32,

    /// Model name used in the generateContent call
    pub model: String,

    /// Root URL of the classification service
    #[serde(rename = "api-base")]
    pub api_base: String,

    /// Ceiling on each classification request (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// First backoff step after a failed classification call (seconds)
    #[serde(rename = "backoff-base-secs")]
    pub backoff_base_secs: u64,

    /// Minimum pause between batches (seconds)
    #[serde(rename = "batch-pause-min-secs")]
    pub batch_pause_min_secs: u64,

    /// Maximum pause between batches (seconds)
    #[serde(rename = "batch-pause-max-secs")]
    pub batch_pause_max_secs: u64,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            input_path: PathBuf::from("./papers/papers.csv"),
            output_path: PathBuf::from("./annotation.csv"),
            categories: vec![
                "Deep Learning".to_string(),
                "Reinforcement Learning".to_string(),
                "Optimization".to_string(),
                "Graph Neural Networks".to_string(),
            ],
            batch_size: 10,
            concurrency_limit: 5,
            retry_budget: 5,
            model: "gemini-pro".to_string(),
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 120,
            backoff_base_secs: 5,
            batch_pause_min_secs: 40,
            batch_pause_max_secs: 60,
        }
    }
}

impl AnnotationConfig {
    /// Returns the configured API key, or the one from the environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}
