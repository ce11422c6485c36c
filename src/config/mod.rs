//! Configuration module for Paper-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every table is optional; missing keys fall back to defaults that target
//! the NeurIPS proceedings site.
//!
//! # Example
//!
//! ```no_run
//! use paper_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawling {}..={}", config.crawler.start_year, config.crawler.end_year);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AnnotationConfig, Config, CrawlerConfig, RetryConfig, RetryPolicyConfig, API_KEY_ENV,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
