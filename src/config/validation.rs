use crate::config::types::{AnnotationConfig, Config, CrawlerConfig, RetryPolicyConfig};
use crate::ConfigError;
use chrono::Datelike;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_policy("retry.page", &config.retry.page)?;
    validate_retry_policy("retry.year", &config.retry.year)?;
    validate_retry_policy("retry.abstract", &config.retry.abstract_page)?;
    validate_annotation_config(&config.annotation)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;

    if config.start_year > config.end_year {
        return Err(ConfigError::Validation(format!(
            "start-year ({}) must not be after end-year ({})",
            config.start_year, config.end_year
        )));
    }

    // Proceedings are published at most a year ahead
    let latest = chrono::Utc::now().year() + 1;
    if config.end_year > latest {
        return Err(ConfigError::Validation(format!(
            "end-year must be <= {}, got {}",
            latest, config.end_year
        )));
    }

    if config.csv_name.is_empty() {
        return Err(ConfigError::Validation(
            "csv-name cannot be empty".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.max_concurrent_papers == Some(0) {
        return Err(ConfigError::Validation(
            "max-concurrent-papers must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates one retry policy table
fn validate_retry_policy(name: &str, policy: &RetryPolicyConfig) -> Result<(), ConfigError> {
    if policy.attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "{}.attempts must be >= 1, got {}",
            name, policy.attempts
        )));
    }

    if policy.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "{}.timeout-secs must be >= 1",
            name
        )));
    }

    if policy.min_delay_ms > policy.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "{}: min-delay-ms ({}) exceeds max-delay-ms ({})",
            name, policy.min_delay_ms, policy.max_delay_ms
        )));
    }

    Ok(())
}

/// Validates annotation configuration
///
/// The API key is not checked here: a crawl-only config does not need one.
fn validate_annotation_config(config: &AnnotationConfig) -> Result<(), ConfigError> {
    if config.categories.is_empty() {
        return Err(ConfigError::Validation(
            "annotation.categories cannot be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for category in &config.categories {
        if category.trim().is_empty() {
            return Err(ConfigError::Validation(
                "annotation.categories cannot contain blank entries".to_string(),
            ));
        }
        if !seen.insert(category.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category '{}'",
                category
            )));
        }
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "annotation.batch-size must be >= 1".to_string(),
        ));
    }

    if config.concurrency_limit < 1 {
        return Err(ConfigError::Validation(
            "annotation.concurrency-limit must be >= 1".to_string(),
        ));
    }

    if config.retry_budget < 1 {
        return Err(ConfigError::Validation(
            "annotation.retry-budget must be >= 1".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "annotation.timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.batch_pause_min_secs > config.batch_pause_max_secs {
        return Err(ConfigError::Validation(format!(
            "batch-pause-min-secs ({}) exceeds batch-pause-max-secs ({})",
            config.batch_pause_min_secs, config.batch_pause_max_secs
        )));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "annotation.model cannot be empty".to_string(),
        ));
    }

    validate_http_url("annotation.api-base", &config.api_base)?;

    Ok(())
}

/// Checks that `value` parses as an http or https URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name, value
        )));
    }

    Ok(())
}
