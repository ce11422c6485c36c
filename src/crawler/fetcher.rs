//! HTTP fetcher implementation
//!
//! This module owns every network read the crate performs:
//! - Building the shared HTTP client with the configured user agent and TLS mode
//! - The single retry policy (attempt budget, per-attempt timeout, pause between attempts)
//! - GET requests that only count HTTP 200 as success

use crate::config::{CrawlerConfig, RetryPolicyConfig};
use crate::HarvestError;
use rand::Rng;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for AttemptError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AttemptError::Timeout
        } else if e.is_connect() {
            AttemptError::Connect(e.to_string())
        } else {
            AttemptError::Network(e.to_string())
        }
    }
}

/// A successful response
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Full response body
    pub body: Vec<u8>,
}

impl Fetched {
    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// How long to wait between attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backoff {
    /// Uniformly random pause in `[min, max]`
    Uniform { min: Duration, max: Duration },

    /// `base * 2^(n - 1)` after the n-th failure
    Exponential { base: Duration },
}

/// Attempt budget, per-attempt timeout and the pause between attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub timeout: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Policy with a jittered pause drawn from `[min_delay, max_delay]`
    pub fn new(attempts: u32, timeout: Duration, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            timeout,
            backoff: Backoff::Uniform {
                min: min_delay,
                max: max_delay.max(min_delay),
            },
        }
    }

    /// Policy whose pause doubles after every failure
    pub fn exponential(attempts: u32, timeout: Duration, base: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            timeout,
            backoff: Backoff::Exponential { base },
        }
    }

    /// Pause after the `failures`-th failed attempt (1-based)
    pub fn delay_after(&self, failures: u32) -> Duration {
        match &self.backoff {
            Backoff::Uniform { min, max } => {
                let (lo, hi) = (min.as_millis() as u64, max.as_millis() as u64);
                if lo >= hi {
                    return *min;
                }
                Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
            }
            Backoff::Exponential { base } => {
                let factor = 2u32.saturating_pow(failures.saturating_sub(1).min(16));
                base.saturating_mul(factor)
            }
        }
    }
}

impl From<&RetryPolicyConfig> for RetryPolicy {
    fn from(config: &RetryPolicyConfig) -> Self {
        RetryPolicy::new(
            config.attempts,
            config.timeout(),
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

/// Runs `operation` until it succeeds or `policy.attempts` is spent
///
/// Every failure is logged as a retry; the pause from `policy` is slept
/// between attempts but not after the last one. `label` names the target in
/// logs and in the final error.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, HarvestError>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_error = String::from("no attempt made");

    for attempt in 1..=policy.attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!("Retry {}/{} for {}: {}", attempt, policy.attempts, label, e);
                last_error = e.to_string();
            }
        }

        if attempt < policy.attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    Err(HarvestError::RetriesExhausted {
        url: label.to_string(),
        attempts: policy.attempts,
        last_error,
    })
}

/// Builds the shared HTTP client
///
/// Certificate verification stays on unless `accept-invalid-certs` is set,
/// in which case both certificate and hostname checks are disabled.
///
/// # Example
///
/// ```no_run
/// use paper_harvest::config::CrawlerConfig;
/// use paper_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    if config.accept_invalid_certs {
        tracing::warn!("TLS certificate and hostname verification is DISABLED");
    }

    client_builder(&config.user_agent, config.accept_invalid_certs).build()
}

/// Client settings shared by every pass; only the crawl may relax TLS
pub(crate) fn client_builder(user_agent: &str, accept_invalid_certs: bool) -> ClientBuilder {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .gzip(true)
        .brotli(true)
}

/// Fetches a URL, retrying per `policy`
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 200, body read | Return `Fetched` |
/// | Any other status | Retry after a jittered pause |
/// | Timeout | Retry after a jittered pause |
/// | Connection / body error | Retry after a jittered pause |
/// | Budget spent | `HarvestError::RetriesExhausted` |
///
/// Exactly `policy.attempts` requests are sent to a URL that never succeeds.
pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    policy: &RetryPolicy,
) -> Result<Fetched, HarvestError> {
    let fetched = retry(policy, url, || fetch_once(client, url, policy.timeout)).await?;
    tracing::debug!("Fetched {} ({} bytes)", url, fetched.body.len());
    Ok(fetched)
}

/// Sends one GET and reads the whole body within `timeout`
async fn fetch_once(client: &Client, url: &str, timeout: Duration) -> Result<Fetched, AttemptError> {
    let response = client.get(url).timeout(timeout).send().await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(AttemptError::Status(status.as_u16()));
    }

    let body = response.bytes().await?;

    Ok(Fetched { body: body.to_vec() })
}
