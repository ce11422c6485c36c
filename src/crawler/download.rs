//! PDF downloads

use crate::crawler::fetcher::{fetch_with_retry, RetryPolicy};
use reqwest::Client;
use std::path::{Path, PathBuf};

/// Result of a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The body was written to `path`
    Saved { path: PathBuf, bytes: usize },

    /// Nothing was written; the crawl carries on
    Skipped { reason: String },
}

impl DownloadOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, DownloadOutcome::Saved { .. })
    }
}

/// Downloads `pdf_url` into `destination`, overwriting any existing file
///
/// Failures (retries exhausted, unwritable destination) are logged and
/// reported as `Skipped`. A crash mid-write can leave a truncated file.
pub async fn download_pdf(
    client: &Client,
    pdf_url: &str,
    destination: &Path,
    policy: &RetryPolicy,
) -> DownloadOutcome {
    let fetched = match fetch_with_retry(client, pdf_url, policy).await {
        Ok(fetched) => fetched,
        Err(e) => {
            tracing::warn!("Skipped PDF {}: {}", pdf_url, e);
            return DownloadOutcome::Skipped {
                reason: e.to_string(),
            };
        }
    };

    if let Err(e) = tokio::fs::write(destination, &fetched.body).await {
        tracing::error!("Failed to write {}: {}", destination.display(), e);
        return DownloadOutcome::Skipped {
            reason: format!("write failed: {}", e),
        };
    }

    tracing::info!("Saved: {}", destination.display());
    DownloadOutcome::Saved {
        path: destination.to_path_buf(),
        bytes: fetched.body.len(),
    }
}
