//! Abstract scraping for the annotation pass

use crate::crawler::{fetch_with_retry, RetryPolicy};
use futures::future::join_all;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::sync::Semaphore;
use url::Url;

/// Stored when a paper page yields no abstract
pub const ABSTRACT_NOT_AVAILABLE: &str = "Abstract not available.";

/// Fetches the abstract shown on a paper page
///
/// Never fails: an invalid URL, a page with fewer than three paragraphs, or an
/// exhausted retry budget all produce [`ABSTRACT_NOT_AVAILABLE`].
pub async fn fetch_abstract(client: &Client, url: &str, policy: &RetryPolicy) -> String {
    if !is_fetchable(url) {
        tracing::debug!("Not a fetchable URL: {:?}", url);
        return ABSTRACT_NOT_AVAILABLE.to_string();
    }

    match fetch_with_retry(client, url, policy).await {
        Ok(fetched) => {
            extract_abstract(&fetched.text()).unwrap_or_else(|| ABSTRACT_NOT_AVAILABLE.to_string())
        }
        Err(e) => {
            tracing::warn!("No abstract for {}: {}", url, e);
            ABSTRACT_NOT_AVAILABLE.to_string()
        }
    }
}

/// Fetches abstracts for every URL, at most `limit` at a time
///
/// Results are returned in the order of `urls`.
pub async fn fetch_abstracts(
    client: &Client,
    urls: &[String],
    policy: &RetryPolicy,
    limit: usize,
) -> Vec<String> {
    let semaphore = Semaphore::new(limit.max(1));
    let semaphore = &semaphore;

    join_all(urls.iter().map(|url| async move {
        let _permit = semaphore.acquire().await.ok();
        fetch_abstract(client, url, policy).await
    }))
    .await
}

/// The abstract is the third paragraph of the page body
pub fn extract_abstract(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("body p").ok()?;

    document
        .select(&selector)
        .nth(2)
        .map(|paragraph| paragraph.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

fn is_fetchable(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some())
        .unwrap_or(false)
}
