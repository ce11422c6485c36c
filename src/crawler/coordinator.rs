//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives a crawl pass:
//! - Initializing the output directory and the metadata CSV
//! - Walking every year listing concurrently
//! - Fanning out one paper fetch per listed paper
//! - Downloading PDFs and recording one row per paper
//!
//! Failure isolation is per paper and per year: every step below the
//! orchestrator returns a typed outcome instead of an error.

use crate::config::Config;
use crate::crawler::download::{download_pdf, DownloadOutcome};
use crate::crawler::fetcher::{build_http_client, fetch_with_retry, RetryPolicy};
use crate::crawler::parser::{extract_paper_links, parse_paper_page, sanitize_filename};
use crate::output::{CrawlSummary, PaperRecord, PaperSink, SinkHandle};
use crate::Result;
use chrono::Utc;
use futures::future::join_all;
use reqwest::Client;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tokio::sync::Semaphore;
use url::Url;

/// What happened to one paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperOutcome {
    /// A row was appended; `download` is `None` when the page had no PDF link
    Recorded {
        record: PaperRecord,
        download: Option<DownloadOutcome>,
    },

    /// Nothing was recorded
    Skipped { title: String, reason: String },
}

/// What happened to one year
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearOutcome {
    /// The listing was read and every paper on it was attempted
    Walked { year: i32, papers: Vec<PaperOutcome> },

    /// The listing had no paper links
    Empty { year: i32 },

    /// The listing could not be fetched or the year folder created
    Skipped { year: i32, reason: String },
}

impl YearOutcome {
    pub fn year(&self) -> i32 {
        match self {
            YearOutcome::Walked { year, .. }
            | YearOutcome::Empty { year }
            | YearOutcome::Skipped { year, .. } => *year,
        }
    }
}

/// Shared state for one crawl pass
pub struct Crawler {
    client: Client,
    base_url: Url,
    output_dir: PathBuf,
    page_policy: RetryPolicy,
    year_policy: RetryPolicy,
    sink: SinkHandle,
    paper_limit: Option<Semaphore>,
}

impl Crawler {
    /// Creates a crawler that appends rows through `sink`
    pub fn new(config: &Config, client: Client, sink: SinkHandle) -> Result<Self> {
        let base_url = Url::parse(&config.crawler.base_url)?;

        Ok(Self {
            client,
            base_url,
            output_dir: config.crawler.output_dir.clone(),
            page_policy: RetryPolicy::from(&config.retry.page),
            year_policy: RetryPolicy::from(&config.retry.year),
            sink,
            paper_limit: config.crawler.max_concurrent_papers.map(Semaphore::new),
        })
    }

    /// URL of the listing page for `year`
    pub fn year_url(&self, year: i32) -> String {
        format!(
            "{}/paper_files/paper/{}",
            self.base_url.as_str().trim_end_matches('/'),
            year
        )
    }

    /// Walks every year in `years` concurrently and waits for all of them
    pub async fn run(&self, years: RangeInclusive<i32>) -> Vec<YearOutcome> {
        join_all(years.map(|year| self.walk_year(year))).await
    }

    /// Reads one year listing and records every paper on it
    ///
    /// All papers of the year are fetched at once, bounded only by
    /// `max-concurrent-papers` when it is set.
    pub async fn walk_year(&self, year: i32) -> YearOutcome {
        let folder = self.output_dir.join(year.to_string());
        if let Err(e) = tokio::fs::create_dir_all(&folder).await {
            tracing::error!("Cannot create {}: {}", folder.display(), e);
            return YearOutcome::Skipped {
                year,
                reason: e.to_string(),
            };
        }

        let year_url = self.year_url(year);
        let listing = match fetch_with_retry(&self.client, &year_url, &self.year_policy).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!("Skipped year {}: {}", year, e);
                return YearOutcome::Skipped {
                    year,
                    reason: e.to_string(),
                };
            }
        };

        let links = extract_paper_links(&listing.text(), &self.base_url);
        if links.is_empty() {
            tracing::warn!("No papers found for {}", year);
            return YearOutcome::Empty { year };
        }

        tracing::info!("Found {} papers for {}", links.len(), year);
        let papers = join_all(
            links
                .iter()
                .map(|link| self.parse_and_record(year, &link.title, &link.url, &folder)),
        )
        .await;

        tracing::info!("Finished {}", year);
        YearOutcome::Walked { year, papers }
    }

    /// Fetches a paper page, downloads its PDF and appends its row
    ///
    /// A row is appended whether or not the page links a PDF; the PDF Link
    /// column holds `"N/A"` when it does not. If the page itself cannot be
    /// fetched nothing is recorded.
    pub async fn parse_and_record(
        &self,
        year: i32,
        title: &str,
        paper_page_url: &str,
        folder: &Path,
    ) -> PaperOutcome {
        let _permit = match &self.paper_limit {
            Some(limit) => limit.acquire().await.ok(),
            None => None,
        };

        let fetched = match fetch_with_retry(&self.client, paper_page_url, &self.page_policy).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!("Skipped paper: {} ({})", title, e);
                return PaperOutcome::Skipped {
                    title: title.to_string(),
                    reason: e.to_string(),
                };
            }
        };

        let page = parse_paper_page(&fetched.text(), &self.base_url);

        let download = match &page.pdf_url {
            Some(pdf_url) => {
                let destination = folder.join(sanitize_filename(title));
                Some(download_pdf(&self.client, pdf_url, &destination, &self.page_policy).await)
            }
            None => None,
        };

        let record = PaperRecord {
            year,
            title: title.to_string(),
            authors: page.authors_display(),
            paper_page_url: paper_page_url.to_string(),
            pdf_url: page
                .pdf_url
                .unwrap_or_else(|| PaperRecord::PDF_NOT_AVAILABLE.to_string()),
        };

        if let Err(e) = self.sink.append(record.clone()) {
            tracing::error!("Could not record {}: {}", title, e);
            return PaperOutcome::Skipped {
                title: title.to_string(),
                reason: e.to_string(),
            };
        }

        PaperOutcome::Recorded { record, download }
    }
}

/// Runs a complete crawl pass
///
/// 1. Create the output directory
/// 2. Truncate the metadata CSV and write its header (fatal on failure)
/// 3. Build the shared HTTP client
/// 4. Walk every configured year concurrently
/// 5. Drain the CSV writer and summarize
///
/// # Example
///
/// ```no_run
/// use paper_harvest::config::load_config;
/// use paper_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = run_crawl(&config).await?;
/// println!("{} papers recorded", summary.papers_recorded);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config) -> Result<CrawlSummary> {
    let started_at = Utc::now();

    tokio::fs::create_dir_all(&config.crawler.output_dir).await?;
    let sink = PaperSink::create(&config.crawler.csv_path())?;
    tracing::info!("Writing paper metadata to {}", sink.path().display());

    let client = build_http_client(&config.crawler)?;
    let years = config.crawler.start_year..=config.crawler.end_year;
    tracing::info!("Crawling {} for years {:?}", config.crawler.base_url, years);

    let outcomes = {
        let crawler = Crawler::new(config, client, sink.handle())?;
        crawler.run(years).await
    };

    let report = sink.finish().await?;
    let mut summary = CrawlSummary::from_outcomes(&outcomes, started_at, Utc::now());
    summary.rows_failed = report.failed;

    tracing::info!(
        "Crawl finished: {} papers recorded, {} PDFs saved",
        summary.papers_recorded,
        summary.pdfs_saved
    );
    Ok(summary)
}
