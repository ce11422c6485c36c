//! Crawler module for the proceedings archive
//!
//! This module contains the crawl pass, including:
//! - HTTP fetching with the shared retry policy
//! - Year listing and paper page parsing
//! - PDF downloads
//! - Overall crawl coordination

mod coordinator;
mod download;
mod fetcher;
mod parser;

pub use coordinator::{run_crawl, Crawler, PaperOutcome, YearOutcome};
pub use download::{download_pdf, DownloadOutcome};
pub(crate) use fetcher::client_builder;
pub use fetcher::{
    build_http_client, fetch_with_retry, retry, AttemptError, Backoff, Fetched, RetryPolicy,
};
pub use parser::{
    extract_paper_links, parse_paper_page, sanitize_filename, PaperLink, PaperPage,
    MAX_FILENAME_STEM,
};
