//! Output module for crawl and annotation results
//!
//! This module handles:
//! - The append-only metadata CSV written during a crawl
//! - Reading that CSV back and writing the enriched annotation output
//! - Summaries of what each pass did

mod enriched;
mod sink;
pub mod stats;

pub use enriched::{load_existing, read_papers, save_enriched, EnrichedRecord, PaperRow};
pub use sink::{PaperSink, SinkHandle, SinkReport, CSV_HEADER};
pub use stats::{print_annotation_summary, print_crawl_summary, AnnotationSummary, CrawlSummary};

/// Metadata for one discovered paper, as appended to the crawl CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperRecord {
    pub year: i32,
    pub title: String,
    /// Author names joined with `", "`
    pub authors: String,
    pub paper_page_url: String,
    /// Absolute PDF URL or [`PaperRecord::PDF_NOT_AVAILABLE`]
    pub pdf_url: String,
}

impl PaperRecord {
    /// Recorded in the PDF Link column when a page has no PDF link
    pub const PDF_NOT_AVAILABLE: &'static str = "N/A";

    /// Field values in CSV column order
    pub fn to_row(&self) -> [String; 5] {
        [
            self.year.to_string(),
            self.title.clone(),
            self.authors.clone(),
            self.paper_page_url.clone(),
            self.pdf_url.clone(),
        ]
    }

    pub fn has_pdf(&self) -> bool {
        self.pdf_url != Self::PDF_NOT_AVAILABLE
    }
}
