//! Run summaries
//!
//! This module folds the typed outcomes of a crawl or annotation pass into
//! counters and prints them at the end of a run.

use crate::crawler::{PaperOutcome, YearOutcome};
use chrono::{DateTime, Utc};

/// What a crawl pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Years whose listing produced at least one paper link
    pub years_walked: u64,

    /// Years whose listing had no paper links
    pub years_empty: u64,

    /// Years whose listing could not be fetched
    pub years_skipped: u64,

    /// Which years were skipped, in range order
    pub skipped_years: Vec<i32>,

    /// Paper links discovered across all listings
    pub papers_found: u64,

    /// Rows appended to the CSV
    pub papers_recorded: u64,

    /// Papers whose detail page could not be fetched
    pub papers_skipped: u64,

    /// Recorded papers without a PDF link
    pub pdfs_missing: u64,

    pub pdfs_saved: u64,
    pub pdfs_skipped: u64,

    /// Rows the CSV writer failed to write
    pub rows_failed: u64,
}

impl CrawlSummary {
    /// Builds a summary from the outcome of every year
    pub fn from_outcomes(
        outcomes: &[YearOutcome],
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let mut summary = CrawlSummary {
            started_at,
            finished_at,
            years_walked: 0,
            years_empty: 0,
            years_skipped: 0,
            skipped_years: Vec::new(),
            papers_found: 0,
            papers_recorded: 0,
            papers_skipped: 0,
            pdfs_missing: 0,
            pdfs_saved: 0,
            pdfs_skipped: 0,
            rows_failed: 0,
        };

        for outcome in outcomes {
            match outcome {
                YearOutcome::Walked { papers, .. } => {
                    summary.years_walked += 1;
                    summary.papers_found += papers.len() as u64;
                    for paper in papers {
                        summary.add_paper(paper);
                    }
                }
                YearOutcome::Empty { .. } => summary.years_empty += 1,
                YearOutcome::Skipped { .. } => {
                    summary.years_skipped += 1;
                    summary.skipped_years.push(outcome.year());
                }
            }
        }

        summary
    }

    fn add_paper(&mut self, paper: &PaperOutcome) {
        match paper {
            PaperOutcome::Recorded { record, download } => {
                self.papers_recorded += 1;
                if !record.has_pdf() {
                    self.pdfs_missing += 1;
                }
                match download {
                    Some(outcome) if outcome.is_saved() => self.pdfs_saved += 1,
                    Some(_) => self.pdfs_skipped += 1,
                    None => {}
                }
            }
            PaperOutcome::Skipped { .. } => self.papers_skipped += 1,
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// What an annotation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSummary {
    /// Rows read from the crawl CSV
    pub input_rows: u64,

    /// Rows skipped because their title was already annotated
    pub already_processed: u64,

    /// Batches sent to the classifier
    pub batches: u64,

    /// Rows annotated in this run
    pub annotated: u64,

    /// Annotated rows labelled with the unknown sentinel
    pub unknown: u64,

    /// Annotated rows without an abstract
    pub missing_abstracts: u64,
}

/// Prints a crawl summary to stdout
pub fn print_crawl_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Run:");
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!("  Duration: {} seconds", summary.duration_seconds());
    println!();

    println!("Years:");
    println!("  Walked: {}", summary.years_walked);
    println!("  Without papers: {}", summary.years_empty);
    if summary.skipped_years.is_empty() {
        println!("  Skipped: 0");
    } else {
        let years: Vec<String> = summary.skipped_years.iter().map(i32::to_string).collect();
        println!("  Skipped: {} ({})", summary.years_skipped, years.join(", "));
    }
    println!();

    println!("Papers:");
    println!("  Found: {}", summary.papers_found);
    println!("  Recorded: {}", summary.papers_recorded);
    println!("  Skipped: {}", summary.papers_skipped);
    if summary.rows_failed > 0 {
        println!("  Rows failed to write: {}", summary.rows_failed);
    }
    println!();

    println!("PDFs:");
    println!("  Saved: {}", summary.pdfs_saved);
    println!("  Skipped: {}", summary.pdfs_skipped);
    println!("  No PDF link: {}", summary.pdfs_missing);
}

/// Prints an annotation summary to stdout
pub fn print_annotation_summary(summary: &AnnotationSummary) {
    println!("=== Annotation Summary ===\n");
    println!("  Input rows: {}", summary.input_rows);
    println!("  Already annotated: {}", summary.already_processed);
    println!("  Batches classified: {}", summary.batches);
    println!("  Annotated this run: {}", summary.annotated);
    println!("  Unknown category: {}", summary.unknown);
    println!("  Missing abstracts: {}", summary.missing_abstracts);
}
