//! Batch annotation loop
//!
//! The resume set is built once from the existing output and threaded through
//! the batch loop; a title in it is never fetched, classified or written again.

use crate::annotate::abstracts::{fetch_abstracts, ABSTRACT_NOT_AVAILABLE};
use crate::annotate::classifier::{Classifier, GeminiClassifier, PaperText, UNKNOWN_CATEGORY};
use crate::config::{AnnotationConfig, Config, CrawlerConfig};
use crate::crawler::{client_builder, RetryPolicy};
use crate::output::{
    load_existing, read_papers, save_enriched, AnnotationSummary, EnrichedRecord, PaperRow,
};
use crate::{ConfigError, Result};
use rand::Rng;
use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;

/// Drives abstract fetching and classification over the crawl CSV
pub struct Annotator<C> {
    client: Client,
    settings: AnnotationConfig,
    abstract_policy: RetryPolicy,
    classifier: C,
}

impl<C: Classifier> Annotator<C> {
    pub fn new(client: Client, config: &Config, classifier: C) -> Self {
        Self {
            client,
            settings: config.annotation.clone(),
            abstract_policy: RetryPolicy::from(&config.retry.abstract_page),
            classifier,
        }
    }

    /// Annotates every input row not already present in the output
    ///
    /// The output file is rewritten after each batch, so an interrupted run
    /// resumes where it stopped.
    pub async fn run(&self) -> Result<AnnotationSummary> {
        let papers = read_papers(&self.settings.input_path)?;
        let mut records = load_existing(&self.settings.output_path);
        let mut processed: HashSet<String> =
            records.iter().map(|record| record.title.clone()).collect();

        tracing::info!(
            "{} input rows, {} already annotated",
            papers.len(),
            processed.len()
        );

        let mut summary = AnnotationSummary {
            input_rows: papers.len() as u64,
            ..AnnotationSummary::default()
        };

        let batch_size = self.settings.batch_size.max(1);
        let total_batches = papers.len().div_ceil(batch_size);

        for (index, batch) in papers.chunks(batch_size).enumerate() {
            let pending = select_pending(batch, &mut processed);
            summary.already_processed += (batch.len() - pending.len()) as u64;
            if pending.is_empty() {
                continue;
            }

            if summary.batches > 0 {
                let pause = self.batch_pause();
                tracing::debug!("Pausing {:?} before the next batch", pause);
                tokio::time::sleep(pause).await;
            }

            tracing::info!(
                "Batch {}/{}: fetching {} abstracts",
                index + 1,
                total_batches,
                pending.len()
            );
            let new_records = self.annotate_batch(&pending).await;

            for record in &new_records {
                if record.category == UNKNOWN_CATEGORY {
                    summary.unknown += 1;
                }
                if record.abstract_text == ABSTRACT_NOT_AVAILABLE {
                    summary.missing_abstracts += 1;
                }
            }
            summary.annotated += new_records.len() as u64;
            summary.batches += 1;

            records.extend(new_records);
            save_enriched(&self.settings.output_path, &records)?;
            tracing::info!("Batch {} saved", index + 1);
        }

        if summary.batches == 0 && !self.settings.output_path.exists() {
            save_enriched(&self.settings.output_path, &records)?;
        }

        tracing::info!(
            "Annotation finished: {} new rows in {}",
            summary.annotated,
            self.settings.output_path.display()
        );
        Ok(summary)
    }

    /// Fetches abstracts for a batch, classifies it and builds output rows
    async fn annotate_batch(&self, pending: &[&PaperRow]) -> Vec<EnrichedRecord> {
        let urls: Vec<String> = pending.iter().map(|row| row.paper_link.clone()).collect();
        let abstracts = fetch_abstracts(
            &self.client,
            &urls,
            &self.abstract_policy,
            self.settings.concurrency_limit,
        )
        .await;

        let texts: Vec<PaperText> = pending
            .iter()
            .zip(&abstracts)
            .map(|(row, abstract_text)| PaperText {
                title: row.title.clone(),
                abstract_text: abstract_text.clone(),
            })
            .collect();

        tracing::info!("Abstracts fetched, classifying {} papers", texts.len());
        let categories = self.classifier.classify(&texts).await;

        pending
            .iter()
            .zip(abstracts)
            .zip(categories)
            .map(|((row, abstract_text), category)| EnrichedRecord {
                year: row.year,
                title: row.title.clone(),
                authors: row.authors.clone(),
                paper_link: row.paper_link.clone(),
                abstract_text,
                category,
            })
            .collect()
    }

    fn batch_pause(&self) -> Duration {
        random_pause(
            self.settings.batch_pause_min_secs,
            self.settings.batch_pause_max_secs,
        )
    }
}

/// Uniform pause in `[min_secs, max_secs]`, drawn in milliseconds
fn random_pause(min_secs: u64, max_secs: u64) -> Duration {
    let (lo, hi) = (min_secs.saturating_mul(1000), max_secs.saturating_mul(1000));
    if lo >= hi {
        return Duration::from_secs(min_secs);
    }
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}

/// Rows of `batch` whose title is new; marks them as processed
fn select_pending<'a>(batch: &'a [PaperRow], processed: &mut HashSet<String>) -> Vec<&'a PaperRow> {
    batch
        .iter()
        .filter(|row| processed.insert(row.title.clone()))
        .collect()
}

/// Builds the client used for abstracts and classification requests
///
/// Certificate and hostname verification are always on here;
/// `accept-invalid-certs` only affects the crawl client.
pub fn build_annotation_client(crawler: &CrawlerConfig) -> reqwest::Result<Client> {
    if crawler.accept_invalid_certs {
        tracing::debug!("accept-invalid-certs is ignored by the annotation pass");
    }
    annotation_client_builder(crawler).build()
}

fn annotation_client_builder(crawler: &CrawlerConfig) -> ClientBuilder {
    client_builder(&crawler.user_agent, false)
}

/// Runs a complete annotation pass with the Gemini classifier
pub async fn run_annotation(config: &Config) -> Result<AnnotationSummary> {
    let api_key = config
        .annotation
        .resolve_api_key()
        .ok_or(ConfigError::MissingApiKey)?;

    let client = build_annotation_client(&config.crawler)?;
    let classifier = GeminiClassifier::new(client.clone(), &config.annotation, api_key);
    tracing::info!("Classifying with {}", classifier.endpoint());

    Annotator::new(client, config, classifier).run().await
}
