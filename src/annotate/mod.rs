//! Annotation pass over the crawl CSV
//!
//! This module contains:
//! - Abstract scraping from paper pages
//! - Batch classification through an external service
//! - The resumable batch loop writing the enriched output

mod abstracts;
mod classifier;
mod pipeline;

pub use abstracts::{extract_abstract, fetch_abstract, fetch_abstracts, ABSTRACT_NOT_AVAILABLE};
pub use classifier::{
    build_prompt, match_categories, Classifier, GeminiClassifier, PaperText, UNKNOWN_CATEGORY,
};
pub use pipeline::{build_annotation_client, run_annotation, Annotator};
