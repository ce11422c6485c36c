//! Topic classification through an external text-generation service
//!
//! The service is treated as opaque: a prompt listing the allowed categories
//! and a batch of papers goes in, one line per paper is expected back. Lines
//! are matched against the category list; anything unmatched, missing, or
//! lost to a failed call becomes [`UNKNOWN_CATEGORY`].

use crate::config::AnnotationConfig;
use crate::crawler::{retry, RetryPolicy};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Label used when no configured category applies
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Title and abstract of one paper, as sent to the classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperText {
    pub title: String,
    pub abstract_text: String,
}

/// Assigns one category per paper
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Returns exactly `papers.len()` labels, in input order
    async fn classify(&self, papers: &[PaperText]) -> Vec<String>;
}

/// Builds the classification prompt for a batch
pub fn build_prompt(categories: &[String], papers: &[PaperText]) -> String {
    let mut prompt = String::from(
        "You are an AI classifier. Categorize each paper into ONE of the following categories ONLY:\n",
    );
    for (index, category) in categories.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", index + 1, category));
    }

    prompt.push_str("\nHere are the research papers:\n");
    for (index, paper) in papers.iter().enumerate() {
        prompt.push_str(&format!(
            "\nPaper {}:\nTitle: {}\nAbstract: {}\n",
            index + 1,
            paper.title,
            paper.abstract_text
        ));
    }

    prompt.push_str(
        "\nRespond with a numbered list of categories for each paper. \
         Only return category names from the list above.",
    );
    prompt
}

/// Maps a service response to exactly `expected` labels
///
/// Each non-blank line takes the first configured category it contains, or
/// [`UNKNOWN_CATEGORY`]. Missing lines are filled with [`UNKNOWN_CATEGORY`];
/// surplus lines are dropped.
pub fn match_categories(response: &str, categories: &[String], expected: usize) -> Vec<String> {
    let mut labels: Vec<String> = response
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            categories
                .iter()
                .find(|category| line.contains(category.as_str()))
                .cloned()
                .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
        })
        .collect();

    labels.resize(expected, UNKNOWN_CATEGORY.to_string());
    labels
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Classifier backed by the Gemini `generateContent` endpoint
pub struct GeminiClassifier {
    client: Client,
    endpoint: String,
    api_key: String,
    categories: Vec<String>,
    policy: RetryPolicy,
}

impl GeminiClassifier {
    pub fn new(client: Client, config: &AnnotationConfig, api_key: String) -> Self {
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.api_base.trim_end_matches('/'),
            config.model
        );

        Self {
            client,
            endpoint,
            api_key,
            categories: config.categories.clone(),
            policy: RetryPolicy::exponential(
                config.retry_budget,
                Duration::from_secs(config.timeout_secs),
                Duration::from_secs(config.backoff_base_secs),
            ),
        }
    }

    /// URL the classifier posts to, without the key
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one request and returns the generated text
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.policy.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(HarvestError::Classification(format!(
                "service returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| HarvestError::Classification(format!("unreadable response: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(HarvestError::Classification("empty response".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(&self, papers: &[PaperText]) -> Vec<String> {
        if papers.is_empty() {
            return Vec::new();
        }

        let prompt = build_prompt(&self.categories, papers);
        match retry(&self.policy, &self.endpoint, || self.generate(&prompt)).await {
            Ok(text) => match_categories(&text, &self.categories, papers.len()),
            Err(e) => {
                tracing::error!("Classification failed for {} papers: {}", papers.len(), e);
                vec![UNKNOWN_CATEGORY.to_string(); papers.len()]
            }
        }
    }
}
