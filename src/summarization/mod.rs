//! Document summarization.
//!
//! Summarization is optional: when no abstractive backend is configured,
//! or the configured one fails, callers get a deterministic extractive
//! summary instead. The result always records which strategy produced it.

pub mod extractive;
pub mod huggingface;

pub use extractive::extractive_summary;
pub use huggingface::HuggingFaceSummarizer;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by abstractive summarization backends.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Backend responded with an unexpected status code.
    #[error("Unexpected summarization response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Backend response parsed but did not have the promised shape.
    #[error("Malformed summarization response: {0}")]
    MalformedResponse(String),
}

/// Interface implemented by abstractive summarization backends.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a summary of `text` within roughly `max_words` words.
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String, SummaryError>;
}

/// Which strategy produced a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStrategy {
    /// A model rewrote the text.
    Abstractive,
    /// Leading sentences were selected verbatim.
    Extractive,
}

/// A produced summary and the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    /// The summary text.
    pub text: String,
    /// Strategy that produced it.
    pub strategy: SummaryStrategy,
}

/// Summarize `text`, preferring the abstractive backend when one is given.
///
/// A backend failure is logged and degrades to the extractive strategy;
/// this function never fails.
pub async fn summarize_text(
    text: &str,
    backend: Option<&dyn Summarizer>,
    max_words: usize,
) -> DocumentSummary {
    if let Some(backend) = backend {
        match backend.summarize(text, max_words).await {
            Ok(summary) => {
                return DocumentSummary {
                    text: summary,
                    strategy: SummaryStrategy::Abstractive,
                };
            }
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "Abstractive summarization failed; falling back to extractive"
                );
            }
        }
    }

    DocumentSummary {
        text: extractive_summary(text, max_words),
        strategy: SummaryStrategy::Extractive,
    }
}
