//! Embedding backends.
//!
//! Every backend implements [`Embedder`]: a batched text-to-vector mapping
//! that preserves input order and reports its vector dimension up front.
//! Remote backends share one retry policy, applied here so callers never
//! see a transient network blip as a failed batch.

pub mod hashing;
pub mod huggingface;
pub mod openai;

pub use hashing::HashingEmbedder;
pub use huggingface::HuggingFaceEmbedder;
pub use openai::OpenAiEmbedder;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Pause before the single retry of a transient failure.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Errors raised by embedding backends.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with an unexpected status code.
    #[error("Unexpected embedding response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider response parsed but did not have the promised shape.
    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),
    /// Backend produced vectors of a different length than it advertises.
    #[error("Expected vectors of dimension {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the backend advertises.
        expected: usize,
        /// Dimension actually returned.
        actual: usize,
    },
}

impl EmbeddingError {
    /// Whether one more attempt is worthwhile.
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => err.is_connect() || err.is_timeout(),
            Self::UnexpectedStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::MalformedResponse(_) | Self::DimensionMismatch { .. } => false,
        }
    }
}

/// Capability interface for turning text into vectors.
///
/// `embed` returns exactly one vector per input, in input order; an empty
/// batch succeeds with an empty result. `dimension` is fixed for the
/// lifetime of the backend, and `deterministic` tells callers whether equal
/// inputs are guaranteed equal vectors (true only for local backends).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Produce one vector per input text, preserving order.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Length of every vector this backend produces.
    fn dimension(&self) -> usize;

    /// Whether equal inputs always produce equal vectors.
    fn deterministic(&self) -> bool;

    /// Stable identifier persisted alongside vectors written by this
    /// backend.
    fn backend_id(&self) -> &'static str;
}

/// Run `operation`, retrying exactly once after a short backoff when the
/// first failure looks transient (connect errors, timeouts, 429s, 5xx).
async fn with_single_retry<T, F, Fut>(mut operation: F) -> Result<T, EmbeddingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EmbeddingError>>,
{
    match operation().await {
        Ok(value) => Ok(value),
        Err(error) if error.is_transient() => {
            tracing::warn!(error = %error, "Embedding request failed, retrying once");
            tokio::time::sleep(RETRY_BACKOFF).await;
            operation().await
        }
        Err(error) => Err(error),
    }
}

/// Check that a backend handed back one vector of the advertised dimension
/// per input.
fn ensure_batch_shape(
    vectors: &[Vec<f32>],
    expected_count: usize,
    dimension: usize,
) -> Result<(), EmbeddingError> {
    if vectors.len() != expected_count {
        return Err(EmbeddingError::MalformedResponse(format!(
            "expected {expected_count} vectors, got {}",
            vectors.len()
        )));
    }
    for vector in vectors {
        if vector.len() != dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn server_error() -> EmbeddingError {
        EmbeddingError::UnexpectedStatus {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        }
    }

    #[test]
    fn transient_classification() {
        assert!(server_error().is_transient());
        assert!(
            EmbeddingError::UnexpectedStatus {
                status: StatusCode::TOO_MANY_REQUESTS,
                body: String::new(),
            }
            .is_transient()
        );
        assert!(
            !EmbeddingError::UnexpectedStatus {
                status: StatusCode::UNAUTHORIZED,
                body: String::new(),
            }
            .is_transient()
        );
        assert!(!EmbeddingError::MalformedResponse("nope".to_string()).is_transient());
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let result = with_single_retry(move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(server_error())
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.expect("second attempt succeeds"), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let result: Result<(), _> = with_single_retry(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(EmbeddingError::MalformedResponse("bad payload".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(EmbeddingError::MalformedResponse(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn batch_shape_is_enforced() {
        let vectors = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        assert!(ensure_batch_shape(&vectors, 2, 2).is_ok());
        assert!(matches!(
            ensure_batch_shape(&vectors, 3, 2),
            Err(EmbeddingError::MalformedResponse(_))
        ));
        assert!(matches!(
            ensure_batch_shape(&vectors, 2, 4),
            Err(EmbeddingError::DimensionMismatch {
                expected: 4,
                actual: 2
            })
        ));
    }
}
