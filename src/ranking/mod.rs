//! Similarity scoring and top-k selection.

use std::cmp::Ordering;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use serde::Serialize;
use thiserror::Error;

use crate::store::{DocumentId, DocumentStore, StoreError};

/// One search hit: the matching document and its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Identifier of the matching document.
    pub document_id: DocumentId,
    /// Human-readable name the document was ingested under.
    pub name: String,
    /// Scaled cosine similarity in `[0, 1]`.
    pub score: f32,
}

/// Errors raised while ranking.
#[derive(Debug, Error)]
pub enum RankError {
    /// Caller passed an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The document store failed mid-scan.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Top-k selection over a document store.
///
/// Implementations are free to keep approximate indexes instead of
/// scanning, as long as they honor the scoring scale, the deterministic
/// ascending-id tie-break, and the `k == 0` rejection.
#[async_trait]
pub trait Ranker: Send + Sync {
    /// Return up to `k` documents most similar to `query`, best first.
    async fn rank(
        &self,
        store: &dyn DocumentStore,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<QueryResult>, RankError>;
}

/// Exhaustive scorer that streams the whole corpus per query.
///
/// Exact by construction, and entirely adequate until corpora grow past
/// the tens of thousands of documents.
#[derive(Debug, Default)]
pub struct LinearScanRanker;

impl LinearScanRanker {
    /// Create a linear scan ranker.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Ranker for LinearScanRanker {
    async fn rank(
        &self,
        store: &dyn DocumentStore,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<QueryResult>, RankError> {
        if k == 0 {
            return Err(RankError::InvalidArgument(
                "k must be greater than zero".to_string(),
            ));
        }

        let mut results = Vec::new();
        let mut stream = store.all();
        while let Some(document) = stream.try_next().await? {
            let score = scaled_cosine(query, &document.vector);
            results.push(QueryResult {
                document_id: document.id,
                name: document.name,
                score,
            });
        }

        let considered = results.len();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        results.truncate(k);

        tracing::debug!(considered, returned = results.len(), k, "Linear scan ranked");
        Ok(results)
    }
}

/// Cosine similarity rescaled from `[-1, 1]` to `[0, 1]`.
///
/// Returns `0.0` when either vector has zero magnitude, or when lengths
/// differ; neither case carries a meaningful angle.
pub fn scaled_cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    ((cosine + 1.0) / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SourceFormat;
    use crate::store::{Document, MemoryStore};

    fn document(id: &str, vector: Vec<f32>) -> Document {
        Document {
            id: DocumentId::from(id),
            name: format!("{id}.txt"),
            source_format: SourceFormat::Plain,
            text: String::new(),
            vector,
            ingested_at: "2025-06-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn identical_vectors_score_one() {
        let score = scaled_cosine(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_score_half() {
        let score = scaled_cosine(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_score_zero() {
        let score = scaled_cosine(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!(score.abs() < 1e-6);
    }

    #[test]
    fn zero_magnitude_scores_zero() {
        assert_eq!(scaled_cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(scaled_cosine(&[1.0, 1.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn mismatched_lengths_score_zero() {
        assert_eq!(scaled_cosine(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn rank_orders_by_similarity() {
        let store = MemoryStore::new();
        store
            .put(document("far", vec![-1.0, 0.0]))
            .await
            .expect("put");
        store
            .put(document("near", vec![1.0, 0.0]))
            .await
            .expect("put");
        store
            .put(document("mid", vec![0.0, 1.0]))
            .await
            .expect("put");

        let results = LinearScanRanker::new()
            .rank(&store, &[1.0, 0.0], 3)
            .await
            .expect("rank");

        let ids: Vec<&str> = results.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!((results[1].score - 0.5).abs() < 1e-6);
        assert!(results[2].score.abs() < 1e-6);
    }

    #[tokio::test]
    async fn ties_break_by_ascending_id() {
        let store = MemoryStore::new();
        for id in ["c", "a", "b"] {
            store.put(document(id, vec![1.0, 0.0])).await.expect("put");
        }

        let results = LinearScanRanker::new()
            .rank(&store, &[1.0, 0.0], 3)
            .await
            .expect("rank");

        let ids: Vec<&str> = results.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn zero_k_is_invalid() {
        let store = MemoryStore::new();
        let error = LinearScanRanker::new()
            .rank(&store, &[1.0, 0.0], 0)
            .await
            .expect_err("should fail");
        assert!(matches!(error, RankError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn k_beyond_corpus_returns_everything() {
        let store = MemoryStore::new();
        store.put(document("a", vec![1.0, 0.0])).await.expect("put");

        let results = LinearScanRanker::new()
            .rank(&store, &[1.0, 0.0], 10)
            .await
            .expect("rank");
        assert_eq!(results.len(), 1);
    }
}
