//! Embedder speaking the OpenAI `/v1/embeddings` wire format.
//!
//! Also covers compatible self-hosted gateways, which is why the base URL
//! is injected rather than hardcoded.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Embedder, EmbeddingError, ensure_batch_shape, with_single_retry};

const EMBEDDINGS_PATH: &str = "/v1/embeddings";
/// Inputs per request; longer batches are split into consecutive calls.
const MAX_BATCH: usize = 128;

/// Remote embedding backend for OpenAI-compatible providers.
pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Build a backend for `model`, with vectors of length `dimension`.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder().user_agent("docshelf/0.2").build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimension,
        })
    }

    async fn embed_chunk(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}{EMBEDDINGS_PATH}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: chunk,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::UnexpectedStatus { status, body });
        }

        let payload: EmbeddingsResponse = response.json().await?;
        if payload.data.len() != chunk.len() {
            return Err(EmbeddingError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                payload.data.len()
            )));
        }

        // The API is allowed to return items out of order; `index` is
        // authoritative.
        let mut items = payload.data;
        items.sort_by_key(|item| item.index);
        Ok(items.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            model = %self.model,
            batch = texts.len(),
            "Requesting OpenAI embeddings"
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH) {
            let batch = with_single_retry(|| self.embed_chunk(chunk)).await?;
            vectors.extend(batch);
        }
        ensure_batch_shape(&vectors, texts.len(), self.dimension)?;
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn deterministic(&self) -> bool {
        false
    }

    fn backend_id(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn embeddings_are_returned_in_index_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/embeddings")
                    .header("authorization", "Bearer key")
                    .body_contains("\"model\":\"text-embedding-3-small\"");
                then.status(200).json_body(json!({
                    "data": [
                        { "index": 1, "embedding": [0.0, 1.0] },
                        { "index": 0, "embedding": [1.0, 0.0] }
                    ]
                }));
            })
            .await;

        let embedder = OpenAiEmbedder::new(&server.base_url(), "key", "text-embedding-3-small", 2)
            .expect("client");
        let vectors = embedder
            .embed(vec!["first".to_string(), "second".to_string()])
            .await
            .expect("embed");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn server_errors_are_retried_once() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(500).body("overloaded");
            })
            .await;

        let embedder =
            OpenAiEmbedder::new(&server.base_url(), "key", "model", 2).expect("client");
        let error = embedder
            .embed(vec!["text".to_string()])
            .await
            .expect_err("should fail");

        mock.assert_hits_async(2).await;
        assert!(matches!(error, EmbeddingError::UnexpectedStatus { .. }));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(401).body("bad key");
            })
            .await;

        let embedder =
            OpenAiEmbedder::new(&server.base_url(), "key", "model", 2).expect("client");
        let error = embedder
            .embed(vec!["text".to_string()])
            .await
            .expect_err("should fail");

        mock.assert_hits_async(1).await;
        assert!(matches!(
            error,
            EmbeddingError::UnexpectedStatus { status, .. } if status.as_u16() == 401
        ));
    }

    #[tokio::test]
    async fn short_vectors_are_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(200).json_body(json!({
                    "data": [ { "index": 0, "embedding": [1.0] } ]
                }));
            })
            .await;

        let embedder =
            OpenAiEmbedder::new(&server.base_url(), "key", "model", 2).expect("client");
        let error = embedder
            .embed(vec!["text".to_string()])
            .await
            .expect_err("should fail");
        assert!(matches!(
            error,
            EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }
}
