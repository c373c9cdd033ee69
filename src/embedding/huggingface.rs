//! Embedder backed by the Hugging Face inference API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{Embedder, EmbeddingError, ensure_batch_shape, with_single_retry};

/// Inputs per request, matching the inference API's comfort zone for
/// sentence-transformer models.
const MAX_BATCH: usize = 64;

/// Remote embedding backend using Hugging Face feature extraction.
pub struct HuggingFaceEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
    options: RequestOptions,
}

#[derive(Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

impl HuggingFaceEmbedder {
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
        let url = format!(
            "{}/pipeline/feature-extraction/{}",
            self.base_url, self.model
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&FeatureExtractionRequest {
                inputs: chunk,
                // Cold models 503 while loading; waiting turns that into
                // a slow first call instead of a failure.
                options: RequestOptions {
                    wait_for_model: true,
                },
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::UnexpectedStatus { status, body });
        }

        let vectors: Vec<Vec<f32>> = response.json().await?;
        if vectors.len() != chunk.len() {
            return Err(EmbeddingError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            model = %self.model,
            batch = texts.len(),
            "Requesting Hugging Face embeddings"
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
        "huggingface"
    }
}
