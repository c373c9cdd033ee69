//! Deterministic local embedding backend.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{Embedder, EmbeddingError};

/// Offline embedder that hashes whitespace tokens into a fixed-size vector.
///
/// Purely local and deterministic, so it serves installs without an API key
/// and keeps tests hermetic. Each token lands in a slot chosen by its SHA-256
/// digest; the result is L2-normalized so cosine scores stay comparable
/// across documents of different lengths.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create a backend producing vectors of the given length.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        if self.dimension == 0 {
            return vector;
        }

        for token in text.split_whitespace() {
            let digest = Sha256::digest(token.to_lowercase());
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&digest[..8]);
            let slot = (u64::from_le_bytes(raw) % self.dimension as u64) as usize;
            // Weight varies with the digest so tokens sharing a slot still
            // contribute distinguishable mass.
            vector[slot] += 1.0 + f32::from(digest[8]) / 255.0;
        }

        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn deterministic(&self) -> bool {
        true
    }

    fn backend_id(&self) -> &'static str {
        "hashing"
    }
}
