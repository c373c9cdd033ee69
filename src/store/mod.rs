//! Document model and storage contract.
//!
//! The corpus is owned exclusively by a [`DocumentStore`]; documents are
//! created by the ingestion pipeline and immutable afterwards. Two backends
//! share the contract: [`MemoryStore`] for process-local corpora and
//! [`DiskStore`] for synchronous durability.

pub mod disk;
pub mod memory;
mod record;

pub use disk::{DiskStore, VectorBinding};
pub use memory::MemoryStore;

use std::fmt;

use async_trait::async_trait;
use futures_core::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::SourceFormat;

/// Opaque document identifier.
///
/// Ordering is lexicographic over the underlying string; the ranking
/// tie-break relies on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// View the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ingested document together with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier assigned at ingestion.
    pub id: DocumentId,
    /// File name the document was ingested under.
    pub name: String,
    /// Format the text was extracted from.
    pub source_format: SourceFormat,
    /// Extracted plain text; never empty for a stored document.
    pub text: String,
    /// Embedding vector of the corpus's fixed dimension.
    pub vector: Vec<f32>,
    /// RFC3339 timestamp recorded when the document was ingested.
    pub ingested_at: String,
}

/// Errors raised by document stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document exists under the requested identifier.
    #[error("document '{0}' not found")]
    NotFound(DocumentId),
    /// Backing storage failed while reading or writing.
    #[error("storage backend failure: {source}")]
    Backend {
        /// Underlying I/O or task error.
        #[source]
        source: anyhow::Error,
    },
    /// A record does not match the embedding binding the store was opened
    /// with.
    #[error("record written under embedding '{found}' but store expects '{expected}'")]
    SchemaMismatch {
        /// Binding the store was configured with (`backend:dimension`).
        expected: String,
        /// Binding found in the offending record.
        found: String,
    },
    /// A persisted record is truncated or otherwise unreadable.
    #[error("corrupt record at {path}: {reason}")]
    Corrupt {
        /// File the record was read from.
        path: String,
        /// What failed while decoding.
        reason: String,
    },
}

/// Storage contract shared by the in-memory and durable backends.
///
/// `put` with an existing id replaces atomically; no concurrent reader
/// observes a half-written document. `all` yields a finite stream and is
/// restartable: every call starts a fresh pass over the corpus. `get` and
/// `delete` on a missing id fail loudly with [`StoreError::NotFound`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document, atomically replacing any existing one with the
    /// same id.
    async fn put(&self, document: Document) -> Result<(), StoreError>;

    /// Fetch a document by id.
    async fn get(&self, id: &DocumentId) -> Result<Document, StoreError>;

    /// Stream the whole corpus.
    fn all(&self) -> BoxStream<'_, Result<Document, StoreError>>;

    /// Remove a document by id.
    async fn delete(&self, id: &DocumentId) -> Result<(), StoreError>;

    /// Flush and release the store.
    async fn close(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_order_lexicographically() {
        let a = DocumentId::from("alpha");
        let b = DocumentId::from("beta");
        assert!(a < b);
        assert_eq!(a.as_str(), "alpha");
    }

    #[test]
    fn document_id_serializes_transparently() {
        let id = DocumentId::from("doc-1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"doc-1\"");
    }
}
