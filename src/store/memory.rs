//! In-memory document store.
//!
//! Keeps documents in a map guarded by an async `RwLock`, with insertion
//! order tracked separately so `all()` replays documents in the order they
//! were first stored. Replacing a document keeps its original position.

use std::collections::HashMap;

use async_stream::try_stream;
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use tokio::sync::RwLock;

use super::{Document, DocumentId, DocumentStore, StoreError};

/// Volatile store backed by a `HashMap`. Contents are lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    documents: HashMap<DocumentId, Document>,
    order: Vec<DocumentId>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put(&self, document: Document) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let id = document.id.clone();
        if inner.documents.insert(id.clone(), document).is_none() {
            inner.order.push(id);
        }
        Ok(())
    }

    async fn get(&self, id: &DocumentId) -> Result<Document, StoreError> {
        let inner = self.inner.read().await;
        inner
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn all(&self) -> BoxStream<'_, Result<Document, StoreError>> {
        Box::pin(try_stream! {
            // Snapshot under the read lock so the stream stays consistent
            // even if the store is mutated while a consumer is mid-scan.
            let snapshot: Vec<Document> = {
                let inner = self.inner.read().await;
                inner
                    .order
                    .iter()
                    .filter_map(|id| inner.documents.get(id).cloned())
                    .collect()
            };
            for document in snapshot {
                yield document;
            }
        })
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.documents.remove(id).is_none() {
            return Err(StoreError::NotFound(id.clone()));
        }
        inner.order.retain(|existing| existing != id);
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
