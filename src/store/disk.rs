//! Durable document store backed by one file per record.
//!
//! Writes are synchronous-persistence: `put` returns only after the record
//! bytes and the directory entry are flushed, via a write-to-temp, fsync,
//! rename, fsync-directory sequence. A crash mid-write leaves either the old
//! record or the new one, never a torn file.

use std::path::{Path, PathBuf};

use async_stream::try_stream;
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use tokio::task;
use tracing::debug;
use uuid::Uuid;

use super::record::{self, DecodedRecord};
use super::{Document, DocumentId, DocumentStore, StoreError};

const RECORD_EXTENSION: &str = "rec";

/// The embedding configuration a disk store is bound to.
///
/// Every record carries the backend identifier and vector dimension it was
/// written under; reads against a store opened with a different binding fail
/// with [`StoreError::SchemaMismatch`] instead of silently comparing
/// incompatible vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorBinding {
    /// Stable identifier of the embedding backend, e.g. `hashing`.
    pub backend_id: String,
    /// Vector length the backend produces.
    pub dimension: usize,
}

impl VectorBinding {
    /// Build a binding from a backend identifier and dimension.
    pub fn new(backend_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            backend_id: backend_id.into(),
            dimension,
        }
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.backend_id, self.dimension)
    }
}

/// Durable store writing one record file per document under a root
/// directory.
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    binding: VectorBinding,
}

impl DiskStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// Existing records are validated against `binding` up front so that a
    /// changed embedder surfaces here rather than as skewed similarity
    /// scores later.
    pub async fn open(
        root: impl Into<PathBuf>,
        binding: VectorBinding,
    ) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(io_error)?;

        let store = Self { root, binding };
        let paths = store.record_paths().await?;
        for path in &paths {
            let bytes = tokio::fs::read(path).await.map_err(io_error)?;
            let decoded = decode_record(path, &bytes)?;
            store.check_binding(&decoded)?;
        }
        debug!(root = %store.root.display(), records = paths.len(), "Disk store opened");
        Ok(store)
    }

    fn path_for(&self, id: &DocumentId) -> PathBuf {
        self.root
            .join(format!("{}.{RECORD_EXTENSION}", hex::encode(id.as_str())))
    }

    /// Record paths in ascending filename order. Hex encoding is
    /// order-preserving, so this matches ascending id order.
    async fn record_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let root = self.root.clone();
        task::spawn_blocking(move || -> std::io::Result<Vec<PathBuf>> {
            let mut paths = Vec::new();
            for entry in std::fs::read_dir(&root)? {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                    paths.push(path);
                }
            }
            paths.sort();
            Ok(paths)
        })
        .await
        .map_err(join_error)?
        .map_err(io_error)
    }

    fn check_binding(&self, decoded: &DecodedRecord) -> Result<(), StoreError> {
        let found_dimension = decoded.document.vector.len();
        if decoded.backend_id != self.binding.backend_id
            || found_dimension != self.binding.dimension
        {
            return Err(StoreError::SchemaMismatch {
                expected: self.binding.describe(),
                found: format!("{}:{found_dimension}", decoded.backend_id),
            });
        }
        Ok(())
    }

    async fn sync_root(&self) -> Result<(), StoreError> {
        let root = self.root.clone();
        task::spawn_blocking(move || std::fs::File::open(&root)?.sync_all())
            .await
            .map_err(join_error)?
            .map_err(io_error)
    }
}

#[async_trait]
impl DocumentStore for DiskStore {
    async fn put(&self, document: Document) -> Result<(), StoreError> {
        if document.vector.len() != self.binding.dimension {
            return Err(StoreError::SchemaMismatch {
                expected: self.binding.describe(),
                found: format!("{}:{}", self.binding.backend_id, document.vector.len()),
            });
        }
        let bytes = record::encode(&document, &self.binding.backend_id)
            .map_err(|err| StoreError::Backend { source: err.into() })?;

        let path = self.path_for(&document.id);
        let root = self.root.clone();
        task::spawn_blocking(move || write_record(&root, &path, &bytes))
            .await
            .map_err(join_error)?
            .map_err(io_error)
    }

    async fn get(&self, id: &DocumentId) -> Result<Document, StoreError> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.clone()));
            }
            Err(err) => return Err(io_error(err)),
        };
        let decoded = decode_record(&path, &bytes)?;
        self.check_binding(&decoded)?;
        Ok(decoded.document)
    }

    fn all(&self) -> BoxStream<'_, Result<Document, StoreError>> {
        Box::pin(try_stream! {
            let paths = self.record_paths().await?;
            for path in paths {
                let bytes = match tokio::fs::read(&path).await {
                    Ok(bytes) => bytes,
                    // Deleted between listing and read; a fresh scan would
                    // not see it either.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => Err(io_error(err))?,
                };
                let decoded = decode_record(&path, &bytes)?;
                self.check_binding(&decoded)?;
                yield decoded.document;
            }
        })
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        let path = self.path_for(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.clone()));
            }
            Err(err) => return Err(io_error(err)),
        }
        self.sync_root().await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.sync_root().await
    }
}

/// Write `bytes` to `path` durably: temp file, fsync, rename into place,
/// fsync the directory so the rename itself survives a crash.
fn write_record(root: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let temp = root.join(format!(".{}.tmp", Uuid::new_v4()));
    let mut file = std::fs::File::create(&temp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&temp, path)?;
    std::fs::File::open(root)?.sync_all()
}

fn decode_record(path: &Path, bytes: &[u8]) -> Result<DecodedRecord, StoreError> {
    record::decode(bytes).map_err(|err| StoreError::Corrupt {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

fn io_error(err: std::io::Error) -> StoreError {
    StoreError::Backend { source: err.into() }
}

fn join_error(err: task::JoinError) -> StoreError {
    StoreError::Backend { source: err.into() }
}
