//! Inputs, outcomes, and errors of the ingestion pipeline.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::embedding::EmbeddingError;
use crate::extract::ExtractError;
use crate::ranking::RankError;
use crate::store::{DocumentId, StoreError};

/// One file submitted for ingestion.
#[derive(Debug, Clone)]
pub struct FileInput {
    /// Name the document will be stored under.
    pub name: String,
    /// Declared format, usually a file extension such as `pdf` or `txt`.
    pub declared_format: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl FileInput {
    /// Build an input from explicit parts.
    pub fn new(
        name: impl Into<String>,
        declared_format: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_format: declared_format.into(),
            bytes,
        }
    }

    /// Build an input whose declared format is taken from the name's
    /// extension. A name without an extension declares the empty format,
    /// which ingestion reports as unsupported.
    pub fn from_named_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let declared_format = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            name,
            declared_format,
            bytes,
        }
    }
}

/// Why a file was not ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The declared format is not one the extractor supports.
    UnsupportedFormat {
        /// Format string the caller declared.
        declared: String,
    },
    /// Parsing a supported format failed.
    ExtractionError {
        /// Human-readable cause.
        message: String,
    },
    /// Extraction succeeded but produced no usable text.
    EmptyContent,
    /// The embedding backend failed for the batch containing this file.
    EmbeddingError {
        /// Human-readable cause.
        message: String,
    },
    /// The document store rejected the write.
    StorageError {
        /// Human-readable cause.
        message: String,
    },
    /// The file could not be fetched from its remote source.
    FetchError {
        /// Human-readable cause.
        message: String,
    },
    /// The batch was cancelled before this file was committed.
    Cancelled,
}

impl From<ExtractError> for FailureReason {
    fn from(error: ExtractError) -> Self {
        match error {
            ExtractError::UnsupportedFormat { declared } => Self::UnsupportedFormat { declared },
            ExtractError::EmptyContent => Self::EmptyContent,
            error @ ExtractError::Extraction { .. } => Self::ExtractionError {
                message: error.to_string(),
            },
        }
    }
}

/// Per-file result of a batch ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestionOutcome {
    /// The file was extracted, embedded, and durably stored.
    Ingested {
        /// Name the file was submitted under.
        name: String,
        /// Identifier the document can be fetched by.
        document_id: DocumentId,
    },
    /// The file was not stored.
    Failed {
        /// Name the file was submitted under.
        name: String,
        /// Why ingestion stopped for this file.
        reason: FailureReason,
    },
}

impl IngestionOutcome {
    /// Name the file was submitted under.
    pub fn name(&self) -> &str {
        match self {
            Self::Ingested { name, .. } | Self::Failed { name, .. } => name,
        }
    }

    /// Whether the file made it into the store.
    pub fn is_ingested(&self) -> bool {
        matches!(self, Self::Ingested { .. })
    }
}

/// Outcome of a whole batch: one entry per input file, in input order.
///
/// Ingestion never raises; every submitted file lands here exactly once,
/// either as ingested or as failed with a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    /// Outcomes in the same order files were submitted.
    pub outcomes: Vec<IngestionOutcome>,
}

impl IngestionReport {
    /// Number of files that were stored.
    pub fn ingested(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.is_ingested())
            .count()
    }

    /// Number of files that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.ingested()
    }
}

/// How ingesting a file whose name was seen before behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplacePolicy {
    /// The document id is derived from the name, so re-ingesting a name
    /// atomically replaces the previous document.
    #[default]
    ReplaceByName,
    /// Every ingestion stores a new document under a fresh random id.
    AlwaysNew,
}

/// Errors raised by [`crate::pipeline::DocumentService::search`].
#[derive(Debug, Error)]
pub enum SearchError {
    /// Caller passed an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Embedding the query failed.
    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbeddingError),
    /// The document store failed during the scan.
    #[error("Store failure during search: {0}")]
    Store(#[from] StoreError),
    /// The operation was cancelled before results were assembled.
    #[error("search cancelled")]
    Cancelled,
}

impl From<RankError> for SearchError {
    fn from(error: RankError) -> Self {
        match error {
            RankError::InvalidArgument(message) => Self::InvalidArgument(message),
            RankError::Store(error) => Self::Store(error),
        }
    }
}

/// Errors raised while assembling a service from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Configuration is missing or unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The document store failed to open.
    #[error("Failed to open document store: {0}")]
    Store(#[from] StoreError),
    /// The embedding backend failed to initialize.
    #[error("Failed to initialize embedding backend: {0}")]
    Embedding(#[from] EmbeddingError),
}
