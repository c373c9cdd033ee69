//! Ingestion pipeline and the service facade built on top of it.

mod batch;
pub mod service;
pub mod types;

pub use service::{DocumentApi, DocumentService};
pub use types::{
    BuildError, FailureReason, FileInput, IngestionOutcome, IngestionReport, ReplacePolicy,
    SearchError,
};
