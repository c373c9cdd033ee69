#![deny(missing_docs)]

//! Core library for the Docshelf document ingestion and retrieval engine.
//!
//! Files go in one end as raw bytes, text is extracted and embedded, and
//! documents come out the other end through similarity search. The three
//! entry points external surfaces build on live in
//! [`pipeline::DocumentApi`]: `ingest_batch`, `search`, and
//! `get_document`.

/// Cooperative cancellation tokens.
pub mod cancel;
/// Environment-driven configuration management.
pub mod config;
/// Embedding backends and the capability trait they implement.
pub mod embedding;
/// Text extraction from supported file formats.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Ingestion pipeline and service facade.
pub mod pipeline;
/// Similarity scoring and top-k selection.
pub mod ranking;
/// Remote and local file sources.
pub mod source;
/// Document storage backends.
pub mod store;
/// Optional document summarization.
pub mod summarization;

pub use cancel::CancelToken;
pub use pipeline::{DocumentApi, DocumentService, FileInput, IngestionReport};
pub use store::{Document, DocumentId};
