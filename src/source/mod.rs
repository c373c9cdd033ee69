//! File sources feeding the ingestion pipeline.
//!
//! The pipeline consumes these collaborators but never constructs them: a
//! [`TokenProvider`] supplies short-lived credentials and a [`FileFetcher`]
//! turns a file reference into bytes. Both are injected, so embedding
//! programs and tests choose their own implementations.

pub mod http;
pub mod local;

pub use http::HttpFetcher;
pub use local::collect_dir;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Reference to a file held by a remote source.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    /// Source-side identifier used to build the download request.
    pub id: String,
    /// Name the file will be ingested under.
    pub name: String,
}

/// Errors raised while fetching remote files.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Source responded with an unexpected status code.
    #[error("Unexpected source response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the source.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// No usable credential could be produced.
    #[error("Token acquisition failed: {0}")]
    Token(String),
}

/// Supplies the bearer token used for source requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a token valid for the next batch of requests.
    async fn bearer_token(&self) -> Result<String, FetchError>;
}

/// Downloads the content of one remote file.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Fetch the raw bytes of `file`, authenticating with `token`.
    async fn fetch(&self, file: &RemoteFile, token: &str) -> Result<Vec<u8>, FetchError>;
}

/// Token provider wrapping an already-acquired credential.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Wrap a fixed token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, FetchError> {
        Ok(self.token.clone())
    }
}
