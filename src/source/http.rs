//! HTTP file source.

use async_trait::async_trait;
use reqwest::Client;

use super::{FetchError, FileFetcher, RemoteFile};

/// Fetcher downloading file content over HTTP.
///
/// Requests `GET {base}/{id}/content` with a bearer token, the layout
/// drive-style document APIs expose.
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    /// Build a fetcher rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = Client::builder().user_agent("docshelf/0.2").build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl FileFetcher for HttpFetcher {
    async fn fetch(&self, file: &RemoteFile, token: &str) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}/{}/content", self.base_url, file.id);
        tracing::debug!(file = %file.name, "Fetching remote file");
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::UnexpectedStatus { status, body });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
