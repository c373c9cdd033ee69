//! Abstractive summarization via the Hugging Face inference API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Summarizer, SummaryError};

/// Summarizer calling a hosted sequence-to-sequence model such as
/// `facebook/bart-large-cnn`.
pub struct HuggingFaceSummarizer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct SummarizationRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
    options: RequestOptions,
}

#[derive(Serialize)]
struct Parameters {
    max_length: usize,
}

#[derive(Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[derive(Deserialize)]
struct SummaryItem {
    summary_text: String,
}

impl HuggingFaceSummarizer {
    /// Build a summarizer for `model`.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, SummaryError> {
        let client = Client::builder().user_agent("docshelf/0.2").build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl Summarizer for HuggingFaceSummarizer {
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String, SummaryError> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        tracing::debug!(model = %self.model, "Requesting abstractive summary");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&SummarizationRequest {
                inputs: text,
                parameters: Parameters {
                    max_length: max_words,
                },
                options: RequestOptions {
                    wait_for_model: true,
                },
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummaryError::UnexpectedStatus { status, body });
        }

        let items: Vec<SummaryItem> = response.json().await?;
        let first = items.into_iter().next().ok_or_else(|| {
            SummaryError::MalformedResponse("backend returned no summary".to_string())
        })?;
        Ok(first.summary_text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn parses_the_first_summary_item() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/facebook/bart-large-cnn")
                    .body_contains("\"wait_for_model\":true");
                then.status(200)
                    .json_body(json!([{ "summary_text": "  Condensed text. " }]));
            })
            .await;

        let summarizer =
            HuggingFaceSummarizer::new(&server.base_url(), "token", "facebook/bart-large-cnn")
                .expect("client");
        let summary = summarizer
            .summarize("A very long document body.", 60)
            .await
            .expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "Condensed text.");
    }

    #[tokio::test]
    async fn error_statuses_surface() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/facebook/bart-large-cnn");
                then.status(503).body("model loading");
            })
            .await;

        let summarizer =
            HuggingFaceSummarizer::new(&server.base_url(), "token", "facebook/bart-large-cnn")
                .expect("client");
        let error = summarizer
            .summarize("Body.", 60)
            .await
            .expect_err("should fail");
        assert!(matches!(
            error,
            SummaryError::UnexpectedStatus { status, .. } if status.as_u16() == 503
        ));
    }

    #[tokio::test]
    async fn empty_response_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/facebook/bart-large-cnn");
                then.status(200).json_body(json!([]));
            })
            .await;

        let summarizer =
            HuggingFaceSummarizer::new(&server.base_url(), "token", "facebook/bart-large-cnn")
                .expect("client");
        let error = summarizer
            .summarize("Body.", 60)
            .await
            .expect_err("should fail");
        assert!(matches!(error, SummaryError::MalformedResponse(_)));
    }
}
