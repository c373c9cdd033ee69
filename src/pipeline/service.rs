//! Service facade wiring extraction, embedding, storage, and ranking.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cancel::CancelToken;
use crate::config::{Config, ConfigError, EmbeddingProvider, StoreBackend};
use crate::embedding::{
    Embedder, EmbeddingError, HashingEmbedder, HuggingFaceEmbedder, OpenAiEmbedder,
};
use crate::metrics::{IngestionMetrics, MetricsSnapshot};
use crate::ranking::{LinearScanRanker, QueryResult, Ranker};
use crate::source::{FileFetcher, RemoteFile, TokenProvider};
use crate::store::{
    DiskStore, Document, DocumentId, DocumentStore, MemoryStore, StoreError, VectorBinding,
};

use super::batch::run_batch;
use super::types::{
    BuildError, FailureReason, FileInput, IngestionOutcome, IngestionReport, ReplacePolicy,
    SearchError,
};

/// Extraction fan-out used when the caller does not pick one.
const DEFAULT_EXTRACTION_LIMIT: usize = 4;

/// Coordinates the full ingestion and retrieval pipeline.
///
/// The service owns long-lived handles to the embedding backend, the
/// document store, and the ranking strategy so every surface reuses the
/// same components. Construct it once near process start and share it
/// through an `Arc`.
pub struct DocumentService {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn DocumentStore>,
    ranker: Arc<dyn Ranker>,
    policy: ReplacePolicy,
    extraction_limit: usize,
    metrics: Arc<IngestionMetrics>,
}

impl std::fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentService")
            .field("embedder", &self.embedder.backend_id())
            .field("policy", &self.policy)
            .field("extraction_limit", &self.extraction_limit)
            .finish_non_exhaustive()
    }
}

/// The operations external surfaces consume.
///
/// Deliberately small: everything else on [`DocumentService`] is
/// construction or diagnostics, and a test double only has to fake these
/// three calls.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Ingest a batch of files, returning one outcome per file in
    /// submission order. Never raises; per-file failures land in the
    /// report.
    async fn ingest_batch(&self, files: Vec<FileInput>, cancel: &CancelToken) -> IngestionReport;

    /// Embed `query` and return the `k` most similar documents, best
    /// first.
    async fn search(
        &self,
        query: &str,
        k: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<QueryResult>, SearchError>;

    /// Fetch a stored document by id.
    async fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError>;
}

impl DocumentService {
    /// Build a service over the given embedder and store, with linear scan
    /// ranking and name-based replacement.
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            embedder,
            store,
            ranker: Arc::new(LinearScanRanker::new()),
            policy: ReplacePolicy::default(),
            extraction_limit: DEFAULT_EXTRACTION_LIMIT,
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    /// Swap the ranking strategy.
    pub fn with_ranker(mut self, ranker: Arc<dyn Ranker>) -> Self {
        self.ranker = ranker;
        self
    }

    /// Choose how repeated names behave.
    pub fn with_replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cap concurrent extractions. Clamped to at least one.
    pub fn with_extraction_limit(mut self, limit: usize) -> Self {
        self.extraction_limit = limit.max(1);
        self
    }

    /// Assemble a service from configuration: embedding backend, store
    /// backend, and extraction limit.
    pub async fn from_config(config: &Config) -> Result<Self, BuildError> {
        let embedder: Arc<dyn Embedder> = match config.embedding_provider {
            EmbeddingProvider::Hashing => {
                Arc::new(HashingEmbedder::new(config.embedding_dimension))
            }
            EmbeddingProvider::OpenAi => {
                let api_key = config.openai_api_key.clone().ok_or_else(|| {
                    ConfigError::MissingVariable("OPENAI_API_KEY".to_string())
                })?;
                Arc::new(OpenAiEmbedder::new(
                    &config.openai_base_url,
                    api_key,
                    &config.embedding_model,
                    config.embedding_dimension,
                )?)
            }
            EmbeddingProvider::HuggingFace => {
                let api_key = config.huggingface_api_key.clone().ok_or_else(|| {
                    ConfigError::MissingVariable("HUGGINGFACE_API_KEY".to_string())
                })?;
                Arc::new(HuggingFaceEmbedder::new(
                    &config.huggingface_base_url,
                    api_key,
                    &config.embedding_model,
                    config.embedding_dimension,
                )?)
            }
        };

        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Disk => {
                let binding = VectorBinding::new(embedder.backend_id(), embedder.dimension());
                Arc::new(DiskStore::open(&config.data_dir, binding).await?)
            }
        };

        tracing::info!(
            provider = ?config.embedding_provider,
            backend = ?config.store_backend,
            dimension = config.embedding_dimension,
            deterministic = embedder.deterministic(),
            "Document service ready"
        );

        Ok(Self::new(embedder, store).with_extraction_limit(config.extraction_limit))
    }

    /// Fetch files from a remote source and ingest them as one batch.
    ///
    /// Fetch failures surface per file, in input order, exactly like local
    /// ingestion failures; a token acquisition failure fails the whole
    /// batch the same way.
    pub async fn ingest_remote(
        &self,
        token_provider: &dyn TokenProvider,
        fetcher: &dyn FileFetcher,
        files: Vec<RemoteFile>,
        cancel: &CancelToken,
    ) -> IngestionReport {
        let token = match token_provider.bearer_token().await {
            Ok(token) => token,
            Err(error) => {
                tracing::warn!(error = %error, files = files.len(), "Token acquisition failed");
                let outcomes = files
                    .into_iter()
                    .map(|file| IngestionOutcome::Failed {
                        name: file.name,
                        reason: FailureReason::FetchError {
                            message: error.to_string(),
                        },
                    })
                    .collect();
                let report = IngestionReport { outcomes };
                self.metrics.record_batch(0, report.failed() as u64);
                return report;
            }
        };

        // One slot per reference keeps the final report in input order;
        // fetched inputs flow through the same batch as local files.
        let mut slots: Vec<Option<IngestionOutcome>> = Vec::with_capacity(files.len());
        let mut inputs = Vec::new();
        for file in files {
            if cancel.is_cancelled() {
                slots.push(Some(IngestionOutcome::Failed {
                    name: file.name,
                    reason: FailureReason::Cancelled,
                }));
                continue;
            }
            match fetcher.fetch(&file, &token).await {
                Ok(bytes) => {
                    inputs.push(FileInput::from_named_bytes(file.name, bytes));
                    slots.push(None);
                }
                Err(error) => {
                    tracing::warn!(
                        file = %file.name,
                        error = %error,
                        "Failed to fetch remote file"
                    );
                    slots.push(Some(IngestionOutcome::Failed {
                        name: file.name,
                        reason: FailureReason::FetchError {
                            message: error.to_string(),
                        },
                    }));
                }
            }
        }

        let fetch_failures = slots.iter().filter(|slot| slot.is_some()).count();
        let inner = self.ingest_batch(inputs, cancel).await;

        let mut inner_outcomes = inner.outcomes.into_iter();
        debug_assert_eq!(
            slots.iter().filter(|slot| slot.is_none()).count(),
            inner_outcomes.len()
        );
        let outcomes: Vec<IngestionOutcome> = slots
            .into_iter()
            .filter_map(|slot| slot.or_else(|| inner_outcomes.next()))
            .collect();

        self.metrics.record_batch(0, fetch_failures as u64);
        IngestionReport { outcomes }
    }

    /// Current counters for diagnostics.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Flush the underlying store.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.store.close().await
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn ingest_batch(&self, files: Vec<FileInput>, cancel: &CancelToken) -> IngestionReport {
        tracing::info!(files = files.len(), "Starting batch ingestion");
        let report = run_batch(
            self.embedder.as_ref(),
            self.store.as_ref(),
            self.policy,
            self.extraction_limit,
            files,
            cancel,
        )
        .await;
        self.metrics
            .record_batch(report.ingested() as u64, report.failed() as u64);
        report
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<QueryResult>, SearchError> {
        if k == 0 {
            return Err(SearchError::InvalidArgument(
                "k must be greater than zero".to_string(),
            ));
        }
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let mut vectors = self.embedder.embed(vec![query.to_string()]).await?;
        let vector = vectors.pop().ok_or_else(|| {
            SearchError::Embedding(EmbeddingError::MalformedResponse(
                "backend returned no vector for the query".to_string(),
            ))
        })?;
        let expected = self.embedder.dimension();
        if vector.len() != expected {
            return Err(SearchError::Embedding(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            }));
        }

        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let results = self.ranker.rank(self.store.as_ref(), &vector, k).await?;
        self.metrics.record_search();
        Ok(results)
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError> {
        self.store.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::source::{FetchError, StaticTokenProvider};

    fn config() -> Config {
        Config {
            embedding_provider: EmbeddingProvider::Hashing,
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            embedding_dimension: 32,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com".to_string(),
            huggingface_api_key: None,
            huggingface_base_url: "https://api-inference.huggingface.co".to_string(),
            store_backend: StoreBackend::Memory,
            data_dir: PathBuf::from("./data"),
            extraction_limit: 2,
        }
    }

    fn service() -> DocumentService {
        DocumentService::new(
            Arc::new(HashingEmbedder::new(32)),
            Arc::new(MemoryStore::new()),
        )
    }

    fn text_file(name: &str, content: &str) -> FileInput {
        FileInput::new(name, "txt", content.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn ingest_then_search_then_get() {
        let service = service();
        let cancel = CancelToken::new();

        let report = service
            .ingest_batch(
                vec![
                    text_file("rust.txt", "borrow checker lifetimes ownership"),
                    text_file("cooking.txt", "flour butter sugar pastry oven"),
                ],
                &cancel,
            )
            .await;
        assert_eq!(report.ingested(), 2);

        let results = service
            .search("ownership and the borrow checker", 1, &cancel)
            .await
            .expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "rust.txt");

        let document = service
            .get_document(&results[0].document_id)
            .await
            .expect("get");
        assert_eq!(document.name, "rust.txt");
        assert!(document.text.contains("borrow checker"));
    }

    #[tokio::test]
    async fn from_config_builds_a_working_service() {
        let service = DocumentService::from_config(&config())
            .await
            .expect("service");
        let report = service
            .ingest_batch(
                vec![text_file("memo.txt", "a few plain words")],
                &CancelToken::new(),
            )
            .await;
        assert_eq!(report.ingested(), 1);
    }

    #[tokio::test]
    async fn from_config_requires_a_key_for_remote_providers() {
        let mut remote = config();
        remote.embedding_provider = EmbeddingProvider::OpenAi;
        let error = DocumentService::from_config(&remote)
            .await
            .expect_err("should fail");
        assert!(matches!(
            error,
            BuildError::Config(ConfigError::MissingVariable(_))
        ));
    }

    #[tokio::test]
    async fn search_rejects_zero_k() {
        let service = service();
        let error = service
            .search("anything", 0, &CancelToken::new())
            .await
            .expect_err("should fail");
        assert!(matches!(error, SearchError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn search_observes_cancellation() {
        let service = service();
        let cancel = CancelToken::new();
        cancel.cancel();
        let error = service
            .search("anything", 3, &cancel)
            .await
            .expect_err("should fail");
        assert!(matches!(error, SearchError::Cancelled));
    }

    #[tokio::test]
    async fn get_missing_document_is_not_found() {
        let service = service();
        let error = service
            .get_document(&DocumentId::from("missing"))
            .await
            .expect_err("should fail");
        assert!(matches!(error, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn metrics_track_batches_and_searches() {
        let service = service();
        let cancel = CancelToken::new();
        service
            .ingest_batch(
                vec![
                    text_file("good.txt", "useful words"),
                    FileInput::new("bad.odt", "odt", vec![0]),
                ],
                &cancel,
            )
            .await;
        service
            .search("useful", 1, &cancel)
            .await
            .expect("search");

        let snapshot = service.metrics_snapshot();
        assert_eq!(snapshot.documents_ingested, 1);
        assert_eq!(snapshot.documents_failed, 1);
        assert_eq!(snapshot.searches_run, 1);
    }

    struct StubFetcher;

    #[async_trait]
    impl FileFetcher for StubFetcher {
        async fn fetch(&self, file: &RemoteFile, token: &str) -> Result<Vec<u8>, FetchError> {
            assert_eq!(token, "token-1");
            match file.id.as_str() {
                "ok" => Ok(b"remote file words".to_vec()),
                _ => Err(FetchError::Token("no such file".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn remote_fetch_failures_keep_their_slot() {
        let service = service();
        let provider = StaticTokenProvider::new("token-1");
        let report = service
            .ingest_remote(
                &provider,
                &StubFetcher,
                vec![
                    RemoteFile {
                        id: "ok".to_string(),
                        name: "notes.txt".to_string(),
                    },
                    RemoteFile {
                        id: "gone".to_string(),
                        name: "missing.txt".to_string(),
                    },
                ],
                &CancelToken::new(),
            )
            .await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes[0].is_ingested());
        assert_eq!(report.outcomes[0].name(), "notes.txt");
        assert!(matches!(
            &report.outcomes[1],
            IngestionOutcome::Failed {
                reason: FailureReason::FetchError { .. },
                ..
            }
        ));
    }

    struct FailingTokens;

    #[async_trait]
    impl TokenProvider for FailingTokens {
        async fn bearer_token(&self) -> Result<String, FetchError> {
            Err(FetchError::Token("provider offline".to_string()))
        }
    }

    #[tokio::test]
    async fn token_failure_fails_the_whole_remote_batch() {
        let service = service();
        let report = service
            .ingest_remote(
                &FailingTokens,
                &StubFetcher,
                vec![RemoteFile {
                    id: "ok".to_string(),
                    name: "notes.txt".to_string(),
                }],
                &CancelToken::new(),
            )
            .await;

        assert_eq!(report.failed(), 1);
        assert!(matches!(
            &report.outcomes[0],
            IngestionOutcome::Failed {
                reason: FailureReason::FetchError { .. },
                ..
            }
        ));
    }
}
