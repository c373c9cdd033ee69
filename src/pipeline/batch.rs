//! Batch ingestion stages: extract, embed, commit.
//!
//! Files are isolated from each other: one bad file changes nothing about
//! its neighbours. The whole batch shares a single embedding call, and the
//! report keeps one slot per input file in submission order.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio::task;
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::embedding::Embedder;
use crate::extract::{self, SourceFormat};
use crate::store::{Document, DocumentId, DocumentStore};

use super::types::{FailureReason, FileInput, IngestionOutcome, IngestionReport, ReplacePolicy};

struct Extracted {
    index: usize,
    name: String,
    format: SourceFormat,
    text: String,
}

/// Run one batch through all three stages.
///
/// Every slot starts as a cancelled failure; each stage overwrites the
/// slots it completes. A file dropped at any point therefore still carries
/// an explicit outcome, and cancellation between stages leaves committed
/// documents in place.
pub(crate) async fn run_batch(
    embedder: &dyn Embedder,
    store: &dyn DocumentStore,
    policy: ReplacePolicy,
    extraction_limit: usize,
    files: Vec<FileInput>,
    cancel: &CancelToken,
) -> IngestionReport {
    let total = files.len();
    let mut outcomes: Vec<IngestionOutcome> = files
        .iter()
        .map(|file| IngestionOutcome::Failed {
            name: file.name.clone(),
            reason: FailureReason::Cancelled,
        })
        .collect();

    // Stage 1: extraction, fanned out on the blocking pool with a cap on
    // concurrent parses.
    let semaphore = Arc::new(Semaphore::new(extraction_limit.max(1)));
    let mut handles = Vec::with_capacity(total);
    for (index, file) in files.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            if cancel.is_cancelled() {
                return Err(FailureReason::Cancelled);
            }
            match task::spawn_blocking(move || {
                extract::extract(&file.bytes, &file.declared_format)
            })
            .await
            {
                Ok(result) => result.map_err(FailureReason::from),
                Err(join_error) => Err(FailureReason::ExtractionError {
                    message: join_error.to_string(),
                }),
            }
        });
        handles.push((index, handle));
    }

    let mut extracted: Vec<Extracted> = Vec::new();
    for (index, handle) in handles {
        let name = outcomes[index].name().to_string();
        match handle.await {
            Ok(Ok((format, text))) => extracted.push(Extracted {
                index,
                name,
                format,
                text,
            }),
            Ok(Err(reason)) => {
                tracing::debug!(file = %name, reason = ?reason, "File failed extraction");
                outcomes[index] = IngestionOutcome::Failed { name, reason };
            }
            Err(join_error) => {
                outcomes[index] = IngestionOutcome::Failed {
                    name,
                    reason: FailureReason::ExtractionError {
                        message: join_error.to_string(),
                    },
                };
            }
        }
    }

    if cancel.is_cancelled() {
        return IngestionReport { outcomes };
    }

    // Stage 2: one embedding call covers the surviving files.
    let texts: Vec<String> = extracted.iter().map(|item| item.text.clone()).collect();
    let vectors = if texts.is_empty() {
        Vec::new()
    } else {
        match embedder.embed(texts).await {
            Ok(vectors) if vectors.len() == extracted.len() => vectors,
            Ok(vectors) => {
                let message = format!(
                    "expected {} vectors, got {}",
                    extracted.len(),
                    vectors.len()
                );
                fail_pending(&mut outcomes, extracted, &message);
                return IngestionReport { outcomes };
            }
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    files = extracted.len(),
                    "Embedding failed for batch"
                );
                fail_pending(&mut outcomes, extracted, &error.to_string());
                return IngestionReport { outcomes };
            }
        }
    };

    // Stage 3: commit one document at a time; earlier commits survive a
    // later failure or cancellation.
    debug_assert_eq!(extracted.len(), vectors.len());
    let dimension = embedder.dimension();
    let mut ingested = 0usize;
    for (item, vector) in extracted.into_iter().zip(vectors.into_iter()) {
        if cancel.is_cancelled() {
            break;
        }
        if vector.len() != dimension {
            outcomes[item.index] = IngestionOutcome::Failed {
                name: item.name,
                reason: FailureReason::EmbeddingError {
                    message: format!(
                        "expected vectors of dimension {dimension}, got {}",
                        vector.len()
                    ),
                },
            };
            continue;
        }

        let id = derive_id(policy, &item.name);
        let document = Document {
            id: id.clone(),
            name: item.name.clone(),
            source_format: item.format,
            text: item.text,
            vector,
            ingested_at: now_rfc3339(),
        };
        match store.put(document).await {
            Ok(()) => {
                ingested += 1;
                outcomes[item.index] = IngestionOutcome::Ingested {
                    name: item.name,
                    document_id: id,
                };
            }
            Err(error) => {
                tracing::warn!(file = %item.name, error = %error, "Failed to store document");
                outcomes[item.index] = IngestionOutcome::Failed {
                    name: item.name,
                    reason: FailureReason::StorageError {
                        message: error.to_string(),
                    },
                };
            }
        }
    }

    tracing::info!(
        files = total,
        ingested,
        failed = total - ingested,
        "Batch ingestion finished"
    );
    IngestionReport { outcomes }
}

fn fail_pending(outcomes: &mut [IngestionOutcome], extracted: Vec<Extracted>, message: &str) {
    for item in extracted {
        outcomes[item.index] = IngestionOutcome::Failed {
            name: item.name,
            reason: FailureReason::EmbeddingError {
                message: message.to_string(),
            },
        };
    }
}

fn derive_id(policy: ReplacePolicy, name: &str) -> DocumentId {
    match policy {
        ReplacePolicy::ReplaceByName => {
            DocumentId::from(hex::encode(Sha256::digest(name.as_bytes())))
        }
        ReplacePolicy::AlwaysNew => DocumentId::from(Uuid::new_v4().to_string()),
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::store::MemoryStore;

    fn text_file(name: &str, content: &str) -> FileInput {
        FileInput::new(name, "txt", content.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn bad_files_do_not_affect_neighbours() {
        let embedder = HashingEmbedder::new(16);
        let store = MemoryStore::new();
        let files = vec![
            text_file("first.txt", "rust ownership rules"),
            FileInput::new("slides.odt", "odt", vec![1, 2, 3]),
            text_file("third.txt", "async runtimes compared"),
        ];

        let report = run_batch(
            &embedder,
            &store,
            ReplacePolicy::ReplaceByName,
            2,
            files,
            &CancelToken::new(),
        )
        .await;

        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcomes[0].is_ingested());
        assert_eq!(
            report.outcomes[1],
            IngestionOutcome::Failed {
                name: "slides.odt".to_string(),
                reason: FailureReason::UnsupportedFormat {
                    declared: "odt".to_string()
                },
            }
        );
        assert!(report.outcomes[2].is_ingested());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn outcomes_keep_submission_order() {
        let embedder = HashingEmbedder::new(16);
        let store = MemoryStore::new();
        let files: Vec<FileInput> = (0..8)
            .map(|i| text_file(&format!("file-{i}.txt"), "some words here"))
            .collect();

        let report = run_batch(
            &embedder,
            &store,
            ReplacePolicy::AlwaysNew,
            3,
            files,
            &CancelToken::new(),
        )
        .await;

        let names: Vec<&str> = report.outcomes.iter().map(|o| o.name()).collect();
        let expected: Vec<String> = (0..8).map(|i| format!("file-{i}.txt")).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn cancelled_batch_commits_nothing() {
        let embedder = HashingEmbedder::new(16);
        let store = MemoryStore::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let report = run_batch(
            &embedder,
            &store,
            ReplacePolicy::ReplaceByName,
            2,
            vec![text_file("a.txt", "alpha"), text_file("b.txt", "beta")],
            &cancel,
        )
        .await;

        assert_eq!(report.ingested(), 0);
        assert!(report.outcomes.iter().all(|outcome| matches!(
            outcome,
            IngestionOutcome::Failed {
                reason: FailureReason::Cancelled,
                ..
            }
        )));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn replace_by_name_reuses_the_id() {
        let embedder = HashingEmbedder::new(16);
        let store = MemoryStore::new();

        for content in ["first version", "second version"] {
            run_batch(
                &embedder,
                &store,
                ReplacePolicy::ReplaceByName,
                1,
                vec![text_file("notes.txt", content)],
                &CancelToken::new(),
            )
            .await;
        }

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn always_new_accumulates_documents() {
        let embedder = HashingEmbedder::new(16);
        let store = MemoryStore::new();

        for _ in 0..2 {
            run_batch(
                &embedder,
                &store,
                ReplacePolicy::AlwaysNew,
                1,
                vec![text_file("notes.txt", "same content")],
                &CancelToken::new(),
            )
            .await;
        }

        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn empty_batch_produces_empty_report() {
        let embedder = HashingEmbedder::new(16);
        let store = MemoryStore::new();
        let report = run_batch(
            &embedder,
            &store,
            ReplacePolicy::ReplaceByName,
            1,
            Vec::new(),
            &CancelToken::new(),
        )
        .await;
        assert!(report.outcomes.is_empty());
    }
}
