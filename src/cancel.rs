//! Cooperative cancellation for batch ingestion and search.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag checked between pipeline stages.
///
/// Cloning yields another handle to the same flag, so a caller can keep one
/// handle and pass the other into a running batch. Cancellation is
/// cooperative: documents already committed to the store stay committed,
/// and in-flight per-file work is reported as cancelled, never rolled back.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation on every handle to this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
