//! Tracing setup shared by binaries and integration tests.
//!
//! Log lines always go to stdout through a compact formatter. A second,
//! ANSI-free copy is appended to a file so long ingestion runs can be
//! inspected after the fact: `DOCSHELF_LOG_FILE` selects the path, and when
//! it is unset the default is `logs/docshelf.log`. File output goes through
//! a non-blocking writer to keep disk latency away from ingestion workers.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global tracing subscriber.
///
/// Filtering follows `RUST_LOG` and falls back to `info`. The stdout layer
/// is always present; the file layer is skipped when no log file can be
/// opened. Call once per process.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout = fmt::layer().with_target(false).compact();
    let registry = tracing_subscriber::registry().with(filter).with(stdout);

    match file_writer() {
        Some(writer) => {
            let to_file = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(to_file).init();
        }
        None => registry.init(),
    }
}

/// Open the sink named by `DOCSHELF_LOG_FILE`, or the default file under
/// `logs/`, as a non-blocking writer.
///
/// Returns `None` when neither can be opened; the process then logs to
/// stdout only.
fn file_writer() -> Option<NonBlocking> {
    let (writer, guard) = match std::env::var("DOCSHELF_LOG_FILE") {
        Ok(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|err| eprintln!("Failed to open log file {path}: {err}"))
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        Err(_) => {
            if let Err(err) = std::fs::create_dir_all("logs") {
                eprintln!("Failed to create logs directory: {err}");
                return None;
            }
            let appender = tracing_appender::rolling::never("logs", "docshelf.log");
            tracing_appender::non_blocking(appender)
        }
    };
    let _ = FILE_GUARD.set(guard);
    Some(writer)
}
