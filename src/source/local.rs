//! Local filesystem source.

use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::pipeline::FileInput;

/// Collect every regular file under `root` as an ingestion input.
///
/// Names are paths relative to `root`, so re-ingesting the same tree
/// replaces documents instead of duplicating them. Entries come back in a
/// stable sorted order.
pub fn collect_dir(root: &Path) -> io::Result<Vec<FileInput>> {
    let mut inputs = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        let bytes = std::fs::read(entry.path())?;
        inputs.push(FileInput::from_named_bytes(name, bytes));
    }
    tracing::debug!(root = %root.display(), files = inputs.len(), "Collected local files");
    Ok(inputs)
}
