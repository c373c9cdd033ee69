//! Versioned on-disk record format.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! [version: u8] [backend id length: u8] [backend id bytes]
//! [dimension: u32] [vector: dimension x f32]
//! [metadata length: u32] [metadata JSON]
//! ```
//!
//! The version byte leads so that an embedder change, a layout change, or a
//! truncated write is caught loudly instead of silently skewing similarity
//! scores against stale vectors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Document, DocumentId};
use crate::extract::SourceFormat;

/// Current record format version.
pub(crate) const RECORD_VERSION: u8 = 1;

/// Failures while encoding or decoding a persisted record.
#[derive(Debug, Error)]
pub(crate) enum RecordError {
    /// Record was written by an unknown format version.
    #[error("unsupported record version {0}")]
    UnsupportedVersion(u8),
    /// Record ends before the named field is complete.
    #[error("record truncated in {0}")]
    Truncated(&'static str),
    /// Backend identifier bytes are not valid UTF-8.
    #[error("backend identifier is not valid UTF-8")]
    BackendId,
    /// Metadata payload does not parse as JSON.
    #[error("metadata does not parse: {0}")]
    Metadata(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct RecordMeta {
    id: DocumentId,
    name: String,
    source_format: SourceFormat,
    text: String,
    ingested_at: String,
}

/// A decoded record: the document plus the embedding backend it was
/// written under.
pub(crate) struct DecodedRecord {
    pub(crate) backend_id: String,
    pub(crate) document: Document,
}

/// Serialize a document under the given embedding backend identifier.
pub(crate) fn encode(document: &Document, backend_id: &str) -> Result<Vec<u8>, RecordError> {
    let meta = RecordMeta {
        id: document.id.clone(),
        name: document.name.clone(),
        source_format: document.source_format,
        text: document.text.clone(),
        ingested_at: document.ingested_at.clone(),
    };
    let meta_bytes = serde_json::to_vec(&meta)?;
    let id_bytes = backend_id.as_bytes();
    debug_assert!(id_bytes.len() <= u8::MAX as usize);

    let mut out =
        Vec::with_capacity(2 + id_bytes.len() + 8 + document.vector.len() * 4 + meta_bytes.len());
    out.push(RECORD_VERSION);
    out.push(id_bytes.len() as u8);
    out.extend_from_slice(id_bytes);
    out.extend_from_slice(&(document.vector.len() as u32).to_le_bytes());
    for value in &document.vector {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out.extend_from_slice(&(meta_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&meta_bytes);
    Ok(out)
}

/// Parse a persisted record back into a document.
pub(crate) fn decode(bytes: &[u8]) -> Result<DecodedRecord, RecordError> {
    let mut pos = 0usize;

    let version = *take(bytes, &mut pos, 1, "version")?
        .first()
        .ok_or(RecordError::Truncated("version"))?;
    if version != RECORD_VERSION {
        return Err(RecordError::UnsupportedVersion(version));
    }

    let id_len = *take(bytes, &mut pos, 1, "backend id length")?
        .first()
        .ok_or(RecordError::Truncated("backend id length"))? as usize;
    let backend_id = std::str::from_utf8(take(bytes, &mut pos, id_len, "backend id")?)
        .map_err(|_| RecordError::BackendId)?
        .to_string();

    let dimension = read_u32(bytes, &mut pos, "dimension")? as usize;
    let vector_bytes = take(bytes, &mut pos, dimension * 4, "vector")?;
    let mut vector = Vec::with_capacity(dimension);
    for chunk in vector_bytes.chunks_exact(4) {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(chunk);
        vector.push(f32::from_le_bytes(raw));
    }

    let meta_len = read_u32(bytes, &mut pos, "metadata length")? as usize;
    let meta_bytes = take(bytes, &mut pos, meta_len, "metadata")?;
    let meta: RecordMeta = serde_json::from_slice(meta_bytes)?;

    Ok(DecodedRecord {
        backend_id,
        document: Document {
            id: meta.id,
            name: meta.name,
            source_format: meta.source_format,
            text: meta.text,
            vector,
            ingested_at: meta.ingested_at,
        },
    })
}

fn take<'a>(
    bytes: &'a [u8],
    pos: &mut usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], RecordError> {
    let end = pos.checked_add(len).ok_or(RecordError::Truncated(what))?;
    if end > bytes.len() {
        return Err(RecordError::Truncated(what));
    }
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}

fn read_u32(bytes: &[u8], pos: &mut usize, what: &'static str) -> Result<u32, RecordError> {
    let slice = take(bytes, pos, 4, what)?;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(slice);
    Ok(u32::from_le_bytes(raw))
}
