//! PDF text extraction, page by page.

use lopdf::Document;

use super::{ExtractError, SourceFormat};

/// Extract text from every page of a PDF, joined in page order by a single
/// space.
///
/// Pages that fail to yield text are skipped so one damaged page does not
/// discard the rest of the document; the skip is logged at debug.
pub(crate) fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let document = Document::load_mem(bytes).map_err(|error| ExtractError::Extraction {
        format: SourceFormat::Pdf,
        source: anyhow::Error::new(error),
    })?;

    let mut pages: Vec<String> = Vec::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    pages.push(trimmed.to_string());
                }
            }
            Err(error) => {
                tracing::debug!(page = page_number, error = %error, "Skipping unreadable PDF page");
            }
        }
    }

    Ok(pages.join(" "))
}
