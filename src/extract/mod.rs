//! Text extraction from raw document bytes.
//!
//! Supported formats are enumerated by [`SourceFormat`]; anything else is
//! rejected with [`ExtractError::UnsupportedFormat`] instead of silently
//! yielding empty text. Underlying parser failures are surfaced uniformly
//! as [`ExtractError::Extraction`]; extraction never panics on malformed
//! input.

mod docx;
mod pdf;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// Plain UTF-8 text.
    Plain,
}

impl SourceFormat {
    /// Resolve an extension-style declared format, case-insensitively.
    ///
    /// `txt`, `text`, and `md` all resolve to [`SourceFormat::Plain`]; a
    /// leading dot is tolerated. Unknown declarations resolve to `None`.
    pub fn from_declared(declared: &str) -> Option<Self> {
        let normalized = declared.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" | "md" | "plain" => Some(Self::Plain),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Plain => "plain",
        };
        f.write_str(name)
    }
}

/// Errors raised while turning raw bytes into text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Declared format is not one the extractor supports.
    #[error("unsupported format '{declared}'")]
    UnsupportedFormat {
        /// Format string supplied with the input file.
        declared: String,
    },
    /// Underlying parser rejected the document bytes.
    #[error("failed to extract {format} content: {source}")]
    Extraction {
        /// Format that was being parsed when the failure occurred.
        format: SourceFormat,
        /// Underlying error raised by the parsing library.
        #[source]
        source: anyhow::Error,
    },
    /// The document parsed but yielded no usable text.
    #[error("document contains no extractable text")]
    EmptyContent,
}

/// Extract plain text from `bytes` according to the declared format.
///
/// Returns the resolved [`SourceFormat`] alongside the text so callers can
/// record what was actually parsed. Pages or paragraphs that fail to yield
/// text are skipped; the call only fails with
/// [`ExtractError::EmptyContent`] when nothing usable remains.
pub fn extract(bytes: &[u8], declared: &str) -> Result<(SourceFormat, String), ExtractError> {
    let format =
        SourceFormat::from_declared(declared).ok_or_else(|| ExtractError::UnsupportedFormat {
            declared: declared.to_string(),
        })?;

    let text = match format {
        SourceFormat::Pdf => pdf::extract_text(bytes)?,
        SourceFormat::Docx => docx::extract_text(bytes)?,
        SourceFormat::Plain => plain_text(bytes)?,
    };

    if text.trim().is_empty() {
        return Err(ExtractError::EmptyContent);
    }

    Ok((format, text))
}

fn plain_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let text = std::str::from_utf8(bytes).map_err(|error| ExtractError::Extraction {
        format: SourceFormat::Plain,
        source: anyhow::Error::new(error),
    })?;
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_formats_resolve_case_insensitively() {
        assert_eq!(SourceFormat::from_declared("PDF"), Some(SourceFormat::Pdf));
        assert_eq!(
            SourceFormat::from_declared(".docx"),
            Some(SourceFormat::Docx)
        );
        assert_eq!(SourceFormat::from_declared("md"), Some(SourceFormat::Plain));
        assert_eq!(SourceFormat::from_declared("xlsx"), None);
    }

    #[test]
    fn unsupported_declaration_is_an_error_not_empty_text() {
        let result = extract(b"anything", "xlsx");
        assert!(matches!(
            result,
            Err(ExtractError::UnsupportedFormat { declared }) if declared == "xlsx"
        ));
    }

    #[test]
    fn plain_text_roundtrips_utf8() {
        let (format, text) = extract("quarterly report".as_bytes(), "txt").expect("extract");
        assert_eq!(format, SourceFormat::Plain);
        assert_eq!(text, "quarterly report");
    }

    #[test]
    fn plain_text_rejects_invalid_utf8() {
        let result = extract(&[0xff, 0xfe, 0x00], "txt");
        assert!(matches!(
            result,
            Err(ExtractError::Extraction {
                format: SourceFormat::Plain,
                ..
            })
        ));
    }

    #[test]
    fn whitespace_only_plain_text_is_empty_content() {
        let result = extract("   \n\t  ".as_bytes(), "txt");
        assert!(matches!(result, Err(ExtractError::EmptyContent)));
    }
}
