//! DOCX text extraction from the Office Open XML container.
//!
//! A `.docx` file is a zip archive; the document body lives in
//! `word/document.xml` as `<w:t>` text runs grouped into `<w:p>`
//! paragraphs.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use super::{ExtractError, SourceFormat};

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract paragraph text in document order, joined by a single space.
pub(crate) fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let xml = read_document_part(bytes)?;
    paragraphs_from_xml(&xml)
}

fn read_document_part(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(docx_error)?;
    let mut part = archive.by_name(DOCUMENT_PART).map_err(docx_error)?;
    let mut xml = String::new();
    part.read_to_string(&mut xml).map_err(docx_error)?;
    Ok(xml)
}

fn paragraphs_from_xml(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) if start.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(end)) => match end.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    let paragraph = current.trim();
                    if !paragraph.is_empty() {
                        paragraphs.push(paragraph.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Text(text)) if in_text_run => {
                let value = text.unescape().map_err(docx_error)?;
                current.push_str(&value);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(docx_error(error)),
        }
    }

    // Text runs outside a closed paragraph only appear in malformed bodies;
    // keep them rather than lose content.
    let trailing = current.trim();
    if !trailing.is_empty() {
        paragraphs.push(trailing.to_string());
    }

    Ok(paragraphs.join(" "))
}

fn docx_error(error: impl Into<anyhow::Error>) -> ExtractError {
    ExtractError::Extraction {
        format: SourceFormat::Docx,
        source: error.into(),
    }
}
