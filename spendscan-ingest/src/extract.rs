//! PDF bytes -> ordered page text, via lopdf.

use lopdf::Document;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("not a PDF document (missing %PDF header)")]
    NotPdf,
    #[error("PDF structure could not be read: {0}")]
    Malformed(String),
    #[error("PDF is encrypted and cannot be opened without a password")]
    Encrypted,
    #[error("PDF has no pages")]
    NoPages,
    #[error("PDF contains no extractable text (image-only scan?)")]
    NoText,
}

/// The header may be preceded by junk bytes; readers accept it within the first KiB.
const HEADER_SEARCH_WINDOW: usize = 1024;

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// Extract the text of every page, page 1 first.
///
/// A page whose content cannot be decoded yields an empty string; the
/// document only fails when no page has any text at all.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    if !has_pdf_header(bytes) {
        return Err(ExtractError::NotPdf);
    }

    let mut doc = Document::load_mem(bytes).map_err(|e| ExtractError::Malformed(e.to_string()))?;
    if doc.is_encrypted() {
        doc.decrypt("").map_err(|_| ExtractError::Encrypted)?;
    }

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(ExtractError::NoPages);
    }

    let mut out = Vec::with_capacity(pages.len());
    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) => out.push(text),
            Err(e) => {
                debug!(page = *page_number, error = %e, "page text not decodable");
                out.push(String::new());
            }
        }
    }

    if out.iter().all(|p| p.trim().is_empty()) {
        return Err(ExtractError::NoText);
    }
    debug!(pages = out.len(), "extracted pdf text");
    Ok(out)
}
