use thiserror::Error;

pub mod document;
pub mod extract;
pub mod parser;
pub mod types;

pub use document::{Document, Page};
pub use extract::{extract, extract_page, join_runs, TextSource};
pub use types::*;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },
    #[error("No readable text found")]
    NoExtractableText,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Convenience free functions (stateless, re-parse each call)
// ---------------------------------------------------------------------------

/// Extract the text of the whole document.
pub fn document_text(bytes: &[u8]) -> Result<String, PdfError> {
    extract(&Document::open(bytes)?)
}

/// Extract the text of one page.
pub fn page_text(bytes: &[u8], page: usize) -> Result<String, PdfError> {
    extract_page(&Document::open(bytes)?, page)
}

/// Get document metadata.
pub fn info(bytes: &[u8]) -> Result<DocumentMetadata, PdfError> {
    Ok(Document::open(bytes)?.metadata())
}
