//! The open PDF and its decoded pages.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdf::PdfError;
use readaloud_core::playback::ExtractionOutcome;

use crate::prelude::*;

/// PDF readers accept the header anywhere in the first kilobyte.
const HEADER_WINDOW: usize = 1024;

/// Text of every page, in page order.
type Pages = Vec<Result<String, ReaderError>>;

/// A PDF held in memory. The bytes are decoded once, by whichever
/// extraction comes first; later pages are served from that pass.
#[derive(Debug)]
pub struct LoadedDocument {
    path: PathBuf,
    bytes: Vec<u8>,
    decoded: OnceLock<Result<Pages, ReaderError>>,
}

impl LoadedDocument {
    /// Read `path`, refusing anything that does not look like a PDF.
    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .wrap_err_with(|| f!("Could not read {}", path.display()))?;
        Self::from_bytes(path, bytes)
    }

    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self> {
        if !looks_like_pdf(&bytes) {
            return Err(Error::NotAPdf(path.display().to_string()).into());
        }

        Ok(LoadedDocument {
            path: path.to_path_buf(),
            bytes,
            decoded: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Extract the text of `page`. Blocks while the document is decoded.
    pub fn extract(&self, page: usize) -> ExtractionOutcome {
        let pages = match self.pages() {
            Ok(pages) => pages,
            Err(e) => {
                return ExtractionOutcome {
                    page_count: None,
                    text: Err(e.clone()),
                }
            }
        };

        let page_count = pages.len();
        let text = match page.checked_sub(1).and_then(|index| pages.get(index)) {
            Some(text) => text.clone(),
            None => Err(ReaderError::PageOutOfRange { page, page_count }),
        };

        ExtractionOutcome {
            page_count: Some(page_count),
            text,
        }
    }

    fn pages(&self) -> &Result<Pages, ReaderError> {
        self.decoded.get_or_init(|| decode(&self.bytes))
    }
}

fn decode(bytes: &[u8]) -> Result<Pages, ReaderError> {
    let document = pdf::Document::open(bytes).map_err(reader_error)?;
    let page_count = document.page_count();
    log::debug!("decoded {} pages", page_count);

    Ok((1..=page_count)
        .map(|page| pdf::extract_page(&document, page).map_err(reader_error))
        .collect())
}

pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

pub fn reader_error(error: PdfError) -> ReaderError {
    match error {
        PdfError::NoExtractableText => ReaderError::NoExtractableText,
        PdfError::PageOutOfRange { page, page_count } => {
            ReaderError::PageOutOfRange { page, page_count }
        }
        other => ReaderError::Decode(other.to_string()),
    }
}
