use std::collections::BTreeMap;

use crate::extract::TextSource;
use crate::parser::backend::{LopdfBackend, PageId, PdfBackend};
use crate::parser::runs::extract_page_runs;
use crate::{DocumentMetadata, PdfError, TextRun};

/// An opened PDF.
///
/// Pages are addressed by their 1-based number, in document order.
pub struct Document {
    backend: LopdfBackend,
    pages: BTreeMap<u32, PageId>,
}

impl Document {
    /// Decode PDF bytes into a document handle.
    pub fn open(bytes: &[u8]) -> Result<Self, PdfError> {
        let backend = LopdfBackend::parse(bytes)?;
        let pages = backend.page_ids();
        log::debug!("opened document with {} pages", pages.len());
        Ok(Document { backend, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Look up a page by its 1-based number.
    pub fn page(&self, number: usize) -> Result<Page<'_>, PdfError> {
        let id = u32::try_from(number)
            .ok()
            .and_then(|n| self.pages.get(&n))
            .copied()
            .ok_or(PdfError::PageOutOfRange {
                page: number,
                page_count: self.page_count(),
            })?;

        Ok(Page {
            doc: self,
            number,
            id,
        })
    }

    pub fn metadata(&self) -> DocumentMetadata {
        let raw = self.backend.info_strings();
        DocumentMetadata {
            title: raw.get("Title").cloned(),
            author: raw.get("Author").cloned(),
            page_count: self.page_count(),
            creator: raw.get("Creator").cloned(),
        }
    }
}

/// A single page of a [`Document`].
pub struct Page<'a> {
    doc: &'a Document,
    number: usize,
    id: PageId,
}

impl Page<'_> {
    pub fn number(&self) -> usize {
        self.number
    }

    /// The page's recognized text runs, in content-stream order.
    pub fn text_content(&self) -> Result<Vec<TextRun>, PdfError> {
        extract_page_runs(&self.doc.backend, self.id)
    }
}

impl TextSource for Document {
    fn page_count(&self) -> usize {
        Document::page_count(self)
    }

    fn page_runs(&self, page: usize) -> Result<Vec<TextRun>, PdfError> {
        self.page(page)?.text_content()
    }
}
