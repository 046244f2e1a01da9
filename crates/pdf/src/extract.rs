//! Plain-text extraction over any page-addressable text source.

use crate::{PdfError, TextRun};

/// Anything that can hand out the text runs of its pages by 1-based number.
///
/// [`crate::Document`] is the production implementation; tests use in-memory
/// page lists.
pub trait TextSource {
    fn page_count(&self) -> usize;

    fn page_runs(&self, page: usize) -> Result<Vec<TextRun>, PdfError>;
}

/// Join a page's runs with single spaces.
pub fn join_runs(runs: &[TextRun]) -> String {
    runs.iter()
        .map(TextRun::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract the whole document: pages in ascending order, one line per page.
///
/// Any page failing to decode aborts the extraction.
pub fn extract(source: &dyn TextSource) -> Result<String, PdfError> {
    let pages = (1..=source.page_count())
        .map(|page| source.page_runs(page).map(|runs| join_runs(&runs)))
        .collect::<Result<Vec<_>, _>>()?;

    require_text(pages.join("\n"))
}

/// Extract a single page's text.
pub fn extract_page(source: &dyn TextSource, page: usize) -> Result<String, PdfError> {
    if page == 0 || page > source.page_count() {
        return Err(PdfError::PageOutOfRange {
            page,
            page_count: source.page_count(),
        });
    }

    require_text(join_runs(&source.page_runs(page)?))
}

fn require_text(text: String) -> Result<String, PdfError> {
    if text.trim().is_empty() {
        Err(PdfError::NoExtractableText)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pages given as lists of run texts; `None` marks a page that fails.
    struct Pages(Vec<Option<Vec<&'static str>>>);

    impl TextSource for Pages {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn page_runs(&self, page: usize) -> Result<Vec<TextRun>, PdfError> {
            match &self.0[page - 1] {
                Some(runs) => Ok(runs.iter().map(|t| TextRun::new(*t)).collect()),
                None => Err(PdfError::Parse(format!("page {} is corrupt", page))),
            }
        }
    }

    #[test]
    fn test_extract_joins_runs_and_pages() {
        let doc = Pages(vec![
            Some(vec!["Hello", "world"]),
            Some(vec!["Second", "page"]),
            Some(vec!["End"]),
        ]);
        assert_eq!(extract(&doc).unwrap(), "Hello world\nSecond page\nEnd");
    }

    #[test]
    fn test_extract_keeps_empty_pages_as_blank_lines() {
        let doc = Pages(vec![Some(vec!["One"]), Some(vec![]), Some(vec!["Three"])]);
        assert_eq!(extract(&doc).unwrap(), "One\n\nThree");
    }

    #[test]
    fn test_extract_whitespace_only_document() {
        let doc = Pages(vec![Some(vec![]), Some(vec!["  "]), Some(vec![])]);
        assert!(matches!(extract(&doc), Err(PdfError::NoExtractableText)));
    }

    #[test]
    fn test_extract_empty_document() {
        let doc = Pages(vec![]);
        assert!(matches!(extract(&doc), Err(PdfError::NoExtractableText)));
    }

    #[test]
    fn test_extract_aborts_on_decode_failure() {
        let doc = Pages(vec![Some(vec!["fine"]), None, Some(vec!["never read"])]);
        assert!(matches!(extract(&doc), Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_extract_page_scoped() {
        let doc = Pages(vec![
            Some(vec!["Hello world"]),
            Some(vec!["Other"]),
            Some(vec![]),
        ]);
        assert_eq!(extract_page(&doc, 1).unwrap(), "Hello world");
        assert!(matches!(
            extract_page(&doc, 3),
            Err(PdfError::NoExtractableText)
        ));
    }

    #[test]
    fn test_extract_page_out_of_range() {
        let doc = Pages(vec![Some(vec!["only"])]);
        assert!(matches!(
            extract_page(&doc, 0),
            Err(PdfError::PageOutOfRange { page: 0, page_count: 1 })
        ));
        assert!(matches!(
            extract_page(&doc, 2),
            Err(PdfError::PageOutOfRange { page: 2, .. })
        ));
    }
}
