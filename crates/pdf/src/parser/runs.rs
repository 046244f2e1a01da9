//! Text-run extraction from page content streams.
//!
//! Every text-showing operator (`Tj`, `TJ`, `'`, `"`) yields at most one
//! [`TextRun`], in content-stream order. Positioning operators are not
//! tracked: the reader only needs the recognized text in reading order, not
//! its layout.

use super::backend::{PageId, PdfBackend, PdfValue};
use crate::{PdfError, TextRun};

/// A `TJ` adjustment more negative than this (in thousandths of an em) is a
/// word gap rather than kerning.
const WORD_GAP_THOUSANDTHS: f32 = 200.0;

/// Walk a page's content stream and return its text runs.
pub fn extract_page_runs(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<TextRun>, PdfError> {
    let ops = backend.operations(page_id)?;

    let mut font_key: Vec<u8> = Vec::new();
    let mut runs = Vec::new();

    for op in &ops {
        let text = match op.operator.as_str() {
            "Tf" => {
                if let Some(PdfValue::Name(key)) = op.operands.first() {
                    font_key = key.clone();
                }
                continue;
            }
            "Tj" | "'" => op
                .operands
                .first()
                .map(|v| decode_operand(v, backend, page_id, &font_key)),
            // " aw ac string
            "\"" => op
                .operands
                .get(2)
                .map(|v| decode_operand(v, backend, page_id, &font_key)),
            "TJ" => match op.operands.first() {
                Some(PdfValue::Array(items)) => {
                    Some(join_tj_items(items, backend, page_id, &font_key))
                }
                _ => None,
            },
            _ => continue,
        };

        if let Some(text) = text {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                runs.push(TextRun::new(trimmed));
            }
        }
    }

    Ok(runs)
}

fn decode_operand(
    val: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    font_key: &[u8],
) -> String {
    match val {
        PdfValue::Str(bytes) => backend.decode_text(page_id, font_key, bytes),
        _ => String::new(),
    }
}

/// Concatenate the strings of a `TJ` array, turning wide negative
/// adjustments into single spaces.
fn join_tj_items(
    items: &[PdfValue],
    backend: &dyn PdfBackend,
    page_id: PageId,
    font_key: &[u8],
) -> String {
    let mut buf = String::new();

    for item in items {
        match item {
            PdfValue::Str(_) => buf.push_str(&decode_operand(item, backend, page_id, font_key)),
            other => {
                let gap = other
                    .as_number()
                    .is_some_and(|adj| adj <= -WORD_GAP_THOUSANDTHS);
                if gap && !buf.is_empty() && !buf.ends_with(' ') {
                    buf.push(' ');
                }
            }
        }
    }

    buf
}
