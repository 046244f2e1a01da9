//! The seam between text extraction and lopdf.

use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Object, ObjectId};

use crate::PdfError;

/// Object number and generation of a page dictionary.
pub type PageId = ObjectId;

/// Operand of a content-stream operator, reduced to what text extraction
/// looks at.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

impl PdfValue {
    pub fn as_number(&self) -> Option<f32> {
        match *self {
            PdfValue::Integer(n) => Some(n as f32),
            PdfValue::Real(n) => Some(n),
            _ => None,
        }
    }
}

impl From<&Object> for PdfValue {
    fn from(object: &Object) -> Self {
        match object {
            Object::Integer(n) => PdfValue::Integer(*n),
            Object::Real(n) => PdfValue::Real(*n),
            Object::Name(name) => PdfValue::Name(name.clone()),
            Object::String(bytes, _) => PdfValue::Str(bytes.clone()),
            Object::Array(items) => PdfValue::Array(items.iter().map(PdfValue::from).collect()),
            _ => PdfValue::Other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    pub fn new(operator: &str, operands: Vec<PdfValue>) -> Self {
        ContentOp {
            operator: operator.to_string(),
            operands,
        }
    }
}

/// Decode a PDF string without font information: UTF-16BE when it carries
/// a byte-order mark, UTF-8 when valid, Latin-1 otherwise.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => utf16be(utf16),
        None => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_owned(),
            Err(_) => bytes.iter().copied().map(char::from).collect(),
        },
    }
}

/// A dangling odd byte is ignored.
fn utf16be(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// What run extraction needs from a parsed PDF.
pub trait PdfBackend {
    /// Page ids keyed by 1-based page number.
    fn page_ids(&self) -> BTreeMap<u32, PageId>;

    /// The decoded operations of a page's content stream(s).
    fn operations(&self, page: PageId) -> Result<Vec<ContentOp>, PdfError>;

    /// Turn the bytes of a text operand into text, using the encoding of the
    /// font selected with `Tf` when it says anything useful.
    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String;
}

pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    pub fn parse(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;
        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }
        Ok(LopdfBackend { doc })
    }

    /// `Title`, `Author` and `Creator` from the Info dictionary, skipping
    /// entries that are missing or not strings.
    pub fn info_strings(&self) -> BTreeMap<String, String> {
        let Some(info) = self.info_dictionary() else {
            return BTreeMap::new();
        };

        ["Title", "Author", "Creator"]
            .into_iter()
            .filter_map(|key| match info.get(key.as_bytes()) {
                Ok(Object::String(bytes, _)) => Some((key.to_string(), decode_pdf_string(bytes))),
                _ => None,
            })
            .collect()
    }

    fn info_dictionary(&self) -> Option<&Dictionary> {
        match self.doc.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    fn is_identity_encoded(&self, page: PageId, font_key: &[u8]) -> bool {
        let Ok(fonts) = self.doc.get_page_fonts(page) else {
            return false;
        };
        matches!(
            fonts.get(font_key).and_then(|font| font.get(b"Encoding").ok()),
            Some(Object::Name(name)) if name.starts_with(b"Identity")
        )
    }
}

impl PdfBackend for LopdfBackend {
    fn page_ids(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn operations(&self, page: PageId) -> Result<Vec<ContentOp>, PdfError> {
        let raw = self
            .doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("page {:?} has no readable content: {}", page, e)))?;
        let content = Content::decode(&raw)
            .map_err(|e| PdfError::Parse(format!("bad content stream on page {:?}: {}", page, e)))?;

        Ok(content
            .operations
            .iter()
            .map(|op| ContentOp {
                operator: op.operator.clone(),
                operands: op.operands.iter().map(PdfValue::from).collect(),
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String {
        // Identity-H/V fonts use two-byte codes that are usually UTF-16BE.
        if self.is_identity_encoded(page, font_key)
            && !bytes.is_empty()
            && bytes.len().is_multiple_of(2)
        {
            let text = utf16be(bytes);
            if text.chars().any(|c| c != char::REPLACEMENT_CHARACTER && c != '\0') {
                return text;
            }
        }

        decode_pdf_string(bytes)
    }
}
