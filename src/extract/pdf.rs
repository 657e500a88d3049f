//! PDF extractors
//!
//! Text extraction walks every page through lopdf and keeps a line-level
//! position map. Metadata extraction reads the document information
//! dictionary; a damaged file degrades to the minimal metadata record
//! instead of failing the file.

use super::{
    basename, minimal_metadata, ExtractedPayload, ExtractorId, MappingMethod, PositionMap,
    PositionMapping, Preprocessor, ProcessContext,
};
use crate::error::{FerretError, FerretResult};
use crate::limits::{FileClass, Limits};
use crate::observer::ScanObserver;
use lopdf::{Document, Object};
use std::path::Path;
use std::sync::Arc;

const PDF_EXTENSIONS: &[&str] = &["pdf"];

/// Info-dictionary keys worth surfacing, in output order.
const INFO_KEYS: &[&str] = &[
    "Title", "Author", "Subject", "Keywords", "Creator", "Producer", "CreationDate", "ModDate",
];

fn load_document(path: &Path, limits: &Limits) -> FerretResult<Document> {
    let metadata =
        std::fs::metadata(path).map_err(|e| FerretError::file_access(path, &e.to_string()))?;
    let limit = limits.max_size(FileClass::Pdf);
    if metadata.len() > limit {
        return Err(FerretError::file_too_large(path, metadata.len(), limit));
    }
    Document::load(path).map_err(|e| FerretError::parsing_failed(path, &e.to_string()))
}

/// Decode a PDF text string: UTF-16BE with BOM, else treat as Latin-1-ish
/// bytes and let lossy conversion clean it up.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&utf16)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

fn info_dictionary(doc: &Document) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let info = match doc.trailer.get(b"Info") {
        Ok(obj) => obj,
        Err(_) => return pairs,
    };
    let dict = match info {
        Object::Reference(id) => match doc.get_object(*id).and_then(|o| o.as_dict()) {
            Ok(d) => d,
            Err(_) => return pairs,
        },
        Object::Dictionary(d) => d,
        _ => return pairs,
    };
    for key in INFO_KEYS {
        if let Ok(Object::String(bytes, _)) = dict.get(key.as_bytes()) {
            let value = decode_pdf_string(bytes);
            let value = value.trim();
            if !value.is_empty() {
                pairs.push(((*key).to_string(), value.to_string()));
            }
        }
    }
    pairs
}

/// Extracts body text from PDF pages.
pub struct PdfTextExtractor {
    limits: Limits,
    observer: Option<Arc<ScanObserver>>,
}

impl PdfTextExtractor {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            observer: None,
        }
    }
}

impl Preprocessor for PdfTextExtractor {
    fn name(&self) -> &'static str {
        "pdf_text"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        PDF_EXTENSIONS
    }

    fn process(&self, path: &Path, ctx: &ProcessContext) -> FerretResult<ExtractedPayload> {
        ctx.check(path)?;
        let doc = load_document(path, &self.limits)?;
        if let Some(obs) = &self.observer {
            obs.extractor_selected(&path.display().to_string(), self.name());
        }

        let pages = doc.get_pages();
        let page_count = pages.len();
        let mut body = String::new();
        let mut map = PositionMap::default();
        let mut line_number = 0usize;
        let mut offset = 0usize;

        for page_num in pages.keys() {
            ctx.check(path)?;
            let page_text = match doc.extract_text(&[*page_num]) {
                Ok(text) => text,
                // One damaged page does not sink the document.
                Err(_) => continue,
            };
            for line in page_text.lines() {
                line_number += 1;
                let trimmed = line.trim_end();
                if !trimmed.trim().is_empty() {
                    map.push(PositionMapping {
                        extracted_line: line_number,
                        extracted_start: 0,
                        extracted_end: trimmed.len(),
                        extracted_offset: offset,
                        original_page: *page_num as usize,
                        original_line: line_number,
                        original_char_offset: offset,
                        bbox: None,
                        confidence: 0.75,
                        method: MappingMethod::LineApprox,
                    });
                }
                body.push_str(trimmed);
                body.push('\n');
                offset += trimmed.len() + 1;
            }
        }

        if body.is_empty() && page_count == 0 {
            return Err(FerretError::extraction_failed(path, "no readable pages"));
        }

        let mut payload = ExtractedPayload::empty(path, ExtractorId::PdfText).with_text_stats(body);
        payload.page_count = page_count;
        payload.position_map = Some(map);
        payload.filename = basename(path);
        Ok(payload)
    }

    fn set_observer(&mut self, observer: Arc<ScanObserver>) {
        self.observer = Some(observer);
    }
}

/// Extracts the PDF information dictionary as structured metadata.
pub struct PdfMetadataExtractor {
    limits: Limits,
    observer: Option<Arc<ScanObserver>>,
}

impl PdfMetadataExtractor {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            observer: None,
        }
    }
}

impl Preprocessor for PdfMetadataExtractor {
    fn name(&self) -> &'static str {
        "pdf_metadata"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        PDF_EXTENSIONS
    }

    fn process(&self, path: &Path, ctx: &ProcessContext) -> FerretResult<ExtractedPayload> {
        ctx.check(path)?;

        if let Some(obs) = &self.observer {
            obs.extractor_selected(&path.display().to_string(), self.name());
        }

        let mut payload = ExtractedPayload::empty(path, ExtractorId::PdfMetadata);
        match load_document(path, &self.limits) {
            Ok(doc) => {
                let mut pairs = info_dictionary(&doc);
                pairs.push(("PdfVersion".to_string(), doc.version.clone()));
                pairs.push(("PageCount".to_string(), doc.get_pages().len().to_string()));
                if doc.trailer.get(b"Encrypt").is_ok() {
                    pairs.push(("Encrypted".to_string(), "true".to_string()));
                }
                payload.structured_metadata = pairs;
                payload.page_count = doc.get_pages().len();
            }
            Err(e) if e.kind().allows_minimal_metadata() || e.kind() == crate::error::ErrorKind::ParsingFailed => {
                payload.structured_metadata =
                    minimal_metadata(path, Some("document information could not be parsed"));
            }
            Err(e) => return Err(e),
        }

        if payload.structured_metadata.is_empty() {
            payload.structured_metadata = minimal_metadata(path, None);
        }
        Ok(payload)
    }

    fn set_observer(&mut self, observer: Arc<ScanObserver>) {
        self.observer = Some(observer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf16_string() {
        // "Hi" in UTF-16BE with BOM
        let bytes = [0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        assert_eq!(decode_pdf_string(&bytes), "Hi");
    }

    #[test]
    fn test_decode_latin_string() {
        assert_eq!(decode_pdf_string(b"Jos\xE9"), "Jos\u{e9}");
    }

    #[test]
    fn test_corrupt_pdf_degrades_to_minimal_record() {
        let mut f = tempfile::NamedTempFile::with_suffix(".pdf").unwrap();
        std::io::Write::write_all(&mut f, b"%PDF-1.7 not really a pdf").unwrap();
        let extractor = PdfMetadataExtractor::new(Limits::new());
        let ctx = ProcessContext::standalone(std::time::Duration::from_secs(30));
        let payload = extractor.process(f.path(), &ctx).unwrap();
        assert!(payload.success);
        assert!(payload
            .structured_metadata
            .iter()
            .any(|(k, _)| k == "FileExtension"));
    }

    #[test]
    fn test_supported_extensions() {
        let text = PdfTextExtractor::new(Limits::new());
        assert!(text.can_process(Path::new("report.PDF")));
        assert!(!text.can_process(Path::new("report.docx")));
    }
}
