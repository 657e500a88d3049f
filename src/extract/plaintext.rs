//! Plaintext extractor
//!
//! Reads text files as lossy UTF-8 and produces a 1:1 position map. Lines
//! that could never hold a finding (too short, comment markers, mostly
//! non-alphanumeric) are left out of the position map only; the body text
//! always carries every line.

use super::{
    basename, ExtractedPayload, ExtractorId, MappingMethod, PositionMap, PositionMapping,
    Preprocessor, ProcessContext,
};
use crate::error::{FerretError, FerretResult};
use crate::limits::{FileClass, Limits, MAX_TEXT_LINES};
use crate::observer::ScanObserver;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

const COMMENT_MARKERS: &[&str] = &["//", "#", "/*", "*", ";", "--", "<!--"];

pub struct PlaintextExtractor {
    limits: Limits,
    observer: Option<Arc<ScanObserver>>,
}

impl PlaintextExtractor {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            observer: None,
        }
    }

    /// Extract directly from bytes already in memory. The router uses this
    /// for the plaintext fallback after a structured extractor fails.
    pub fn process_bytes(&self, path: &Path, bytes: &[u8]) -> ExtractedPayload {
        let text = String::from_utf8_lossy(bytes);
        self.build_payload(path, &text)
    }

    fn build_payload(&self, path: &Path, text: &str) -> ExtractedPayload {
        let mut body = String::with_capacity(text.len());
        let mut map = PositionMap::default();
        let mut offset = 0usize;

        for (idx, line) in text.lines().enumerate() {
            if idx >= MAX_TEXT_LINES {
                break;
            }
            let line_number = idx + 1;
            if mappable(line) {
                map.push(PositionMapping {
                    extracted_line: line_number,
                    extracted_start: 0,
                    extracted_end: line.len(),
                    extracted_offset: offset,
                    original_page: 1,
                    original_line: line_number,
                    original_char_offset: offset,
                    bbox: None,
                    confidence: 1.0,
                    method: MappingMethod::Exact,
                });
            }
            body.push_str(line);
            body.push('\n');
            offset += line.len() + 1;
        }

        let mut payload = ExtractedPayload::empty(path, ExtractorId::Plaintext).with_text_stats(body);
        payload.page_count = 1;
        payload.position_map = Some(map);
        payload.filename = basename(path);
        payload
    }
}

/// Lines excluded from the position map. This is a redaction-mapping
/// optimisation, never a drop from the body text.
fn mappable(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.len() < 3 {
        return false;
    }
    if COMMENT_MARKERS.iter().any(|m| trimmed.starts_with(m)) {
        return false;
    }
    let alnum = trimmed.chars().filter(|c| c.is_alphanumeric()).count();
    (alnum as f64) / (trimmed.chars().count() as f64) >= 0.30
}

impl Preprocessor for PlaintextExtractor {
    fn name(&self) -> &'static str {
        "plaintext"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[
            "txt", "md", "rst", "log", "csv", "tsv", "json", "yaml", "yml", "toml", "ini", "cfg",
            "conf", "env", "xml", "html", "htm", "sh", "bash", "zsh", "ps1", "bat", "py", "rb",
            "js", "ts", "go", "rs", "java", "c", "cpp", "h", "hpp", "cs", "php", "swift", "kt",
            "sql", "properties",
        ]
    }

    fn process(&self, path: &Path, ctx: &ProcessContext) -> FerretResult<ExtractedPayload> {
        ctx.check(path)?;

        let metadata = std::fs::metadata(path)
            .map_err(|e| FerretError::file_access(path, &e.to_string()))?;
        let limit = self.limits.max_size(FileClass::Text);
        if metadata.len() > limit {
            return Err(FerretError::file_too_large(path, metadata.len(), limit));
        }

        let file = File::open(path).map_err(|e| FerretError::file_access(path, &e.to_string()))?;
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::with_capacity(metadata.len() as usize);
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| FerretError::file_access(path, &e.to_string()))?;

        ctx.check(path)?;

        if let Some(obs) = &self.observer {
            obs.extractor_selected(&path.display().to_string(), self.name());
        }

        let text = String::from_utf8_lossy(&bytes);
        Ok(self.build_payload(path, &text))
    }

    fn set_observer(&mut self, observer: Arc<ScanObserver>) {
        self.observer = Some(observer);
    }
}
