//! Preprocessor set
//!
//! Extractors turn the bytes of one file into an [`ExtractedPayload`]
//! carrying body text and structured metadata. The router owns selection;
//! each extractor here only knows how to read its own formats.

pub mod image;
pub mod media;
pub mod office;
pub mod pdf;
pub mod plaintext;
pub mod streaming;

use crate::error::{FerretError, FerretResult};
use crate::observer::ScanObserver;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub use image::ImageMetadataExtractor;
pub use media::{AudioMetadataExtractor, VideoMetadataExtractor};
pub use office::{OfficeMetadataExtractor, OfficeTextExtractor};
pub use pdf::{PdfMetadataExtractor, PdfTextExtractor};
pub use plaintext::PlaintextExtractor;

/// Identifier of the extractor that produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorId {
    Plaintext,
    PdfText,
    OfficeText,
    ImageMetadata,
    PdfMetadata,
    OfficeMetadata,
    AudioMetadata,
    VideoMetadata,
    None,
}

impl ExtractorId {
    /// True for the metadata-only extractors. The METADATA detector runs
    /// exclusively on payloads where this returns true.
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            ExtractorId::ImageMetadata
                | ExtractorId::PdfMetadata
                | ExtractorId::OfficeMetadata
                | ExtractorId::AudioMetadata
                | ExtractorId::VideoMetadata
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorId::Plaintext => "plaintext",
            ExtractorId::PdfText => "pdf_text",
            ExtractorId::OfficeText => "office_text",
            ExtractorId::ImageMetadata => "image_metadata",
            ExtractorId::PdfMetadata => "pdf_metadata",
            ExtractorId::OfficeMetadata => "office_metadata",
            ExtractorId::AudioMetadata => "audio_metadata",
            ExtractorId::VideoMetadata => "video_metadata",
            ExtractorId::None => "none",
        }
    }
}

impl std::fmt::Display for ExtractorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a position mapping was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMethod {
    /// Byte-for-byte identity (plaintext)
    Exact,
    /// Line-level approximation (PDF/Office text)
    LineApprox,
    /// Page-level estimate (OCR-class extraction)
    PageEstimate,
}

/// One mapping from extracted text back to the original document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionMapping {
    pub extracted_line: usize,
    pub extracted_start: usize,
    pub extracted_end: usize,
    pub extracted_offset: usize,
    pub original_page: usize,
    pub original_line: usize,
    pub original_char_offset: usize,
    /// Bounding box in document units, when the format provides one.
    pub bbox: Option<[f64; 4]>,
    /// Mapping confidence in [0, 1].
    pub confidence: f64,
    pub method: MappingMethod,
}

/// Maps positions in extracted body text to positions in the original
/// document. Only consumed when redaction is enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionMap {
    pub mappings: Vec<PositionMapping>,
}

impl PositionMap {
    pub fn push(&mut self, mapping: PositionMapping) {
        debug_assert!((0.0..=1.0).contains(&mapping.confidence));
        self.mappings.push(mapping);
    }

    /// Find the mapping covering an extracted line, if any.
    pub fn lookup_line(&self, line: usize) -> Option<&PositionMapping> {
        self.mappings.iter().find(|m| m.extracted_line == line)
    }
}

/// Media file extracted out of a container (e.g. an image inside a DOCX),
/// staged in a temp directory for recursive processing.
#[derive(Debug, Clone)]
pub struct EmbeddedMedia {
    pub original_name: String,
    pub temp_path: PathBuf,
    pub media_type: String,
}

/// The product of one extractor for one file.
#[derive(Debug, Clone)]
pub struct ExtractedPayload {
    pub origin_path: String,
    pub filename: String,
    pub extractor_id: ExtractorId,
    pub body_text: String,
    /// Ordered key/value pairs; order is preserved through detection.
    pub structured_metadata: Vec<(String, String)>,
    pub page_count: usize,
    pub word_count: usize,
    pub char_count: usize,
    pub line_count: usize,
    pub success: bool,
    pub error: Option<String>,
    pub position_map: Option<PositionMap>,
    pub embedded_media: Vec<EmbeddedMedia>,
    /// Root of the temp tree holding embedded media. Dropping the payload
    /// (last clone) removes every temp file under it.
    pub temp_root: Option<Arc<tempfile::TempDir>>,
}

impl ExtractedPayload {
    /// An empty successful payload (used by the `none` extractor).
    pub fn empty(path: &Path, extractor_id: ExtractorId) -> Self {
        Self {
            origin_path: path.display().to_string(),
            filename: basename(path),
            extractor_id,
            body_text: String::new(),
            structured_metadata: Vec::new(),
            page_count: 0,
            word_count: 0,
            char_count: 0,
            line_count: 0,
            success: true,
            error: None,
            position_map: None,
            embedded_media: Vec::new(),
            temp_root: None,
        }
    }

    /// A failed payload. Carries no text and can never produce matches.
    pub fn failed(path: &Path, extractor_id: ExtractorId, error: String) -> Self {
        let mut payload = Self::empty(path, extractor_id);
        payload.success = false;
        payload.error = Some(error);
        payload
    }

    /// Fill word/char/line statistics from the body text.
    pub fn with_text_stats(mut self, body_text: String) -> Self {
        self.word_count = body_text.split_whitespace().count();
        self.char_count = body_text.chars().count();
        self.line_count = body_text.lines().count();
        self.body_text = body_text;
        self
    }

    pub fn has_body(&self) -> bool {
        self.success && !self.body_text.is_empty()
    }

    pub fn has_metadata(&self) -> bool {
        self.success && !self.structured_metadata.is_empty()
    }
}

/// Per-file processing context: one cancellation flag shared across the
/// scan plus this file's deadline. Extractors must call [`Self::check`]
/// at their suspension points.
#[derive(Debug, Clone)]
pub struct ProcessContext {
    cancelled: Arc<AtomicBool>,
    started: Instant,
    deadline: std::time::Duration,
}

impl ProcessContext {
    pub fn new(cancelled: Arc<AtomicBool>, deadline: std::time::Duration) -> Self {
        Self {
            cancelled,
            started: Instant::now(),
            deadline,
        }
    }

    /// Context with no external cancellation, for single-file entry points.
    pub fn standalone(deadline: std::time::Duration) -> Self {
        Self::new(Arc::new(AtomicBool::new(false)), deadline)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    /// Fails with `cancelled` or `timeout` when the budget is gone.
    pub fn check(&self, path: &Path) -> FerretResult<()> {
        if self.is_cancelled() {
            return Err(FerretError::Cancelled);
        }
        if self.started.elapsed() > self.deadline {
            return Err(FerretError::timeout(path, self.deadline.as_secs()));
        }
        Ok(())
    }

    /// Time left before this context's deadline.
    pub fn remaining(&self) -> std::time::Duration {
        self.deadline.saturating_sub(self.started.elapsed())
    }

    /// Derive a context for a child file (embedded media) sharing the
    /// cancellation flag but with a fresh deadline.
    pub fn child(&self, deadline: std::time::Duration) -> Self {
        Self::new(Arc::clone(&self.cancelled), deadline)
    }

    /// Derive a context whose budget is the smaller of `budget` and what
    /// remains on this context. Used for per-extractor deadlines inside
    /// the per-file one.
    pub fn child_limited(&self, budget: std::time::Duration) -> Self {
        Self::new(Arc::clone(&self.cancelled), budget.min(self.remaining()))
    }
}

/// Contract every preprocessor implements.
pub trait Preprocessor: Send + Sync {
    fn name(&self) -> &'static str;

    fn supported_extensions(&self) -> &'static [&'static str];

    fn can_process(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.supported_extensions().iter().any(|s| *s == ext)
            })
            .unwrap_or(false)
    }

    fn process(&self, path: &Path, ctx: &ProcessContext) -> FerretResult<ExtractedPayload>;

    fn set_observer(&mut self, observer: Arc<ScanObserver>);
}

/// Basename helper used wherever payloads and findings need one.
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Minimal metadata record: what a metadata extractor returns when the
/// format yields no tags or the header is damaged.
pub fn minimal_metadata(path: &Path, note: Option<&str>) -> Vec<(String, String)> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let mut pairs = vec![
        ("FileExtension".to_string(), extension),
        ("MimeType".to_string(), mime.essence_str().to_string()),
    ];
    if let Some(note) = note {
        pairs.push(("MetadataNote".to_string(), note.to_string()));
    }
    pairs
}
