//! File router
//!
//! Decides how each file is read: which extractors run, whether a failed
//! structured extraction falls back to plaintext, and how embedded media
//! recurse back through the router. One file can yield several payloads
//! (body text and structured metadata are separate partitions), each of
//! which flows through the detector set exactly once.

use crate::error::{ErrorKind, FerretError, FerretResult};
use crate::extract::{
    basename, AudioMetadataExtractor, ExtractedPayload, ExtractorId, ImageMetadataExtractor,
    OfficeMetadataExtractor, OfficeTextExtractor, PdfMetadataExtractor, PdfTextExtractor,
    PlaintextExtractor, Preprocessor, ProcessContext, VideoMetadataExtractor,
};
use crate::limits::Limits;
use crate::observer::ScanObserver;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Maximum nesting for media embedded in containers.
const MAX_EMBED_DEPTH: usize = 3;
const MAX_RETRIES: u32 = 3;

pub struct FileRouter {
    plaintext: PlaintextExtractor,
    pdf_text: PdfTextExtractor,
    pdf_metadata: PdfMetadataExtractor,
    office_text: OfficeTextExtractor,
    office_metadata: OfficeMetadataExtractor,
    image_metadata: ImageMetadataExtractor,
    audio_metadata: AudioMetadataExtractor,
    video_metadata: VideoMetadataExtractor,
    enable_preprocessors: bool,
    observer: Option<Arc<ScanObserver>>,
}

impl FileRouter {
    pub fn new(limits: Limits, enable_preprocessors: bool) -> Self {
        Self {
            plaintext: PlaintextExtractor::new(limits.clone()),
            pdf_text: PdfTextExtractor::new(limits.clone()),
            pdf_metadata: PdfMetadataExtractor::new(limits.clone()),
            office_text: OfficeTextExtractor::new(limits.clone()),
            office_metadata: OfficeMetadataExtractor::new(limits.clone()),
            image_metadata: ImageMetadataExtractor::new(limits.clone()),
            audio_metadata: AudioMetadataExtractor::new(limits.clone()),
            video_metadata: VideoMetadataExtractor::new(limits),
            enable_preprocessors,
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: Arc<ScanObserver>) {
        self.plaintext.set_observer(Arc::clone(&observer));
        self.pdf_text.set_observer(Arc::clone(&observer));
        self.pdf_metadata.set_observer(Arc::clone(&observer));
        self.office_text.set_observer(Arc::clone(&observer));
        self.office_metadata.set_observer(Arc::clone(&observer));
        self.image_metadata.set_observer(Arc::clone(&observer));
        self.audio_metadata.set_observer(Arc::clone(&observer));
        self.video_metadata.set_observer(Arc::clone(&observer));
        self.observer = Some(observer);
    }

    /// Reject any path that still carries parent-directory segments after
    /// normalization.
    pub fn resolve(&self, path: &Path) -> FerretResult<PathBuf> {
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(FerretError::invalid_path(path));
        }
        Ok(path.to_path_buf())
    }

    /// Process one file into its payloads, recursing into embedded media.
    pub fn process_file(&self, path: &Path, ctx: &ProcessContext) -> FerretResult<Vec<ExtractedPayload>> {
        let path = self.resolve(path)?;
        self.process_at_depth(&path, ctx, 0, None)
    }

    fn process_at_depth(
        &self,
        path: &Path,
        ctx: &ProcessContext,
        depth: usize,
        origin_prefix: Option<&str>,
    ) -> FerretResult<Vec<ExtractedPayload>> {
        ctx.check(path)?;
        std::fs::metadata(path).map_err(|e| FerretError::file_access(path, &e.to_string()))?;

        let mut payloads = Vec::new();
        for extractor in self.extractors_for(path) {
            let mut payload = match self.run_with_retry(extractor, path, ctx) {
                Ok(payload) => payload,
                Err(e) if e.kind().allows_plaintext_fallback() => {
                    if let Some(obs) = &self.observer {
                        obs.extractor_fallback(&path.display().to_string(), extractor.name());
                    }
                    self.plaintext_fallback(path)?
                }
                Err(e) => return Err(e),
            };
            if let Some(prefix) = origin_prefix {
                payload.origin_path = format!("{} -> {}", prefix, basename(path));
            }
            payloads.push(payload);
        }

        if payloads.is_empty() {
            // The `none` extractor: an empty success.
            let mut payload = ExtractedPayload::empty(path, ExtractorId::None);
            if let Some(prefix) = origin_prefix {
                payload.origin_path = format!("{} -> {}", prefix, basename(path));
            }
            payloads.push(payload);
            return Ok(payloads);
        }

        // Recurse into embedded media, linking children to their parent.
        if depth < MAX_EMBED_DEPTH {
            let mut children = Vec::new();
            for parent in &payloads {
                let parent_name = if let Some(prefix) = origin_prefix {
                    format!("{} -> {}", prefix, parent.filename)
                } else {
                    parent.filename.clone()
                };
                for media in &parent.embedded_media {
                    ctx.check(path)?;
                    match self.process_at_depth(
                        &media.temp_path,
                        ctx,
                        depth + 1,
                        Some(&parent_name),
                    ) {
                        Ok(mut nested) => children.append(&mut nested),
                        Err(e) => {
                            if let Some(obs) = &self.observer {
                                obs.file_errored(
                                    &media.original_name,
                                    e.kind().as_str(),
                                    &e.to_string(),
                                );
                            }
                        }
                    }
                }
            }
            payloads.extend(children);
        }

        Ok(payloads)
    }

    /// Extractor resolution order: plaintext candidates, then structured
    /// text (with their metadata twins), then metadata-only formats.
    fn extractors_for(&self, path: &Path) -> Vec<&dyn Preprocessor> {
        let mut selected: Vec<&dyn Preprocessor> = Vec::new();

        if self.plaintext.can_process(path) {
            if self.enable_preprocessors {
                selected.push(&self.plaintext);
            }
            return selected;
        }
        if self.pdf_text.can_process(path) {
            if self.enable_preprocessors {
                selected.push(&self.pdf_text);
            }
            selected.push(&self.pdf_metadata);
            return selected;
        }
        if self.office_text.can_process(path) {
            if self.enable_preprocessors {
                selected.push(&self.office_text);
            }
            selected.push(&self.office_metadata);
            return selected;
        }
        if self.image_metadata.can_process(path) {
            selected.push(&self.image_metadata);
            return selected;
        }
        if self.audio_metadata.can_process(path) {
            selected.push(&self.audio_metadata);
            return selected;
        }
        if self.video_metadata.can_process(path) {
            selected.push(&self.video_metadata);
            return selected;
        }
        selected
    }

    /// Transient errors retry with quadratic backoff; everything else
    /// propagates immediately. Each attempt runs under the extractor's
    /// class deadline, capped by what is left of the per-file budget.
    fn run_with_retry(
        &self,
        extractor: &dyn Preprocessor,
        path: &Path,
        ctx: &ProcessContext,
    ) -> FerretResult<ExtractedPayload> {
        let class = class_of(extractor.name());
        let mut attempt = 0u32;
        loop {
            let extractor_ctx = ctx.child_limited(class.timeout());
            match extractor.process(path, &extractor_ctx) {
                Ok(payload) => return Ok(payload),
                Err(e) if e.kind() == ErrorKind::Cancelled => return Err(e),
                Err(e) if e.kind().is_retryable() && attempt + 1 < MAX_RETRIES => {
                    attempt += 1;
                    let backoff = Duration::from_millis(100 * u64::from(attempt * attempt));
                    if let Some(obs) = &self.observer {
                        obs.retry(&path.display().to_string(), attempt, backoff);
                    }
                    std::thread::sleep(backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn plaintext_fallback(&self, path: &Path) -> FerretResult<ExtractedPayload> {
        let bytes =
            std::fs::read(path).map_err(|e| FerretError::file_access(path, &e.to_string()))?;
        Ok(self.plaintext.process_bytes(path, &bytes))
    }
}

/// Deadline class for an extractor. Metadata twins share their format's
/// budget.
fn class_of(extractor_name: &str) -> crate::limits::FileClass {
    use crate::limits::FileClass;
    match extractor_name {
        "pdf_text" | "pdf_metadata" => FileClass::Pdf,
        "office_text" | "office_metadata" => FileClass::Office,
        "image_metadata" => FileClass::Image,
        "audio_metadata" => FileClass::Audio,
        "video_metadata" => FileClass::Video,
        _ => FileClass::Text,
    }
}
