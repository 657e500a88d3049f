//! Office document extractors
//!
//! OOXML (docx/xlsx/pptx) and ODF (odt/ods/odp) are both ZIP containers.
//! Text extraction walks the main document part; metadata extraction reads
//! `docProps/core.xml` + `docProps/app.xml` (or ODF `meta.xml`) and stages
//! any embedded media files into a temp directory for recursive scanning.

use super::{
    basename, minimal_metadata, EmbeddedMedia, ExtractedPayload, ExtractorId, MappingMethod,
    PositionMap, PositionMapping, Preprocessor, ProcessContext,
};
use crate::error::{FerretError, FerretResult};
use crate::limits::{FileClass, Limits};
use crate::observer::ScanObserver;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use zip::ZipArchive;

const OFFICE_EXTENSIONS: &[&str] = &["docx", "xlsx", "pptx", "odt", "ods", "odp"];

/// core.xml element name → reported metadata key.
const CORE_FIELDS: &[(&str, &str)] = &[
    ("title", "Title"),
    ("subject", "Subject"),
    ("creator", "Author"),
    ("keywords", "Keywords"),
    ("description", "Comments"),
    ("lastModifiedBy", "LastModifiedBy"),
    ("revision", "Revision"),
    ("created", "Created"),
    ("modified", "Modified"),
    ("category", "Category"),
    ("contentStatus", "ContentStatus"),
];

/// app.xml element name → reported metadata key.
const APP_FIELDS: &[(&str, &str)] = &[
    ("Application", "Application"),
    ("AppVersion", "AppVersion"),
    ("Company", "Company"),
    ("Manager", "Manager"),
    ("Template", "Template"),
    ("TotalTime", "TotalEditingTime"),
];

/// ODF meta.xml element name → reported metadata key.
const ODF_FIELDS: &[(&str, &str)] = &[
    ("creator", "Author"),
    ("initial-creator", "InitialAuthor"),
    ("title", "Title"),
    ("subject", "Subject"),
    ("description", "Comments"),
    ("keyword", "Keywords"),
    ("generator", "Application"),
    ("date", "Modified"),
    ("creation-date", "Created"),
];

fn open_archive(path: &Path, limits: &Limits) -> FerretResult<ZipArchive<File>> {
    let metadata =
        std::fs::metadata(path).map_err(|e| FerretError::file_access(path, &e.to_string()))?;
    let limit = limits.max_size(FileClass::Office);
    if metadata.len() > limit {
        return Err(FerretError::file_too_large(path, metadata.len(), limit));
    }
    let file = File::open(path).map_err(|e| FerretError::file_access(path, &e.to_string()))?;
    ZipArchive::new(file).map_err(|e| FerretError::parsing_failed(path, &e.to_string()))
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Option<String> {
    let mut entry = archive.by_name(name).ok()?;
    let mut content = String::new();
    entry.read_to_string(&mut content).ok()?;
    Some(content)
}

/// Collect text content of every element with the given local tag name,
/// in document order.
fn texts_of(xml: &str, tag: &str) -> Vec<String> {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(_) => return Vec::new(),
    };
    doc.descendants()
        .filter(|n| n.tag_name().name() == tag)
        .filter_map(|n| n.text())
        .map(|t| t.to_string())
        .collect()
}

fn fields_from(xml: &str, table: &[(&str, &str)]) -> Vec<(String, String)> {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(_) => return Vec::new(),
    };
    let mut pairs = Vec::new();
    for (element, key) in table {
        let value = doc
            .descendants()
            .find(|n| n.tag_name().name() == *element)
            .and_then(|n| n.text())
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if !value.is_empty() {
            pairs.push(((*key).to_string(), value));
        }
    }
    pairs
}

fn is_odf(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()),
        Some(ref ext) if ext == "odt" || ext == "ods" || ext == "odp"
    )
}

/// Extracts body text from Office documents.
pub struct OfficeTextExtractor {
    limits: Limits,
    observer: Option<Arc<ScanObserver>>,
}

impl OfficeTextExtractor {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            observer: None,
        }
    }

    fn body_lines(&self, path: &Path, archive: &mut ZipArchive<File>) -> Vec<String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "docx" => read_entry(archive, "word/document.xml")
                .map(|xml| paragraph_lines(&xml, "p", "t"))
                .unwrap_or_default(),
            "xlsx" => read_entry(archive, "xl/sharedStrings.xml")
                .map(|xml| texts_of(&xml, "t"))
                .unwrap_or_default(),
            "pptx" => {
                let slide_names: Vec<String> = (0..archive.len())
                    .filter_map(|i| archive.by_index(i).ok().map(|e| e.name().to_string()))
                    .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
                    .collect();
                let mut lines = Vec::new();
                for name in slide_names {
                    if let Some(xml) = read_entry(archive, &name) {
                        lines.extend(texts_of(&xml, "t"));
                    }
                }
                lines
            }
            // ODF: content.xml paragraphs
            _ => read_entry(archive, "content.xml")
                .map(|xml| paragraph_lines(&xml, "p", "span"))
                .unwrap_or_default(),
        }
    }
}

/// One line per paragraph element, concatenating its text runs.
fn paragraph_lines(xml: &str, para_tag: &str, _run_tag: &str) -> Vec<String> {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(_) => return Vec::new(),
    };
    doc.descendants()
        .filter(|n| n.tag_name().name() == para_tag)
        .map(|p| {
            p.descendants()
                .filter_map(|n| n.text())
                .collect::<Vec<_>>()
                .join("")
        })
        .filter(|line| !line.trim().is_empty())
        .collect()
}

impl Preprocessor for OfficeTextExtractor {
    fn name(&self) -> &'static str {
        "office_text"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        OFFICE_EXTENSIONS
    }

    fn process(&self, path: &Path, ctx: &ProcessContext) -> FerretResult<ExtractedPayload> {
        ctx.check(path)?;
        let mut archive = open_archive(path, &self.limits)?;
        if let Some(obs) = &self.observer {
            obs.extractor_selected(&path.display().to_string(), self.name());
        }

        let lines = self.body_lines(path, &mut archive);
        ctx.check(path)?;

        let mut body = String::new();
        let mut map = PositionMap::default();
        let mut offset = 0usize;
        for (idx, line) in lines.iter().enumerate() {
            map.push(PositionMapping {
                extracted_line: idx + 1,
                extracted_start: 0,
                extracted_end: line.len(),
                extracted_offset: offset,
                original_page: 1,
                original_line: idx + 1,
                original_char_offset: offset,
                bbox: None,
                confidence: 0.7,
                method: MappingMethod::LineApprox,
            });
            body.push_str(line);
            body.push('\n');
            offset += line.len() + 1;
        }

        let mut payload = ExtractedPayload::empty(path, ExtractorId::OfficeText).with_text_stats(body);
        payload.page_count = 1;
        payload.position_map = Some(map);
        payload.filename = basename(path);
        Ok(payload)
    }

    fn set_observer(&mut self, observer: Arc<ScanObserver>) {
        self.observer = Some(observer);
    }
}

/// Extracts document properties and stages embedded media.
pub struct OfficeMetadataExtractor {
    limits: Limits,
    observer: Option<Arc<ScanObserver>>,
}

impl OfficeMetadataExtractor {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            observer: None,
        }
    }

    fn stage_embedded_media(
        &self,
        archive: &mut ZipArchive<File>,
        payload: &mut ExtractedPayload,
    ) -> FerretResult<()> {
        let media_names: Vec<String> = (0..archive.len())
            .filter_map(|i| archive.by_index(i).ok().map(|e| e.name().to_string()))
            .filter(|n| {
                (n.starts_with("word/media/")
                    || n.starts_with("xl/media/")
                    || n.starts_with("ppt/media/")
                    || n.starts_with("Pictures/"))
                    && !n.ends_with('/')
            })
            .collect();

        if media_names.is_empty() {
            return Ok(());
        }

        let temp_root = tempfile::tempdir()?;
        for name in media_names {
            let mut entry = match archive.by_name(&name) {
                Ok(entry) => entry,
                Err(_) => continue,
            };
            let original_name = name.rsplit('/').next().unwrap_or(&name).to_string();
            let temp_path = temp_root.path().join(&original_name);
            let mut bytes = Vec::new();
            if entry.read_to_end(&mut bytes).is_err() {
                continue;
            }
            if std::fs::write(&temp_path, &bytes).is_err() {
                continue;
            }
            let media_type = mime_guess::from_path(&temp_path)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
            payload.embedded_media.push(EmbeddedMedia {
                original_name,
                temp_path,
                media_type,
            });
        }
        payload.temp_root = Some(Arc::new(temp_root));
        Ok(())
    }
}

impl Preprocessor for OfficeMetadataExtractor {
    fn name(&self) -> &'static str {
        "office_metadata"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        OFFICE_EXTENSIONS
    }

    fn process(&self, path: &Path, ctx: &ProcessContext) -> FerretResult<ExtractedPayload> {
        ctx.check(path)?;

        let mut payload = ExtractedPayload::empty(path, ExtractorId::OfficeMetadata);
        let mut archive = match open_archive(path, &self.limits) {
            Ok(archive) => archive,
            Err(e) if e.kind() == crate::error::ErrorKind::ParsingFailed => {
                payload.structured_metadata =
                    minimal_metadata(path, Some("container could not be opened"));
                return Ok(payload);
            }
            Err(e) => return Err(e),
        };
        if let Some(obs) = &self.observer {
            obs.extractor_selected(&path.display().to_string(), self.name());
        }

        let mut pairs = Vec::new();
        if is_odf(path) {
            if let Some(xml) = read_entry(&mut archive, "meta.xml") {
                pairs.extend(fields_from(&xml, ODF_FIELDS));
            }
        } else {
            if let Some(xml) = read_entry(&mut archive, "docProps/core.xml") {
                pairs.extend(fields_from(&xml, CORE_FIELDS));
            }
            if let Some(xml) = read_entry(&mut archive, "docProps/app.xml") {
                pairs.extend(fields_from(&xml, APP_FIELDS));
            }
        }

        ctx.check(path)?;

        if pairs.is_empty() {
            pairs = minimal_metadata(path, None);
        }
        payload.structured_metadata = pairs;
        self.stage_embedded_media(&mut archive, &mut payload)?;
        Ok(payload)
    }

    fn set_observer(&mut self, observer: Arc<ScanObserver>) {
        self.observer = Some(observer);
    }
}
