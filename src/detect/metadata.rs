//! Metadata detector
//!
//! Runs only on payloads produced by the `*_metadata` extractors and
//! scores each structured field by its class. The class also drives the
//! calibration-stage source boost, so a GPS field ends HIGH while an
//! author field lands MEDIUM.

use super::{CandidateMatch, Detector, DetectorType, MatchSource};
use crate::config::ValidatorsConfig;
use crate::extract::{ExtractedPayload, ExtractorId};

/// Field classes, from most to least sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    Gps,
    Comments,
    Device,
    Manager,
    Author,
}

impl FieldClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldClass::Gps => "gps",
            FieldClass::Comments => "comments",
            FieldClass::Device => "device",
            FieldClass::Manager => "manager",
            FieldClass::Author => "author",
        }
    }

    /// Calibration-stage boost for this class.
    pub fn source_boost(&self) -> f64 {
        match self {
            FieldClass::Gps => 60.0,
            FieldClass::Comments => 50.0,
            FieldClass::Device => 40.0,
            FieldClass::Manager => 40.0,
            FieldClass::Author => 30.0,
        }
    }

    pub fn from_meta(meta: &[(String, String)]) -> Option<Self> {
        meta.iter()
            .find(|(k, _)| k == "field_class")
            .and_then(|(_, v)| match v.as_str() {
                "gps" => Some(FieldClass::Gps),
                "comments" => Some(FieldClass::Comments),
                "device" => Some(FieldClass::Device),
                "manager" => Some(FieldClass::Manager),
                "author" => Some(FieldClass::Author),
                _ => None,
            })
    }
}

/// Classify one metadata key for a given extractor family.
fn classify(extractor: ExtractorId, key: &str) -> Option<FieldClass> {
    let lower = key.to_ascii_lowercase();

    if lower.contains("gps") {
        return Some(FieldClass::Gps);
    }
    if lower == "manager" {
        return Some(FieldClass::Manager);
    }
    if matches!(
        lower.as_str(),
        "comments" | "comment" | "description" | "imagedescription" | "subject" | "keywords"
    ) {
        return Some(FieldClass::Comments);
    }

    let device = match extractor {
        ExtractorId::ImageMetadata => matches!(lower.as_str(), "make" | "model" | "software"),
        ExtractorId::PdfMetadata => matches!(lower.as_str(), "producer" | "creator"),
        ExtractorId::OfficeMetadata => {
            matches!(lower.as_str(), "application" | "appversion" | "template")
        }
        ExtractorId::AudioMetadata | ExtractorId::VideoMetadata => matches!(
            lower.as_str(),
            "encoder" | "encodersettings" | "encodedby" | "software"
        ),
        _ => false,
    };
    if device {
        return Some(FieldClass::Device);
    }

    let author = matches!(
        lower.as_str(),
        "author"
            | "artist"
            | "creator"
            | "initialauthor"
            | "lastmodifiedby"
            | "createdby"
            | "composer"
            | "engineer"
            | "company"
            | "copyright"
    );
    if author {
        return Some(FieldClass::Author);
    }
    None
}

pub struct MetadataDetector;

impl MetadataDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MetadataDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for MetadataDetector {
    fn detector_type(&self) -> DetectorType {
        DetectorType::Metadata
    }

    fn name(&self) -> &'static str {
        "metadata"
    }

    fn configure(&mut self, _cfg: &ValidatorsConfig) {}

    fn validate(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch> {
        // Absolute rule: only metadata-extractor payloads are eligible.
        if !payload.extractor_id.is_metadata() {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for (idx, (key, value)) in payload.structured_metadata.iter().enumerate() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let class = match classify(payload.extractor_id, key) {
                Some(class) => class,
                None => continue,
            };

            let full_line = format!("{}: {}", key, value);
            matches.push(CandidateMatch {
                detector_type: DetectorType::Metadata,
                match_text: value.to_string(),
                line_number: idx + 1,
                column_start: key.len() + 3,
                column_end: key.len() + 3 + value.len(),
                full_line,
                before_context: format!("{}: ", key),
                after_context: String::new(),
                confidence: 30.0,
                source: MatchSource::Metadata { key: key.clone() },
                detector_meta: vec![
                    ("metadata_key".to_string(), key.clone()),
                    ("field_class".to_string(), class.as_str().to_string()),
                ],
            });
        }
        matches
    }
}
