//! Image metadata extractor
//!
//! Reads EXIF tags and consolidates the GPS sub-fields into one
//! `GPS_Coordinates` entry (decimal degrees, altitude appended when
//! present). Images without EXIF still produce the minimal record so the
//! payload stays a success.

use super::{
    minimal_metadata, ExtractedPayload, ExtractorId, Preprocessor, ProcessContext,
};
use crate::error::{FerretError, FerretResult};
use crate::limits::{FileClass, Limits};
use crate::observer::ScanObserver;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp", "heic", "heif"];

/// Non-GPS tags surfaced as-is.
const COMMON_TAGS: &[(Tag, &str)] = &[
    (Tag::Make, "Make"),
    (Tag::Model, "Model"),
    (Tag::DateTime, "DateTime"),
    (Tag::DateTimeOriginal, "DateTimeOriginal"),
    (Tag::DateTimeDigitized, "DateTimeDigitized"),
    (Tag::Software, "Software"),
    (Tag::Artist, "Artist"),
    (Tag::Copyright, "Copyright"),
    (Tag::ImageDescription, "ImageDescription"),
    (Tag::Orientation, "Orientation"),
    (Tag::ExposureTime, "ExposureTime"),
    (Tag::FNumber, "FNumber"),
    (Tag::PhotographicSensitivity, "ISO"),
    (Tag::FocalLength, "FocalLength"),
    (Tag::Flash, "Flash"),
    (Tag::WhiteBalance, "WhiteBalance"),
];

/// Degrees/minutes/seconds rationals to signed decimal degrees.
fn dms_to_decimal(value: &Value, negative: bool) -> Option<f64> {
    let rationals = match value {
        Value::Rational(r) if !r.is_empty() => r,
        _ => return None,
    };
    let deg = rationals[0].to_f64();
    let min = rationals.get(1).map(|r| r.to_f64()).unwrap_or(0.0);
    let sec = rationals.get(2).map(|r| r.to_f64()).unwrap_or(0.0);
    let decimal = deg + min / 60.0 + sec / 3600.0;
    Some(if negative { -decimal } else { decimal })
}

/// Trim trailing zeros: 37.774900 → "37.7749", 52.0 → "52".
fn format_decimal(value: f64) -> String {
    let mut s = format!("{:.6}", value);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

fn ref_is_negative(exif: &exif::Exif, tag: Tag) -> bool {
    exif.get_field(tag, In::PRIMARY)
        .map(|f| {
            let r = f.display_value().to_string().to_ascii_uppercase();
            r.contains('S') || r.contains('W')
        })
        .unwrap_or(false)
}

/// Build the consolidated `GPS_Coordinates` value, when lat+long exist.
fn gps_coordinates(exif: &exif::Exif) -> Option<String> {
    let lat_field = exif.get_field(Tag::GPSLatitude, In::PRIMARY)?;
    let lon_field = exif.get_field(Tag::GPSLongitude, In::PRIMARY)?;
    let lat = dms_to_decimal(&lat_field.value, ref_is_negative(exif, Tag::GPSLatitudeRef))?;
    let lon = dms_to_decimal(&lon_field.value, ref_is_negative(exif, Tag::GPSLongitudeRef))?;

    let mut coords = format!("{}, {}", format_decimal(lat), format_decimal(lon));
    if let Some(alt_field) = exif.get_field(Tag::GPSAltitude, In::PRIMARY) {
        if let Value::Rational(r) = &alt_field.value {
            if let Some(alt) = r.first() {
                coords.push_str(&format!(", {} m", format_decimal(alt.to_f64())));
            }
        }
    }
    Some(coords)
}

pub struct ImageMetadataExtractor {
    limits: Limits,
    observer: Option<Arc<ScanObserver>>,
}

impl ImageMetadataExtractor {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            observer: None,
        }
    }
}

impl Preprocessor for ImageMetadataExtractor {
    fn name(&self) -> &'static str {
        "image_metadata"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        IMAGE_EXTENSIONS
    }

    fn process(&self, path: &Path, ctx: &ProcessContext) -> FerretResult<ExtractedPayload> {
        ctx.check(path)?;

        let metadata =
            std::fs::metadata(path).map_err(|e| FerretError::file_access(path, &e.to_string()))?;
        let limit = self.limits.max_size(FileClass::Image);
        if metadata.len() > limit {
            return Err(FerretError::file_too_large(path, metadata.len(), limit));
        }

        let mut payload = ExtractedPayload::empty(path, ExtractorId::ImageMetadata);
        let file = File::open(path).map_err(|e| FerretError::file_access(path, &e.to_string()))?;
        let mut reader = BufReader::new(file);

        let exif = match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(_) => {
                // No EXIF segment, or a corrupted one: minimal record.
                payload.structured_metadata = minimal_metadata(path, None);
                return Ok(payload);
            }
        };

        if let Some(obs) = &self.observer {
            obs.extractor_selected(&path.display().to_string(), self.name());
        }

        let mut pairs = Vec::new();
        // GPS comes first: the consolidated entry replaces every GPS sub-field.
        if let Some(coords) = gps_coordinates(&exif) {
            pairs.push(("GPS_Coordinates".to_string(), coords));
        }
        for (tag, key) in COMMON_TAGS {
            if let Some(field) = exif.get_field(*tag, In::PRIMARY) {
                let value = field.display_value().to_string();
                let value = value.trim().trim_matches('"').to_string();
                if !value.is_empty() {
                    pairs.push(((*key).to_string(), value));
                }
            }
        }

        if pairs.is_empty() {
            pairs = minimal_metadata(path, None);
        }
        payload.structured_metadata = pairs;
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
    fn test_format_decimal_trims_zeros() {
        assert_eq!(format_decimal(37.7749), "37.7749");
        assert_eq!(format_decimal(-122.4194), "-122.4194");
        assert_eq!(format_decimal(52.0), "52");
    }

    #[test]
    fn test_dms_conversion() {
        let value = Value::Rational(vec![
            exif::Rational { num: 37, denom: 1 },
            exif::Rational { num: 46, denom: 1 },
            exif::Rational { num: 2964, denom: 100 },
        ]);
        let decimal = dms_to_decimal(&value, false).unwrap();
        assert!((decimal - 37.7749).abs() < 0.0001);
        let negative = dms_to_decimal(&value, true).unwrap();
        assert!(negative < 0.0);
    }

    #[test]
    fn test_plain_image_gets_minimal_record() {
        // Tiny valid PNG header with no EXIF.
        let png: &[u8] = &[
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
        ];
        let mut f = tempfile::NamedTempFile::with_suffix(".png").unwrap();
        std::io::Write::write_all(&mut f, png).unwrap();
        let extractor = ImageMetadataExtractor::new(Limits::new());
        let ctx = ProcessContext::standalone(std::time::Duration::from_secs(30));
        let payload = extractor.process(f.path(), &ctx).unwrap();
        assert!(payload.success);
        assert!(payload
            .structured_metadata
            .iter()
            .any(|(k, v)| k == "MimeType" && v == "image/png"));
    }
}
