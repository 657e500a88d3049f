//! Audio and video metadata extractors
//!
//! Walks the simple tag containers directly: ID3v2 text frames for MP3,
//! RIFF INFO chunks for WAV/AVI, and the MP4 `ilst` atom tree for
//! MP4/M4A/MOV. Formats without a supported tag block degrade to the
//! minimal record; tags are the goal here, not decoding.

use super::{
    minimal_metadata, ExtractedPayload, ExtractorId, Preprocessor, ProcessContext,
};
use crate::error::{FerretError, FerretResult};
use crate::limits::{FileClass, Limits};
use crate::observer::ScanObserver;
use std::path::Path;
use std::sync::Arc;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "aac", "flac", "ogg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "wmv"];

/// ID3v2 frame id → reported key.
const ID3_FRAMES: &[(&[u8; 4], &str)] = &[
    (b"TIT2", "Title"),
    (b"TPE1", "Artist"),
    (b"TALB", "Album"),
    (b"TYER", "Year"),
    (b"TDRC", "RecordingDate"),
    (b"TCON", "Genre"),
    (b"TCOM", "Composer"),
    (b"TENC", "EncodedBy"),
    (b"TSSE", "EncoderSettings"),
    (b"TCOP", "Copyright"),
];

/// RIFF INFO chunk id → reported key.
const RIFF_FIELDS: &[(&[u8; 4], &str)] = &[
    (b"INAM", "Title"),
    (b"IART", "Artist"),
    (b"ICMT", "Comment"),
    (b"ICRD", "CreationDate"),
    (b"ISFT", "Software"),
    (b"ICOP", "Copyright"),
    (b"IENG", "Engineer"),
];

/// MP4 ilst item → reported key. `\u{a9}` is the iTunes copyright marker.
const MP4_ITEMS: &[(&[u8; 4], &str)] = &[
    (b"\xa9nam", "Title"),
    (b"\xa9ART", "Artist"),
    (b"\xa9alb", "Album"),
    (b"\xa9day", "Date"),
    (b"\xa9too", "Encoder"),
    (b"\xa9cmt", "Comment"),
    (b"\xa9wrt", "Composer"),
    (b"\xa9cpy", "Copyright"),
];

fn syncsafe(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .take(4)
        .fold(0usize, |acc, &b| (acc << 7) | (b & 0x7F) as usize)
}

fn decode_id3_text(data: &[u8]) -> Option<String> {
    let (&encoding, rest) = data.split_first()?;
    let text = match encoding {
        0 => rest.iter().map(|&b| b as char).collect(),
        1 => {
            // UTF-16 with BOM
            let (le, payload) = match rest {
                [0xFF, 0xFE, tail @ ..] => (true, tail),
                [0xFE, 0xFF, tail @ ..] => (false, tail),
                other => (true, other),
            };
            let utf16: Vec<u16> = payload
                .chunks_exact(2)
                .map(|p| {
                    if le {
                        u16::from_le_bytes([p[0], p[1]])
                    } else {
                        u16::from_be_bytes([p[0], p[1]])
                    }
                })
                .collect();
            String::from_utf16_lossy(&utf16)
        }
        _ => String::from_utf8_lossy(rest).into_owned(),
    };
    let text = text.trim_matches('\0').trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse ID3v2.3/2.4 text frames from the head of an MP3 file.
fn parse_id3v2(bytes: &[u8]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if bytes.len() < 10 || &bytes[..3] != b"ID3" {
        return pairs;
    }
    let major = bytes[3];
    let tag_size = syncsafe(&bytes[6..10]);
    let end = (10 + tag_size).min(bytes.len());
    let mut pos = 10usize;

    while pos + 10 <= end {
        let id: [u8; 4] = bytes[pos..pos + 4].try_into().unwrap();
        if id == [0, 0, 0, 0] {
            break;
        }
        let frame_size = if major >= 4 {
            syncsafe(&bytes[pos + 4..pos + 8])
        } else {
            u32::from_be_bytes(bytes[pos + 4..pos + 8].try_into().unwrap()) as usize
        };
        pos += 10;
        if frame_size == 0 || pos + frame_size > end {
            break;
        }
        if let Some((_, key)) = ID3_FRAMES.iter().find(|(fid, _)| **fid == id) {
            if let Some(text) = decode_id3_text(&bytes[pos..pos + frame_size]) {
                pairs.push((key.to_string(), text));
            }
        }
        pos += frame_size;
    }
    pairs
}

/// Parse RIFF LIST/INFO chunks (WAV, AVI).
fn parse_riff_info(bytes: &[u8]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if bytes.len() < 12 || &bytes[..4] != b"RIFF" {
        return pairs;
    }
    let mut pos = 12usize;
    while pos + 8 <= bytes.len() {
        let chunk_id = &bytes[pos..pos + 4];
        let chunk_size = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap()) as usize;
        let data_start = pos + 8;
        let data_end = (data_start + chunk_size).min(bytes.len());

        if chunk_id == b"LIST" && data_end > data_start + 4 && &bytes[data_start..data_start + 4] == b"INFO" {
            let mut sub = data_start + 4;
            while sub + 8 <= data_end {
                let sub_id: [u8; 4] = bytes[sub..sub + 4].try_into().unwrap();
                let sub_size =
                    u32::from_le_bytes(bytes[sub + 4..sub + 8].try_into().unwrap()) as usize;
                let value_end = (sub + 8 + sub_size).min(data_end);
                if let Some((_, key)) = RIFF_FIELDS.iter().find(|(fid, _)| **fid == sub_id) {
                    let raw = &bytes[sub + 8..value_end];
                    let text = String::from_utf8_lossy(raw)
                        .trim_matches('\0')
                        .trim()
                        .to_string();
                    if !text.is_empty() {
                        pairs.push((key.to_string(), text));
                    }
                }
                // Chunks are word-aligned.
                sub += 8 + sub_size + (sub_size & 1);
            }
        }
        pos = data_start + chunk_size + (chunk_size & 1);
    }
    pairs
}

/// Depth-first search for an atom path like moov/udta/meta/ilst.
fn find_atom<'a>(mut bytes: &'a [u8], path: &[&[u8; 4]]) -> Option<&'a [u8]> {
    for target in path {
        let mut found = None;
        let mut pos = 0usize;
        while pos + 8 <= bytes.len() {
            let size = u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
            let atom_type = &bytes[pos + 4..pos + 8];
            if size < 8 || pos + size > bytes.len() {
                break;
            }
            if atom_type == *target {
                let mut body = &bytes[pos + 8..pos + size];
                // The meta atom carries a 4-byte version/flags prefix.
                if atom_type == b"meta" && body.len() >= 4 {
                    body = &body[4..];
                }
                found = Some(body);
                break;
            }
            pos += size;
        }
        bytes = found?;
    }
    Some(bytes)
}

/// Parse iTunes-style metadata items from an MP4/MOV container.
fn parse_mp4_ilst(bytes: &[u8]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let ilst = match find_atom(bytes, &[b"moov", b"udta", b"meta", b"ilst"]) {
        Some(ilst) => ilst,
        None => return pairs,
    };
    let mut pos = 0usize;
    while pos + 8 <= ilst.len() {
        let size = u32::from_be_bytes(ilst[pos..pos + 4].try_into().unwrap()) as usize;
        if size < 8 || pos + size > ilst.len() {
            break;
        }
        let item_type: [u8; 4] = ilst[pos + 4..pos + 8].try_into().unwrap();
        if let Some((_, key)) = MP4_ITEMS.iter().find(|(fid, _)| **fid == item_type) {
            let body = &ilst[pos + 8..pos + size];
            // Inside: a `data` atom with 8 bytes of type/locale before text.
            if body.len() > 16 && &body[4..8] == b"data" {
                let text = String::from_utf8_lossy(&body[16..])
                    .trim_matches('\0')
                    .trim()
                    .to_string();
                if !text.is_empty() {
                    pairs.push((key.to_string(), text));
                }
            }
        }
        pos += size;
    }
    pairs
}

fn read_head(path: &Path, limit: u64, cap: usize) -> FerretResult<Vec<u8>> {
    let metadata =
        std::fs::metadata(path).map_err(|e| FerretError::file_access(path, &e.to_string()))?;
    if metadata.len() > limit {
        return Err(FerretError::file_too_large(path, metadata.len(), limit));
    }
    use std::io::Read;
    let file =
        std::fs::File::open(path).map_err(|e| FerretError::file_access(path, &e.to_string()))?;
    let mut bytes = Vec::new();
    file.take(cap as u64)
        .read_to_end(&mut bytes)
        .map_err(|e| FerretError::file_access(path, &e.to_string()))?;
    Ok(bytes)
}

fn extract_tags(path: &Path, bytes: &[u8]) -> Vec<(String, String)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => parse_id3v2(bytes),
        "wav" | "avi" => parse_riff_info(bytes),
        "mp4" | "m4a" | "mov" => parse_mp4_ilst(bytes),
        _ => Vec::new(),
    }
}

fn process_media(
    path: &Path,
    ctx: &ProcessContext,
    extractor_id: ExtractorId,
    class: FileClass,
    limits: &Limits,
    observer: Option<&Arc<ScanObserver>>,
) -> FerretResult<ExtractedPayload> {
    ctx.check(path)?;
    if let Some(obs) = observer {
        obs.extractor_selected(&path.display().to_string(), extractor_id.as_str());
    }

    // Tags live at the head (ID3/RIFF) or in moov, which encoders put
    // first for streaming; 16 MB covers both without reading the media.
    let bytes = read_head(path, limits.max_size(class), 16 * 1024 * 1024)?;
    ctx.check(path)?;

    let mut payload = ExtractedPayload::empty(path, extractor_id);
    let mut pairs = extract_tags(path, &bytes);
    if pairs.is_empty() {
        pairs = minimal_metadata(path, None);
    }
    payload.structured_metadata = pairs;
    Ok(payload)
}

pub struct AudioMetadataExtractor {
    limits: Limits,
    observer: Option<Arc<ScanObserver>>,
}

impl AudioMetadataExtractor {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            observer: None,
        }
    }
}

impl Preprocessor for AudioMetadataExtractor {
    fn name(&self) -> &'static str {
        "audio_metadata"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        AUDIO_EXTENSIONS
    }

    fn process(&self, path: &Path, ctx: &ProcessContext) -> FerretResult<ExtractedPayload> {
        process_media(
            path,
            ctx,
            ExtractorId::AudioMetadata,
            FileClass::Audio,
            &self.limits,
            self.observer.as_ref(),
        )
    }

    fn set_observer(&mut self, observer: Arc<ScanObserver>) {
        self.observer = Some(observer);
    }
}

pub struct VideoMetadataExtractor {
    limits: Limits,
    observer: Option<Arc<ScanObserver>>,
}

impl VideoMetadataExtractor {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            observer: None,
        }
    }
}

impl Preprocessor for VideoMetadataExtractor {
    fn name(&self) -> &'static str {
        "video_metadata"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        VIDEO_EXTENSIONS
    }

    fn process(&self, path: &Path, ctx: &ProcessContext) -> FerretResult<ExtractedPayload> {
        process_media(
            path,
            ctx,
            ExtractorId::VideoMetadata,
            FileClass::Video,
            &self.limits,
            self.observer.as_ref(),
        )
    }

    fn set_observer(&mut self, observer: Arc<ScanObserver>) {
        self.observer = Some(observer);
    }
}
