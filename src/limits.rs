//! Per-extractor resource limits
//!
//! Size ceilings and processing deadlines keyed by file class, with the
//! `MAX_FILE_SIZE` environment override applied on top.

use std::time::Duration;

pub const MB: u64 = 1024 * 1024;

/// General ceiling for text and document files.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * MB;
/// Audio files share the general ceiling.
pub const AUDIO_MAX_FILE_SIZE: u64 = 100 * MB;
/// Video containers may be much larger.
pub const VIDEO_MAX_FILE_SIZE: u64 = 500 * MB;
/// Bodies above this threshold go through the streaming reader.
pub const STREAMING_THRESHOLD: u64 = 10 * MB;
/// Hard cap for streamed bodies.
pub const STREAMING_MAX_FILE_SIZE: u64 = 500 * MB;
/// Overlap carried between streamed chunks.
pub const STREAMING_OVERLAP: usize = 1024;
/// Plaintext extractor stops appending lines past this count.
pub const MAX_TEXT_LINES: usize = 1_000_000;

/// Wall-clock budget for one file, end to end.
pub const PER_FILE_TIMEOUT: Duration = Duration::from_secs(120);
/// Grace period granted to in-flight files after cancellation.
pub const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// File classes with distinct resource budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Text,
    Pdf,
    Office,
    Image,
    Audio,
    Video,
}

impl FileClass {
    /// Extraction deadline for this class.
    pub fn timeout(&self) -> Duration {
        match self {
            FileClass::Pdf => Duration::from_secs(60),
            FileClass::Office => Duration::from_secs(45),
            FileClass::Audio => Duration::from_secs(120),
            FileClass::Video => Duration::from_secs(180),
            _ => Duration::from_secs(30),
        }
    }

    /// Size ceiling for this class, before the env override.
    pub fn max_size(&self) -> u64 {
        match self {
            FileClass::Video => VIDEO_MAX_FILE_SIZE,
            FileClass::Audio => AUDIO_MAX_FILE_SIZE,
            _ => DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Resolved limits for a scan, after environment overrides.
#[derive(Debug, Clone)]
pub struct Limits {
    /// General size override from `MAX_FILE_SIZE`, when set.
    pub max_file_size_override: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Limits {
    pub fn new() -> Self {
        Self {
            max_file_size_override: None,
        }
    }

    /// Read `MAX_FILE_SIZE` (bytes) from the environment.
    pub fn from_env() -> Self {
        let max_file_size_override = std::env::var("MAX_FILE_SIZE")
            .ok()
            .and_then(|v| v.parse::<u64>().ok());
        Self {
            max_file_size_override,
        }
    }

    /// Effective ceiling for a file class.
    pub fn max_size(&self, class: FileClass) -> u64 {
        self.max_file_size_override.unwrap_or_else(|| class.max_size())
    }
}
