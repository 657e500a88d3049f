//! Error types for Ferret-Scan
//!
//! This module provides the error taxonomy the scan pipeline routes on:
//! every failure carries a kind that decides whether the file is retried,
//! routed through a fallback extractor, or reported and skipped.

use std::path::Path;

/// Result type alias for Ferret-Scan operations
pub type FerretResult<T> = Result<T, FerretError>;

/// Classification of scan failures.
///
/// The kind, not the message, drives recovery: see [`ErrorKind::is_retryable`]
/// and [`ErrorKind::allows_plaintext_fallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// File could not be opened or statted
    FileAccess,
    /// File exceeds the configured size limit
    FileSize,
    /// File content is unreadable garbage
    FileCorrupted,
    /// No extractor claims this file type
    UnsupportedFormat,
    /// File claims a format it does not satisfy
    InvalidFormat,
    /// Container format parsed but its payload is damaged
    FormatCorrupted,
    /// Per-file or per-extractor deadline exceeded
    Timeout,
    /// Processing would exceed the memory budget
    MemoryLimit,
    /// Structured parsing failed
    ParsingFailed,
    /// Extraction ran but produced nothing usable
    ExtractionFailed,
    /// Scan was cancelled
    Cancelled,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Transient kinds may be retried with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::FileAccess | ErrorKind::Timeout)
    }

    /// Kinds where the router may retry the raw bytes through the plaintext extractor.
    pub fn allows_plaintext_fallback(&self) -> bool {
        matches!(self, ErrorKind::ParsingFailed | ErrorKind::ExtractionFailed)
    }

    /// Kinds where a metadata extractor should still return a minimal record.
    pub fn allows_minimal_metadata(&self) -> bool {
        matches!(self, ErrorKind::FileCorrupted | ErrorKind::FormatCorrupted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FileAccess => "file_access",
            ErrorKind::FileSize => "file_size",
            ErrorKind::FileCorrupted => "file_corrupted",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::FormatCorrupted => "format_corrupted",
            ErrorKind::Timeout => "timeout",
            ErrorKind::MemoryLimit => "memory_limit",
            ErrorKind::ParsingFailed => "parsing_failed",
            ErrorKind::ExtractionFailed => "extraction_failed",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for Ferret-Scan operations
#[derive(Debug, thiserror::Error)]
pub enum FerretError {
    /// File-level failures that abort one file, never the scan
    #[error("{kind}: {message}")]
    File {
        kind: ErrorKind,
        message: String,
        suggestion: Option<String>,
    },

    /// I/O errors with their source preserved
    #[error("File operation failed: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        suggestion: Option<String>,
    },

    /// Suppression store load/persist errors
    #[error("Suppression store error: {message}")]
    Suppression {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Scan was cancelled from outside
    #[error("scan cancelled")]
    Cancelled,

    /// Scheduler failures abort the whole scan
    #[error("Scheduler error: {message}")]
    Scheduler { message: String },
}

impl FerretError {
    /// Classify this error for recovery decisions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FerretError::File { kind, .. } => *kind,
            FerretError::Io { source, .. } => match source.kind() {
                std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
                _ => ErrorKind::FileAccess,
            },
            FerretError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Unknown,
        }
    }

    /// Short human-readable suggestion, when one exists.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            FerretError::File { suggestion, .. } | FerretError::Config { suggestion, .. } => {
                suggestion.as_deref()
            }
            _ => None,
        }
    }

    pub fn file_access(path: &Path, detail: &str) -> Self {
        Self::File {
            kind: ErrorKind::FileAccess,
            message: format!("cannot access {}: {}", path.display(), detail),
            suggestion: Some("check that the file exists and is readable".to_string()),
        }
    }

    pub fn file_too_large(path: &Path, size: u64, limit: u64) -> Self {
        Self::File {
            kind: ErrorKind::FileSize,
            message: format!(
                "{} is {} bytes, over the {} byte limit",
                path.display(),
                size,
                limit
            ),
            suggestion: Some("raise the size limit with MAX_FILE_SIZE to scan this file".to_string()),
        }
    }

    pub fn corrupted(path: &Path) -> Self {
        Self::File {
            kind: ErrorKind::FileCorrupted,
            message: format!("{} could not be read as its declared format", path.display()),
            suggestion: Some("file appears to be corrupted or malformed".to_string()),
        }
    }

    pub fn format_corrupted(path: &Path, detail: &str) -> Self {
        Self::File {
            kind: ErrorKind::FormatCorrupted,
            message: format!("{}: {}", path.display(), detail),
            suggestion: Some("file appears to be corrupted or malformed".to_string()),
        }
    }

    pub fn unsupported_format(path: &Path) -> Self {
        Self::File {
            kind: ErrorKind::UnsupportedFormat,
            message: format!("no extractor registered for {}", path.display()),
            suggestion: None,
        }
    }

    pub fn invalid_path(path: &Path) -> Self {
        Self::File {
            kind: ErrorKind::FileAccess,
            message: format!("path {} contains parent-directory segments", path.display()),
            suggestion: Some("pass a path without '..' components".to_string()),
        }
    }

    pub fn timeout(path: &Path, secs: u64) -> Self {
        Self::File {
            kind: ErrorKind::Timeout,
            message: format!("processing {} exceeded {}s", path.display(), secs),
            suggestion: None,
        }
    }

    pub fn parsing_failed(path: &Path, detail: &str) -> Self {
        Self::File {
            kind: ErrorKind::ParsingFailed,
            message: format!("failed to parse {}: {}", path.display(), detail),
            suggestion: Some("file appears to be corrupted or malformed".to_string()),
        }
    }

    pub fn extraction_failed(path: &Path, detail: &str) -> Self {
        Self::File {
            kind: ErrorKind::ExtractionFailed,
            message: format!("extraction from {} failed: {}", path.display(), detail),
            suggestion: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn config_with_suggestion(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    pub fn suppression(message: impl Into<String>) -> Self {
        Self::Suppression {
            message: message.into(),
            source: None,
        }
    }

    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for FerretError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            message: source.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_kind_recovery_policy() {
        assert!(ErrorKind::FileAccess.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(!ErrorKind::FileSize.is_retryable());
        assert!(!ErrorKind::FileCorrupted.is_retryable());

        assert!(ErrorKind::ParsingFailed.allows_plaintext_fallback());
        assert!(ErrorKind::ExtractionFailed.allows_plaintext_fallback());
        assert!(!ErrorKind::FileSize.allows_plaintext_fallback());

        assert!(ErrorKind::FormatCorrupted.allows_minimal_metadata());
    }

    #[test]
    fn test_error_classification() {
        let path = PathBuf::from("/tmp/x.pdf");
        assert_eq!(FerretError::file_too_large(&path, 10, 5).kind(), ErrorKind::FileSize);
        assert_eq!(FerretError::timeout(&path, 120).kind(), ErrorKind::Timeout);
        assert_eq!(FerretError::parsing_failed(&path, "bad xref").kind(), ErrorKind::ParsingFailed);
        assert_eq!(FerretError::Cancelled.kind(), ErrorKind::Cancelled);

        let io: FerretError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io.kind(), ErrorKind::FileAccess);
    }

    #[test]
    fn test_suggestions_never_carry_content() {
        let e = FerretError::corrupted(&PathBuf::from("cc-dump.txt"));
        let s = e.suggestion().unwrap();
        assert!(s.contains("corrupted or malformed"));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::UnsupportedFormat).unwrap();
        assert_eq!(json, "\"unsupported_format\"");
    }
}
