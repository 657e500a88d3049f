//! Findings and scan accumulators

use crate::detect::{CandidateMatch, DetectorType, MatchSource};
use crate::error::ErrorKind;
use crate::suppress;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Confidence band: HIGH at 90 and above, MEDIUM from 60, LOW below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 90.0 {
            Severity::High
        } else if confidence >= 60.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }

    /// Parse a `--confidence` token; `all` expands elsewhere.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A calibrated, fingerprinted detection ready for suppression filtering
/// and emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub detector_type: DetectorType,
    pub match_text: String,
    pub line_number: usize,
    pub column_start: usize,
    pub column_end: usize,
    pub full_line: String,
    pub before_context: String,
    pub after_context: String,
    pub confidence: f64,
    pub severity: Severity,
    pub source: MatchSource,
    pub detector_meta: Vec<(String, String)>,
    /// Display path, including the `parent -> child` chain for embedded media.
    pub origin_path: String,
    /// Basename only; directories never enter the fingerprint.
    pub filename: String,
    /// 64 lowercase hex chars, stable across sessions.
    pub fingerprint: String,
}

impl Finding {
    /// Build from a calibrated candidate. Returns `None` for candidates at
    /// zero confidence, which must never become findings.
    pub fn from_candidate(
        candidate: CandidateMatch,
        origin_path: &str,
        filename: &str,
    ) -> Option<Self> {
        if candidate.confidence <= 0.0 {
            return None;
        }
        let severity = Severity::from_confidence(candidate.confidence);
        let fingerprint = suppress::fingerprint(
            candidate.detector_type.as_str(),
            candidate.confidence,
            &candidate.full_line,
            filename,
            candidate.line_number,
            &candidate.before_context,
            &candidate.after_context,
            &candidate.match_text,
        );
        Some(Self {
            detector_type: candidate.detector_type,
            match_text: candidate.match_text,
            line_number: candidate.line_number,
            column_start: candidate.column_start,
            column_end: candidate.column_end,
            full_line: candidate.full_line,
            before_context: candidate.before_context,
            after_context: candidate.after_context,
            confidence: candidate.confidence,
            severity,
            source: candidate.source,
            detector_meta: candidate.detector_meta,
            origin_path: origin_path.to_string(),
            filename: filename.to_string(),
            fingerprint,
        })
    }

    /// The match text as rendered for output: hidden unless allowed.
    pub fn display_match(&self, show_match: bool) -> &str {
        if show_match {
            &self.match_text
        } else {
            "[HIDDEN]"
        }
    }
}

/// One failed file in the output stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileError {
    pub path: String,
    pub kind: ErrorKind,
    pub message: String,
    pub suggestion: Option<String>,
}

/// Terminal state of a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    #[default]
    Completed,
    Cancelled,
    Failed,
}

/// Aggregated results of one scan.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub files_scanned: usize,
    pub files_errored: usize,
    pub findings_emitted: usize,
    pub findings_suppressed: usize,
    pub by_severity: HashMap<String, usize>,
    pub by_detector: HashMap<String, usize>,
    pub errors_by_kind: HashMap<String, usize>,
    pub scan_time_ms: u64,
}

impl ScanSummary {
    pub fn record_finding(&mut self, finding: &Finding) {
        self.findings_emitted += 1;
        *self
            .by_severity
            .entry(finding.severity.as_str().to_string())
            .or_insert(0) += 1;
        *self
            .by_detector
            .entry(finding.detector_type.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub fn record_suppressed(&mut self) {
        self.findings_suppressed += 1;
    }

    pub fn record_error(&mut self, error: &FileError) {
        self.files_errored += 1;
        *self
            .errors_by_kind
            .entry(error.kind.as_str().to_string())
            .or_insert(0) += 1;
    }

    /// Highest severity among emitted findings, for exit-code decisions.
    pub fn has_findings_at_or_above(&self, threshold: Severity) -> bool {
        let bands: &[Severity] = match threshold {
            Severity::High => &[Severity::High],
            Severity::Medium => &[Severity::High, Severity::Medium],
            Severity::Low => &[Severity::High, Severity::Medium, Severity::Low],
        };
        bands
            .iter()
            .any(|band| self.by_severity.get(band.as_str()).copied().unwrap_or(0) > 0)
    }
}
