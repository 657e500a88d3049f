//! Output streaming
//!
//! Formatters consume a monotone stream of scan events. Text and JSON
//! Lines render incrementally; document formats (JSON, YAML, CSV) buffer
//! until the end-of-scan event. No formatter may assume a global order
//! across files, and match text renders as `[HIDDEN]` unless the caller
//! opted in.

use crate::error::{FerretError, FerretResult};
use crate::findings::{FileError, Finding, ScanStatus, ScanSummary};
use serde::Serialize;
use std::io::Write;

/// One element of the output stream.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Finding(Finding),
    /// A finding hidden by a suppression rule; forwarded only when the
    /// scan runs with `show_suppressed`.
    Suppressed(Finding),
    FileError(FileError),
    /// Extracted body text, emitted in preprocess-only mode.
    ExtractedText { path: String, text: String },
    Progress { files_done: usize },
    EndOfScan { summary: ScanSummary, status: ScanStatus },
}

/// Contract every formatter implements.
pub trait Formatter: Send {
    fn handle(&mut self, event: &ScanEvent) -> FerretResult<()>;
}

/// Select a formatter by name.
pub fn formatter_for(
    format: &str,
    writer: Box<dyn Write + Send>,
    show_match: bool,
    quiet: bool,
    verbose: bool,
) -> FerretResult<Box<dyn Formatter>> {
    match format {
        "text" => Ok(Box::new(TextFormatter::new(writer, show_match, quiet, verbose))),
        "jsonl" | "json-lines" => Ok(Box::new(JsonLinesFormatter::new(writer, show_match))),
        "json" => Ok(Box::new(JsonFormatter::new(writer, show_match))),
        "csv" => Ok(Box::new(CsvFormatter::new(writer, show_match))),
        "yaml" => Ok(Box::new(YamlFormatter::new(writer, show_match))),
        other => Err(FerretError::config_with_suggestion(
            format!("unknown output format '{}'", other),
            "use one of: text, json, jsonl, csv, yaml",
        )),
    }
}

/// Wire shape shared by the structured formats.
#[derive(Debug, Serialize)]
struct FindingRecord<'a> {
    detector_type: &'a str,
    filename: &'a str,
    origin_path: &'a str,
    line_number: usize,
    confidence: f64,
    severity: &'a str,
    fingerprint: &'a str,
    match_text: &'a str,
    suppressed: bool,
}

impl<'a> FindingRecord<'a> {
    fn new(finding: &'a Finding, show_match: bool, suppressed: bool) -> Self {
        Self {
            detector_type: finding.detector_type.as_str(),
            filename: &finding.filename,
            origin_path: &finding.origin_path,
            line_number: finding.line_number,
            confidence: finding.confidence,
            severity: finding.severity.as_str(),
            fingerprint: &finding.fingerprint,
            match_text: finding.display_match(show_match),
            suppressed,
        }
    }
}

/// Human-readable incremental output. Failed files are summarised by
/// kind at end of scan; `verbose` itemises them as they happen.
pub struct TextFormatter {
    writer: Box<dyn Write + Send>,
    show_match: bool,
    quiet: bool,
    verbose: bool,
}

impl TextFormatter {
    pub fn new(writer: Box<dyn Write + Send>, show_match: bool, quiet: bool, verbose: bool) -> Self {
        Self {
            writer,
            show_match,
            quiet,
            verbose,
        }
    }

    fn write_finding(&mut self, finding: &Finding, suppressed: bool) -> FerretResult<()> {
        let marker = if suppressed { " [SUPPRESSED]" } else { "" };
        writeln!(
            self.writer,
            "[{}] {} {}:{} ({:.0}%) {} {}{}",
            finding.severity,
            finding.detector_type,
            finding.origin_path,
            finding.line_number,
            finding.confidence,
            finding.display_match(self.show_match),
            &finding.fingerprint[..16],
            marker,
        )?;
        Ok(())
    }
}

impl Formatter for TextFormatter {
    fn handle(&mut self, event: &ScanEvent) -> FerretResult<()> {
        match event {
            ScanEvent::Finding(finding) => self.write_finding(finding, false),
            ScanEvent::Suppressed(finding) => self.write_finding(finding, true),
            ScanEvent::FileError(error) => {
                if self.verbose && !self.quiet {
                    match &error.suggestion {
                        Some(suggestion) => writeln!(
                            self.writer,
                            "error: {} ({}) - {}",
                            error.message, error.kind, suggestion
                        )?,
                        None => writeln!(self.writer, "error: {} ({})", error.message, error.kind)?,
                    }
                }
                Ok(())
            }
            ScanEvent::ExtractedText { path, text } => {
                writeln!(self.writer, "--- {} ---", path)?;
                writeln!(self.writer, "{}", text)?;
                Ok(())
            }
            ScanEvent::Progress { .. } => Ok(()),
            ScanEvent::EndOfScan { summary, status } => {
                if !self.quiet {
                    writeln!(
                        self.writer,
                        "scan {:?}: {} findings ({} suppressed), {} files, {} errors, {} ms",
                        status,
                        summary.findings_emitted,
                        summary.findings_suppressed,
                        summary.files_scanned,
                        summary.files_errored,
                        summary.scan_time_ms,
                    )?;
                    if !summary.errors_by_kind.is_empty() {
                        let mut kinds: Vec<(&String, &usize)> =
                            summary.errors_by_kind.iter().collect();
                        kinds.sort();
                        for (kind, count) in kinds {
                            writeln!(self.writer, "  {} x{}", kind, count)?;
                        }
                    }
                }
                self.writer.flush()?;
                Ok(())
            }
        }
    }
}

/// One JSON object per line, rendered as findings arrive.
pub struct JsonLinesFormatter {
    writer: Box<dyn Write + Send>,
    show_match: bool,
}

impl JsonLinesFormatter {
    pub fn new(writer: Box<dyn Write + Send>, show_match: bool) -> Self {
        Self { writer, show_match }
    }
}

impl Formatter for JsonLinesFormatter {
    fn handle(&mut self, event: &ScanEvent) -> FerretResult<()> {
        match event {
            ScanEvent::Finding(finding) => {
                let record = FindingRecord::new(finding, self.show_match, false);
                serde_json::to_writer(&mut self.writer, &record).map_err(serialize_error)?;
                writeln!(self.writer)?;
            }
            ScanEvent::Suppressed(finding) => {
                let record = FindingRecord::new(finding, self.show_match, true);
                serde_json::to_writer(&mut self.writer, &record).map_err(serialize_error)?;
                writeln!(self.writer)?;
            }
            ScanEvent::FileError(error) => {
                serde_json::to_writer(&mut self.writer, error).map_err(serialize_error)?;
                writeln!(self.writer)?;
            }
            ScanEvent::EndOfScan { summary, .. } => {
                serde_json::to_writer(&mut self.writer, summary).map_err(serialize_error)?;
                writeln!(self.writer)?;
                self.writer.flush()?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Buffered top-level JSON document.
pub struct JsonFormatter {
    writer: Box<dyn Write + Send>,
    show_match: bool,
    findings: Vec<(Finding, bool)>,
    errors: Vec<FileError>,
}

impl JsonFormatter {
    pub fn new(writer: Box<dyn Write + Send>, show_match: bool) -> Self {
        Self {
            writer,
            show_match,
            findings: Vec::new(),
            errors: Vec::new(),
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    findings: Vec<FindingRecord<'a>>,
    errors: &'a [FileError],
    summary: &'a ScanSummary,
    status: ScanStatus,
}

impl Formatter for JsonFormatter {
    fn handle(&mut self, event: &ScanEvent) -> FerretResult<()> {
        match event {
            ScanEvent::Finding(finding) => self.findings.push((finding.clone(), false)),
            ScanEvent::Suppressed(finding) => self.findings.push((finding.clone(), true)),
            ScanEvent::FileError(error) => self.errors.push(error.clone()),
            ScanEvent::EndOfScan { summary, status } => {
                let report = Report {
                    findings: self
                        .findings
                        .iter()
                        .map(|(f, suppressed)| FindingRecord::new(f, self.show_match, *suppressed))
                        .collect(),
                    errors: &self.errors,
                    summary,
                    status: *status,
                };
                serde_json::to_writer_pretty(&mut self.writer, &report).map_err(serialize_error)?;
                writeln!(self.writer)?;
                self.writer.flush()?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Buffered CSV, one row per finding.
pub struct CsvFormatter {
    writer: Box<dyn Write + Send>,
    show_match: bool,
    rows: Vec<(Finding, bool)>,
}

impl CsvFormatter {
    pub fn new(writer: Box<dyn Write + Send>, show_match: bool) -> Self {
        Self {
            writer,
            show_match,
            rows: Vec::new(),
        }
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(&[',', '"', '\n'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl Formatter for CsvFormatter {
    fn handle(&mut self, event: &ScanEvent) -> FerretResult<()> {
        match event {
            ScanEvent::Finding(finding) => self.rows.push((finding.clone(), false)),
            ScanEvent::Suppressed(finding) => self.rows.push((finding.clone(), true)),
            ScanEvent::EndOfScan { .. } => {
                writeln!(
                    self.writer,
                    "detector_type,filename,line_number,confidence,severity,fingerprint,match,suppressed"
                )?;
                for (finding, suppressed) in &self.rows {
                    writeln!(
                        self.writer,
                        "{},{},{},{:.2},{},{},{},{}",
                        finding.detector_type,
                        csv_escape(&finding.filename),
                        finding.line_number,
                        finding.confidence,
                        finding.severity,
                        finding.fingerprint,
                        csv_escape(finding.display_match(self.show_match)),
                        suppressed,
                    )?;
                }
                self.writer.flush()?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Buffered YAML document.
pub struct YamlFormatter {
    writer: Box<dyn Write + Send>,
    show_match: bool,
    findings: Vec<(Finding, bool)>,
}

impl YamlFormatter {
    pub fn new(writer: Box<dyn Write + Send>, show_match: bool) -> Self {
        Self {
            writer,
            show_match,
            findings: Vec::new(),
        }
    }
}

impl Formatter for YamlFormatter {
    fn handle(&mut self, event: &ScanEvent) -> FerretResult<()> {
        match event {
            ScanEvent::Finding(finding) => self.findings.push((finding.clone(), false)),
            ScanEvent::Suppressed(finding) => self.findings.push((finding.clone(), true)),
            ScanEvent::EndOfScan { summary, .. } => {
                #[derive(Serialize)]
                struct YamlReport<'a> {
                    findings: Vec<FindingRecord<'a>>,
                    summary: &'a ScanSummary,
                }
                let report = YamlReport {
                    findings: self
                        .findings
                        .iter()
                        .map(|(f, suppressed)| FindingRecord::new(f, self.show_match, *suppressed))
                        .collect(),
                    summary,
                };
                let text = serde_yaml::to_string(&report).map_err(serialize_error)?;
                self.writer.write_all(text.as_bytes())?;
                self.writer.flush()?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Append-only redaction audit log: one JSON line per redacted span,
/// carrying the fingerprint and the original position so redacted output
/// can be traced back without the match text.
pub struct AuditLog {
    writer: std::sync::Mutex<std::fs::File>,
}

#[derive(Serialize)]
struct AuditEntry<'a> {
    fingerprint: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_char_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mapping_confidence: Option<f64>,
    mapped: bool,
}

impl AuditLog {
    pub fn open(path: &std::path::Path) -> FerretResult<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: std::sync::Mutex::new(file),
        })
    }

    pub fn record(
        &self,
        fingerprint: &str,
        mapping: Option<&crate::extract::PositionMapping>,
    ) -> FerretResult<()> {
        let entry = AuditEntry {
            fingerprint,
            original_page: mapping.map(|m| m.original_page),
            original_line: mapping.map(|m| m.original_line),
            original_char_offset: mapping.map(|m| m.original_char_offset),
            mapping_confidence: mapping.map(|m| m.confidence),
            mapped: mapping.is_some(),
        };
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| FerretError::scheduler("audit log lock poisoned"))?;
        serde_json::to_writer(&mut *writer, &entry).map_err(serialize_error)?;
        writeln!(writer)?;
        Ok(())
    }
}

/// Severity mapping for GitLab-SAST serializers. Every other format
/// passes the band names through verbatim.
pub fn gitlab_severity(severity: crate::findings::Severity) -> &'static str {
    match severity {
        crate::findings::Severity::High => "Critical",
        crate::findings::Severity::Medium => "High",
        crate::findings::Severity::Low => "Medium",
    }
}

fn serialize_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> FerretError {
    FerretError::Serialization {
        message: e.to_string(),
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{CandidateMatch, DetectorType, MatchSource};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn sample_finding() -> Finding {
        let candidate = CandidateMatch {
            detector_type: DetectorType::CreditCard,
            match_text: "4111 1111 1111 1111".to_string(),
            line_number: 1,
            column_start: 16,
            column_end: 35,
            full_line: "Paid with card 4111 1111 1111 1111 yesterday.".to_string(),
            before_context: "Paid with card ".to_string(),
            after_context: " yesterday.".to_string(),
            confidence: 95.0,
            source: MatchSource::Body,
            detector_meta: Vec::new(),
        };
        Finding::from_candidate(candidate, "tx.txt", "tx.txt").unwrap()
    }

    fn end_event() -> ScanEvent {
        ScanEvent::EndOfScan {
            summary: ScanSummary::default(),
            status: ScanStatus::Completed,
        }
    }

    #[test]
    fn test_text_hides_match_by_default() {
        let buf = SharedBuf::default();
        let mut formatter = TextFormatter::new(Box::new(buf.clone()), false, false, false);
        formatter.handle(&ScanEvent::Finding(sample_finding())).unwrap();
        formatter.handle(&end_event()).unwrap();
        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("[HIDDEN]"));
        assert!(!output.contains("4111 1111"));
        assert!(output.contains("CREDIT_CARD"));
    }

    #[test]
    fn test_text_shows_match_when_allowed() {
        let buf = SharedBuf::default();
        let mut formatter = TextFormatter::new(Box::new(buf.clone()), true, false, false);
        formatter.handle(&ScanEvent::Finding(sample_finding())).unwrap();
        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("4111 1111 1111 1111"));
    }

    #[test]
    fn test_json_buffers_until_end() {
        let buf = SharedBuf::default();
        let mut formatter = JsonFormatter::new(Box::new(buf.clone()), false);
        formatter.handle(&ScanEvent::Finding(sample_finding())).unwrap();
        assert!(buf.0.lock().unwrap().is_empty());
        formatter.handle(&end_event()).unwrap();
        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["findings"][0]["detector_type"], "CREDIT_CARD");
        assert_eq!(parsed["findings"][0]["match_text"], "[HIDDEN]");
        assert_eq!(parsed["findings"][0]["fingerprint"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_jsonl_is_incremental() {
        let buf = SharedBuf::default();
        let mut formatter = JsonLinesFormatter::new(Box::new(buf.clone()), false);
        formatter.handle(&ScanEvent::Finding(sample_finding())).unwrap();
        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(!output.is_empty());
        let parsed: serde_json::Value = serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["line_number"], 1);
    }

    #[test]
    fn test_csv_has_required_fields() {
        let buf = SharedBuf::default();
        let mut formatter = CsvFormatter::new(Box::new(buf.clone()), false);
        formatter.handle(&ScanEvent::Finding(sample_finding())).unwrap();
        formatter.handle(&end_event()).unwrap();
        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let header = output.lines().next().unwrap();
        for field in ["detector_type", "filename", "line_number", "confidence", "fingerprint"] {
            assert!(header.contains(field));
        }
        assert!(output.contains("[HIDDEN]"));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let buf = SharedBuf::default();
        assert!(formatter_for("sarif-ng", Box::new(buf), false, false, false).is_err());
    }
}
