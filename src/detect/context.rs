//! Shared match-building helpers
//!
//! Detectors work line by line; this module turns a span on a line into a
//! fully-populated [`CandidateMatch`] with trimmed full line and bounded
//! before/after context. Context is line-local, which keeps fingerprints
//! identical between whole-file and streamed scans.

use super::{CandidateMatch, DetectorType, MatchSource};

/// Maximum context captured on either side of a match.
pub const CONTEXT_LIMIT: usize = 128;

/// Iterate body text as `(line_number, line)` pairs, honouring a base
/// offset for streamed chunks.
pub fn numbered_lines(text: &str, first_line: usize) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(move |(idx, line)| (first_line + idx, line))
}

/// Tail of `text` capped at `CONTEXT_LIMIT` characters.
fn tail_context(text: &str) -> String {
    let count = text.chars().count();
    if count <= CONTEXT_LIMIT {
        text.to_string()
    } else {
        text.chars().skip(count - CONTEXT_LIMIT).collect()
    }
}

/// Head of `text` capped at `CONTEXT_LIMIT` characters.
fn head_context(text: &str) -> String {
    text.chars().take(CONTEXT_LIMIT).collect()
}

/// Build a candidate from a byte span within one line.
pub fn match_on_line(
    detector_type: DetectorType,
    line_number: usize,
    line: &str,
    start: usize,
    end: usize,
    confidence: f64,
    source: MatchSource,
) -> CandidateMatch {
    let match_text = line[start..end].to_string();
    CandidateMatch {
        detector_type,
        match_text,
        line_number,
        column_start: start + 1,
        column_end: end + 1,
        full_line: line.trim().to_string(),
        before_context: tail_context(&line[..start]),
        after_context: head_context(&line[end..]),
        confidence,
        source,
        detector_meta: Vec::new(),
    }
}

/// Case-insensitive keyword probe over the context surrounding a match.
pub fn context_has_keyword(candidate: &CandidateMatch, keywords: &[&str]) -> bool {
    let haystack = format!(
        "{} {}",
        candidate.before_context.to_ascii_lowercase(),
        candidate.after_context.to_ascii_lowercase()
    );
    keywords.iter().any(|k| haystack.contains(k))
}

/// Keyword probe over the whole line, not just the context windows.
pub fn line_has_keyword(line: &str, keywords: &[&str]) -> bool {
    let lower = line.to_ascii_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_on_line_spans() {
        let line = "  card 4111 1111 1111 1111 used";
        let start = line.find('4').unwrap();
        let m = match_on_line(
            DetectorType::CreditCard,
            3,
            line,
            start,
            start + 19,
            90.0,
            MatchSource::Body,
        );
        assert_eq!(m.match_text, "4111 1111 1111 1111");
        assert_eq!(m.line_number, 3);
        assert_eq!(m.full_line, "card 4111 1111 1111 1111 used");
        assert_eq!(m.before_context, "  card ");
        assert_eq!(m.after_context, " used");
        assert_eq!(m.column_start, start + 1);
    }

    #[test]
    fn test_context_capped_at_limit() {
        let long = "x".repeat(400);
        let line = format!("{}MATCH{}", long, long);
        let m = match_on_line(
            DetectorType::Secrets,
            1,
            &line,
            400,
            405,
            50.0,
            MatchSource::Body,
        );
        assert_eq!(m.before_context.chars().count(), CONTEXT_LIMIT);
        assert_eq!(m.after_context.chars().count(), CONTEXT_LIMIT);
    }

    #[test]
    fn test_numbered_lines_with_offset() {
        let text = "a\nb\nc";
        let lines: Vec<_> = numbered_lines(text, 10).collect();
        assert_eq!(lines, vec![(10, "a"), (11, "b"), (12, "c")]);
    }

    #[test]
    fn test_keyword_probes() {
        let m = match_on_line(
            DetectorType::Email,
            1,
            "contact email: a@b.example now",
            15,
            26,
            60.0,
            MatchSource::Body,
        );
        assert!(context_has_keyword(&m, &["email"]));
        assert!(!context_has_keyword(&m, &["password"]));
        assert!(line_has_keyword("My SSN is here", &["ssn"]));
    }
}
