//! Phone number detector

use super::context::{context_has_keyword, match_on_line, numbered_lines};
use super::{CandidateMatch, Detector, DetectorType, MatchSource};
use crate::config::ValidatorsConfig;
use crate::extract::ExtractedPayload;
use regex::Regex;

const PHONE_KEYWORDS: &[&str] = &[
    "phone", "tel", "telephone", "call", "mobile", "cell", "fax", "contact", "dial", "whatsapp",
];

pub struct PhoneDetector {
    international_re: Regex,
    national_re: Regex,
}

impl PhoneDetector {
    pub fn new() -> Self {
        Self {
            // E.164 with optional grouping: +14155552671, +44 20 7946 0958
            international_re: Regex::new(r"\+\d{1,3}[ \-.]?\(?\d{1,4}\)?(?:[ \-.]?\d{2,4}){1,4}")
                .unwrap(),
            // US-style national: (415) 555-2671, 415-555-2671, 415.555.2671
            national_re: Regex::new(r"\(?\d{3}\)?[ \-.]\d{3}[ \-.]\d{4}\b").unwrap(),
        }
    }

    fn push_match(
        &self,
        matches: &mut Vec<CandidateMatch>,
        line_number: usize,
        line: &str,
        start: usize,
        end: usize,
        international: bool,
    ) {
        let text = &line[start..end];
        let digit_count = text.chars().filter(|c| c.is_ascii_digit()).count();
        if !(7..=15).contains(&digit_count) {
            return;
        }

        let mut candidate = match_on_line(
            DetectorType::Phone,
            line_number,
            line,
            start,
            end,
            if international { 60.0 } else { 50.0 },
            MatchSource::Body,
        );
        if context_has_keyword(&candidate, PHONE_KEYWORDS) {
            candidate.confidence += 25.0;
        }
        // A 3-2-4 grouping is an SSN shape, not a phone shape.
        if looks_like_ssn(&candidate.match_text) {
            candidate.confidence -= 35.0;
        }
        candidate.detector_meta.push((
            "format".to_string(),
            if international { "e164" } else { "national" }.to_string(),
        ));
        candidate.clamp_confidence();
        if candidate.confidence > 0.0 {
            matches.push(candidate);
        }
    }
}

fn looks_like_ssn(text: &str) -> bool {
    let groups: Vec<usize> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|g| !g.is_empty())
        .map(|g| g.len())
        .collect();
    groups == [3, 2, 4]
}

impl Default for PhoneDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for PhoneDetector {
    fn detector_type(&self) -> DetectorType {
        DetectorType::Phone
    }

    fn name(&self) -> &'static str {
        "phone"
    }

    fn configure(&mut self, _cfg: &ValidatorsConfig) {}

    fn validate(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch> {
        let mut matches = Vec::new();
        for (line_number, line) in numbered_lines(&payload.body_text, 1) {
            let mut spans: Vec<(usize, usize, bool)> = Vec::new();
            for m in self.international_re.find_iter(line) {
                spans.push((m.start(), m.end(), true));
            }
            for m in self.national_re.find_iter(line) {
                // Skip national matches inside an international span.
                if !spans.iter().any(|(s, e, _)| m.start() >= *s && m.end() <= *e) {
                    spans.push((m.start(), m.end(), false));
                }
            }
            for (start, end, international) in spans {
                self.push_match(&mut matches, line_number, line, start, end, international);
            }
        }
        matches
    }
}
