//! US Social Security Number detector
//!
//! Area-group-serial format with dash, space or no separator. Area rules
//! are structural: 000, 666 and 9xx areas were never issued, so those are
//! not candidates at all rather than low-confidence ones.

use super::context::{context_has_keyword, line_has_keyword, match_on_line, numbered_lines};
use super::{CandidateMatch, Detector, DetectorType, MatchSource};
use crate::config::ValidatorsConfig;
use crate::extract::ExtractedPayload;
use regex::Regex;

/// HR, tax and healthcare vocabulary that surrounds real SSNs.
const DOMAIN_KEYWORDS: &[&str] = &[
    "ssn", "social security", "employee", "payroll", "hr", "tax", "irs", "w-2", "w2", "1099",
    "medicare", "medicaid", "patient", "insurance", "benefits",
];

const TEST_CONTEXT_KEYWORDS: &[&str] = &["test", "example", "sample", "dummy", "fake", "fixture"];

/// Numbers burned into documentation and training material.
const TEST_PATTERNS: &[&str] = &["123-45-6789", "078-05-1120", "219-09-9999"];

pub struct SsnDetector {
    ssn_re: Regex,
}

impl SsnDetector {
    pub fn new() -> Self {
        Self {
            ssn_re: Regex::new(r"\b(\d{3})([ \-]?)(\d{2})([ \-]?)(\d{4})\b").unwrap(),
        }
    }
}

fn normalize(text: &str) -> String {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("{}-{}-{}", &digits[..3], &digits[3..5], &digits[5..9])
}

impl Default for SsnDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SsnDetector {
    fn detector_type(&self) -> DetectorType {
        DetectorType::Ssn
    }

    fn name(&self) -> &'static str {
        "ssn"
    }

    fn configure(&mut self, _cfg: &ValidatorsConfig) {}

    fn validate(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch> {
        let mut matches = Vec::new();
        for (line_number, line) in numbered_lines(&payload.body_text, 1) {
            for caps in self.ssn_re.captures_iter(line) {
                let whole = caps.get(0).unwrap();
                let area = caps.get(1).unwrap().as_str();
                let group = caps.get(3).unwrap().as_str();
                let serial = caps.get(5).unwrap().as_str();

                // Mixed separators ("123-45 6789") read as coincidence.
                let sep1 = caps.get(2).unwrap().as_str();
                let sep2 = caps.get(4).unwrap().as_str();
                if sep1 != sep2 {
                    continue;
                }
                // Unissued areas are not SSNs.
                if area == "000" || area == "666" || area.starts_with('9') {
                    continue;
                }
                // A bare 9-digit run needs supporting vocabulary.
                if sep1.is_empty() && !line_has_keyword(line, DOMAIN_KEYWORDS) {
                    continue;
                }

                let mut candidate = match_on_line(
                    DetectorType::Ssn,
                    line_number,
                    line,
                    whole.start(),
                    whole.end(),
                    40.0,
                    MatchSource::Body,
                );
                if line_has_keyword(line, DOMAIN_KEYWORDS)
                    || context_has_keyword(&candidate, DOMAIN_KEYWORDS)
                {
                    candidate.confidence += 25.0;
                }
                let normalized = normalize(&candidate.match_text);
                if TEST_PATTERNS.contains(&normalized.as_str()) {
                    candidate.confidence -= 30.0;
                }
                if group == "00" || serial == "0000" {
                    candidate.confidence -= 30.0;
                }
                if context_has_keyword(&candidate, TEST_CONTEXT_KEYWORDS) {
                    candidate.confidence -= 15.0;
                }
                candidate
                    .detector_meta
                    .push(("normalized".to_string(), normalized));
                candidate.clamp_confidence();
                if candidate.confidence > 0.0 {
                    matches.push(candidate);
                }
            }
        }
        matches
    }
}
