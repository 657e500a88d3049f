//! Email address detector

use super::context::{context_has_keyword, match_on_line, numbered_lines};
use super::{CandidateMatch, Detector, DetectorType, MatchSource};
use crate::config::ValidatorsConfig;
use crate::extract::ExtractedPayload;
use regex::Regex;

const EMAIL_KEYWORDS: &[&str] = &["email", "e-mail", "contact", "mailto", "recipient", "sender"];

/// Documentation domains that never identify a real person.
const EXAMPLE_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "example.net",
    "test.com",
    "localhost",
    "invalid",
];

pub struct EmailDetector {
    email_re: Regex,
}

impl EmailDetector {
    pub fn new() -> Self {
        Self {
            email_re: Regex::new(
                r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)+",
            )
            .unwrap(),
        }
    }
}

/// Domain sanity beyond the regex: a real TLD-looking final label.
fn domain_is_valid(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    if labels.iter().any(|l| l.is_empty() || l.len() > 63) {
        return false;
    }
    let tld = labels.last().unwrap();
    tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_example_domain(domain: &str) -> bool {
    let lower = domain.to_ascii_lowercase();
    EXAMPLE_DOMAINS
        .iter()
        .any(|d| lower == *d || lower.ends_with(&format!(".{}", d)))
}

impl Default for EmailDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for EmailDetector {
    fn detector_type(&self) -> DetectorType {
        DetectorType::Email
    }

    fn name(&self) -> &'static str {
        "email"
    }

    fn configure(&mut self, _cfg: &ValidatorsConfig) {}

    fn validate(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch> {
        let mut matches = Vec::new();
        for (line_number, line) in numbered_lines(&payload.body_text, 1) {
            for m in self.email_re.find_iter(line) {
                let address = m.as_str();
                let domain = match address.rsplit_once('@') {
                    Some((_, domain)) => domain,
                    None => continue,
                };
                if !domain_is_valid(domain) {
                    continue;
                }

                let mut candidate = match_on_line(
                    DetectorType::Email,
                    line_number,
                    line,
                    m.start(),
                    m.end(),
                    60.0,
                    MatchSource::Body,
                );
                if context_has_keyword(&candidate, EMAIL_KEYWORDS) {
                    candidate.confidence += 20.0;
                }
                if is_example_domain(domain) {
                    candidate.confidence -= 40.0;
                }
                candidate
                    .detector_meta
                    .push(("domain".to_string(), domain.to_ascii_lowercase()));
                candidate.clamp_confidence();
                if candidate.confidence > 0.0 {
                    matches.push(candidate);
                }
            }
        }
        matches
    }
}
