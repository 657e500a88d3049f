//! Intellectual property detector
//!
//! Dormant until configuration supplies internal URL patterns (or flips
//! the enable switch). Once active it flags references to internal hosts
//! plus the patent/trademark/copyright/trade-secret language families.

use super::context::{match_on_line, numbered_lines};
use super::{CandidateMatch, Detector, DetectorType, MatchSource};
use crate::config::ValidatorsConfig;
use crate::extract::ExtractedPayload;
use regex::Regex;

struct Family {
    name: &'static str,
    regex: Regex,
    confidence: f64,
}

fn families() -> Vec<Family> {
    vec![
        Family {
            name: "patent",
            regex: Regex::new(r"(?i)\b(?:US\s?)?Patent\s(?:No\.?\s?)?[0-9][0-9,]{5,}\b").unwrap(),
            confidence: 70.0,
        },
        Family {
            name: "trademark",
            regex: Regex::new(r"(?i)\b\w[\w\- ]{1,40}(?:™|®|\(tm\)|\(r\))").unwrap(),
            confidence: 55.0,
        },
        Family {
            name: "copyright",
            regex: Regex::new(r"(?i)(?:©|\(c\)|copyright)\s+(?:19|20)\d{2}\b[^\n]{0,60}").unwrap(),
            confidence: 50.0,
        },
        Family {
            name: "trade_secret",
            regex: Regex::new(
                r"(?i)\b(?:trade\s+secret|internal\s+use\s+only|company\s+confidential|proprietary\s+(?:and|information|data))\b",
            )
            .unwrap(),
            confidence: 65.0,
        },
    ]
}

pub struct IntellectualPropertyDetector {
    enabled: bool,
    internal_urls: Vec<Regex>,
    families: Vec<Family>,
}

impl IntellectualPropertyDetector {
    pub fn new() -> Self {
        Self {
            enabled: false,
            internal_urls: Vec::new(),
            families: families(),
        }
    }
}

impl Default for IntellectualPropertyDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for IntellectualPropertyDetector {
    fn detector_type(&self) -> DetectorType {
        DetectorType::IntellectualProperty
    }

    fn name(&self) -> &'static str {
        "intellectual_property"
    }

    fn configure(&mut self, cfg: &ValidatorsConfig) {
        self.internal_urls = cfg
            .intellectual_property
            .internal_urls
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        self.enabled = cfg.intellectual_property.enabled || !self.internal_urls.is_empty();
    }

    fn validate(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch> {
        if !self.enabled {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for (line_number, line) in numbered_lines(&payload.body_text, 1) {
            for regex in &self.internal_urls {
                for m in regex.find_iter(line) {
                    let mut candidate = match_on_line(
                        DetectorType::IntellectualProperty,
                        line_number,
                        line,
                        m.start(),
                        m.end(),
                        75.0,
                        MatchSource::Body,
                    );
                    candidate
                        .detector_meta
                        .push(("family".to_string(), "internal_url".to_string()));
                    matches.push(candidate);
                }
            }
            for family in &self.families {
                for m in family.regex.find_iter(line) {
                    let mut candidate = match_on_line(
                        DetectorType::IntellectualProperty,
                        line_number,
                        line,
                        m.start(),
                        m.end(),
                        family.confidence,
                        MatchSource::Body,
                    );
                    candidate
                        .detector_meta
                        .push(("family".to_string(), family.name.to_string()));
                    matches.push(candidate);
                }
            }
        }
        matches
    }
}
