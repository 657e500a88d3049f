//! Passport number detector
//!
//! Per-country document number shapes plus the ICAO MRZ line. Document
//! numbers are short and generic, so non-MRZ forms only fire alongside
//! travel vocabulary.

use super::context::{context_has_keyword, line_has_keyword, match_on_line, numbered_lines};
use super::{CandidateMatch, Detector, DetectorType, MatchSource};
use crate::config::ValidatorsConfig;
use crate::extract::ExtractedPayload;
use regex::Regex;

const TRAVEL_KEYWORDS: &[&str] = &[
    "passport", "travel", "visa", "immigration", "border", "customs", "nationality", "issued",
    "expiry", "expiration", "consulate", "embassy",
];

struct CountryPattern {
    country: &'static str,
    regex: Regex,
}

pub struct PassportDetector {
    countries: Vec<CountryPattern>,
    mrz_re: Regex,
}

impl PassportDetector {
    pub fn new() -> Self {
        let countries = vec![
            CountryPattern {
                country: "US",
                regex: Regex::new(r"\b\d{9}\b").unwrap(),
            },
            CountryPattern {
                country: "UK",
                regex: Regex::new(r"\b[A-Z]{2}\d{7}\b").unwrap(),
            },
            CountryPattern {
                country: "CA",
                regex: Regex::new(r"\b[A-Z]{2}\d{6}\b").unwrap(),
            },
            CountryPattern {
                country: "DE",
                regex: Regex::new(r"\b[CFGHJKLMNPRTVWXYZ][0-9CFGHJKLMNPRTVWXYZ]{8}\b").unwrap(),
            },
            CountryPattern {
                country: "FR",
                regex: Regex::new(r"\b\d{2}[A-Z]{2}\d{5}\b").unwrap(),
            },
        ];
        Self {
            countries,
            // Machine-readable zone, line one: P<ISSUER<SURNAME<<GIVEN...
            mrz_re: Regex::new(r"P<[A-Z]{3}[A-Z0-9<]{20,}").unwrap(),
        }
    }
}

impl Default for PassportDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for PassportDetector {
    fn detector_type(&self) -> DetectorType {
        DetectorType::Passport
    }

    fn name(&self) -> &'static str {
        "passport"
    }

    fn configure(&mut self, _cfg: &ValidatorsConfig) {}

    fn validate(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch> {
        let mut matches = Vec::new();
        for (line_number, line) in numbered_lines(&payload.body_text, 1) {
            // MRZ lines are unambiguous on their own.
            for m in self.mrz_re.find_iter(line) {
                let mut candidate = match_on_line(
                    DetectorType::Passport,
                    line_number,
                    line,
                    m.start(),
                    m.end(),
                    85.0,
                    MatchSource::Body,
                );
                candidate
                    .detector_meta
                    .push(("format".to_string(), "mrz".to_string()));
                matches.push(candidate);
            }

            if !line_has_keyword(line, TRAVEL_KEYWORDS) {
                continue;
            }
            for pattern in &self.countries {
                for m in pattern.regex.find_iter(line) {
                    let mut candidate = match_on_line(
                        DetectorType::Passport,
                        line_number,
                        line,
                        m.start(),
                        m.end(),
                        30.0,
                        MatchSource::Body,
                    );
                    if context_has_keyword(&candidate, TRAVEL_KEYWORDS) {
                        candidate.confidence += 40.0;
                    } else {
                        candidate.confidence += 25.0;
                    }
                    candidate
                        .detector_meta
                        .push(("country".to_string(), pattern.country.to_string()));
                    candidate.clamp_confidence();
                    if candidate.confidence > 0.0 {
                        matches.push(candidate);
                    }
                }
            }
        }
        matches
    }
}
