//! Credit card detector
//!
//! Finds digit runs of plausible card length, strips separators, validates
//! the Luhn checksum and resolves the issuing brand from prefix tables.
//! Known test numbers stay reportable but test-flavoured context pulls the
//! confidence down.

use super::context::{context_has_keyword, match_on_line, numbered_lines};
use super::{CandidateMatch, Detector, DetectorType, MatchSource};
use crate::config::ValidatorsConfig;
use crate::extract::ExtractedPayload;
use regex::Regex;

const CARD_KEYWORDS: &[&str] = &[
    "card", "credit", "debit", "cvv", "cvc", "expiry", "expiration", "visa", "mastercard", "amex",
    "payment", "billing", "pan",
];

const TEST_CONTEXT_KEYWORDS: &[&str] = &[
    "test", "example", "sample", "dummy", "fake", "sandbox", "fixture", "mock",
];

/// Numbers that appear in every payment-gateway manual.
const KNOWN_TEST_NUMBERS: &[&str] = &[
    "4111111111111111",
    "4012888888881881",
    "5555555555554444",
    "5105105105105100",
    "378282246310005",
    "371449635398431",
    "6011111111111117",
    "6011000990139424",
];

/// Brand prefix table, most specific prefixes first.
const BRANDS: &[(&str, &[&str], &[usize])] = &[
    ("Hipercard", &["606282"], &[16]),
    ("Elo", &["4011", "4312", "4389", "5041", "5067", "509", "627780", "636297"], &[16]),
    ("Dankort", &["5019"], &[16]),
    ("Mir", &["2200", "2201", "2202", "2203", "2204"], &[16, 17, 18, 19]),
    ("Troy", &["9792"], &[16]),
    ("JCB", &["3528", "3529", "353", "354", "355", "356", "357", "358"], &[16, 17, 18, 19]),
    ("Discover", &["6011", "644", "645", "646", "647", "648", "649", "65"], &[16, 17, 18, 19]),
    ("InstaPayment", &["637", "638", "639"], &[16]),
    ("InterPayment", &["636"], &[16, 17, 18, 19]),
    ("UnionPay", &["62"], &[16, 17, 18, 19]),
    ("American Express", &["34", "37"], &[15]),
    ("Diners Club", &["300", "301", "302", "303", "304", "305", "36", "38", "39"], &[14, 15, 16, 17, 18, 19]),
    ("Mastercard", &["51", "52", "53", "54", "55", "222", "223", "224", "225", "226", "227", "228", "229", "23", "24", "25", "26", "270", "271", "2720"], &[16]),
    ("Visa", &["4"], &[13, 16, 19]),
    ("Maestro", &["50", "56", "57", "58", "59", "67"], &[12, 13, 14, 15, 16, 17, 18, 19]),
    ("UATP", &["1"], &[15]),
];

/// Luhn checksum over a digit string.
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    let mut double = false;
    for ch in digits.chars().rev() {
        let mut d = match ch.to_digit(10) {
            Some(d) => d,
            None => return false,
        };
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }
    sum % 10 == 0 && !digits.is_empty()
}

/// Resolve the brand for a normalized number, if any table entry claims it.
pub fn brand_of(digits: &str) -> Option<&'static str> {
    let len = digits.len();
    BRANDS
        .iter()
        .find(|(_, prefixes, lengths)| {
            lengths.contains(&len) && prefixes.iter().any(|p| digits.starts_with(p))
        })
        .map(|(brand, _, _)| *brand)
}

pub struct CreditCardDetector {
    candidate_re: Regex,
}

impl CreditCardDetector {
    pub fn new() -> Self {
        // Digit runs with optional single space/dash separators; quotes in
        // markup land outside the run, so attribute values match as-is.
        Self {
            candidate_re: Regex::new(r"\d(?:[ \-]?\d){11,18}").unwrap(),
        }
    }

    fn score(&self, candidate: &CandidateMatch, digits: &str) -> f64 {
        let mut confidence = 20.0;
        if luhn_valid(digits) {
            confidence += 40.0;
        }
        if brand_of(digits).is_some() {
            confidence += 30.0;
        }
        if context_has_keyword(candidate, CARD_KEYWORDS) {
            confidence += 20.0;
        }
        if context_has_keyword(candidate, TEST_CONTEXT_KEYWORDS) {
            confidence -= 30.0;
        }
        if KNOWN_TEST_NUMBERS.contains(&digits)
            && context_has_keyword(candidate, TEST_CONTEXT_KEYWORDS)
        {
            // A documented test number inside test prose is noise.
            confidence -= 20.0;
        }
        confidence
    }
}

impl Default for CreditCardDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for CreditCardDetector {
    fn detector_type(&self) -> DetectorType {
        DetectorType::CreditCard
    }

    fn name(&self) -> &'static str {
        "credit_card"
    }

    fn configure(&mut self, _cfg: &ValidatorsConfig) {}

    fn validate(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch> {
        let mut matches = Vec::new();
        for (line_number, line) in numbered_lines(&payload.body_text, 1) {
            for m in self.candidate_re.find_iter(line) {
                let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
                if !(13..=19).contains(&digits.len()) {
                    continue;
                }
                let mut candidate = match_on_line(
                    DetectorType::CreditCard,
                    line_number,
                    line,
                    m.start(),
                    m.end(),
                    0.0,
                    MatchSource::Body,
                );
                candidate.confidence = self.score(&candidate, &digits);
                if let Some(brand) = brand_of(&digits) {
                    candidate
                        .detector_meta
                        .push(("brand".to_string(), brand.to_string()));
                }
                candidate
                    .detector_meta
                    .push(("luhn_valid".to_string(), luhn_valid(&digits).to_string()));
                candidate.clamp_confidence();
                if candidate.confidence > 0.0 {
                    matches.push(candidate);
                }
            }
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractorId;
    use std::path::Path;

    fn payload(text: &str) -> ExtractedPayload {
        ExtractedPayload::empty(Path::new("tx.txt"), ExtractorId::Plaintext)
            .with_text_stats(text.to_string())
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("4111111111111111"));
        assert!(luhn_valid("378282246310005"));
        assert!(!luhn_valid("4111111111111112"));
        assert!(!luhn_valid("1234567890123456"));
    }

    #[test]
    fn test_brands() {
        assert_eq!(brand_of("4111111111111111"), Some("Visa"));
        assert_eq!(brand_of("5555555555554444"), Some("Mastercard"));
        assert_eq!(brand_of("378282246310005"), Some("American Express"));
        assert_eq!(brand_of("6011111111111117"), Some("Discover"));
        assert_eq!(brand_of("3530111333300000"), Some("JCB"));
        assert_eq!(brand_of("2200123456789010"), Some("Mir"));
        assert_eq!(brand_of("6062821234567890"), Some("Hipercard"));
        assert_eq!(brand_of("0000000000000000"), None);
    }

    #[test]
    fn test_spaced_visa_is_high() {
        let detector = CreditCardDetector::new();
        let matches = detector.validate(&payload("Paid with card 4111 1111 1111 1111 yesterday.\n"));
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert!(m.confidence >= 90.0, "confidence was {}", m.confidence);
        assert_eq!(m.line_number, 1);
        assert!(m
            .detector_meta
            .iter()
            .any(|(k, v)| k == "brand" && v == "Visa"));
    }

    #[test]
    fn test_dashed_and_quoted_forms() {
        let detector = CreditCardDetector::new();
        let matches =
            detector.validate(&payload("<payment card=\"4111-1111-1111-1111\" cvv=\"123\"/>\n"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_text, "4111-1111-1111-1111");
    }

    #[test]
    fn test_luhn_failure_never_high() {
        let detector = CreditCardDetector::new();
        let matches = detector.validate(&payload("card number 4111 1111 1111 1112 on file\n"));
        for m in &matches {
            assert!(m.confidence < 90.0);
        }
    }

    #[test]
    fn test_test_context_demotes() {
        let detector = CreditCardDetector::new();
        let real = detector.validate(&payload("card 4111 1111 1111 1111 charged\n"));
        let test = detector.validate(&payload("test card example: 4111 1111 1111 1111\n"));
        assert!(real[0].confidence > test[0].confidence);
        assert!(test[0].confidence < 90.0);
    }

    #[test]
    fn test_short_runs_ignored() {
        let detector = CreditCardDetector::new();
        assert!(detector.validate(&payload("order 123456 shipped\n")).is_empty());
    }
}
