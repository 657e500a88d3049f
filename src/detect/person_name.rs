//! Person name detector
//!
//! Database-first: candidate token pairs are only scored when at least one
//! half appears in the embedded name tables, with an early exit when a
//! payload shares no tokens with the tables at all. Pattern shapes
//! (`Last, First`, `Title First Last`) refine the score; identifier-heavy
//! context pulls it down.

use super::context::{context_has_keyword, match_on_line, numbered_lines};
use super::{CandidateMatch, Detector, DetectorType, MatchSource};
use crate::config::ValidatorsConfig;
use crate::extract::ExtractedPayload;
use regex::Regex;
use std::collections::HashSet;

/// Common given names, lowercase.
const FIRST_NAMES: &[&str] = &[
    "james", "mary", "robert", "patricia", "john", "jennifer", "michael", "linda", "david",
    "elizabeth", "william", "barbara", "richard", "susan", "joseph", "jessica", "thomas", "karen",
    "charles", "sarah", "christopher", "lisa", "daniel", "nancy", "matthew", "sandra", "anthony",
    "betty", "mark", "ashley", "donald", "emily", "steven", "kimberly", "andrew", "margaret",
    "paul", "donna", "joshua", "michelle", "kenneth", "carol", "kevin", "amanda", "brian",
    "melissa", "george", "deborah", "timothy", "stephanie", "ronald", "rebecca", "jason", "laura",
    "edward", "helen", "jeffrey", "sharon", "ryan", "cynthia", "jacob", "kathleen", "gary", "amy",
    "nicholas", "angela", "eric", "shirley", "jonathan", "brenda", "stephen", "emma", "larry",
    "anna", "justin", "pamela", "scott", "nicole", "brandon", "samantha", "benjamin", "katherine",
    "samuel", "christine", "gregory", "debra", "alexander", "rachel", "patrick", "carolyn",
    "frank", "janet", "raymond", "maria", "jack", "olivia", "dennis", "heather", "jerry", "diane",
    "tyler", "julie", "aaron", "joyce", "jose", "victoria", "adam", "ruth", "nathan", "virginia",
    "henry", "lauren", "zachary", "kelly", "douglas", "christina", "peter", "joan", "kyle",
    "evelyn", "noah", "judith", "ethan", "andrea", "jordan", "hannah", "jane", "grace", "casey",
    "sofia", "jordan", "alice", "albert", "megan", "wayne", "cheryl", "juan", "martha",
];

/// Common family names, lowercase.
const LAST_NAMES: &[&str] = &[
    "smith", "johnson", "williams", "brown", "jones", "garcia", "miller", "davis", "rodriguez",
    "martinez", "hernandez", "lopez", "gonzalez", "wilson", "anderson", "thomas", "taylor",
    "moore", "jackson", "martin", "lee", "perez", "thompson", "white", "harris", "sanchez",
    "clark", "ramirez", "lewis", "robinson", "walker", "young", "allen", "king", "wright",
    "scott", "torres", "nguyen", "hill", "flores", "green", "adams", "nelson", "baker", "hall",
    "rivera", "campbell", "mitchell", "carter", "roberts", "gomez", "phillips", "evans", "turner",
    "diaz", "parker", "cruz", "edwards", "collins", "reyes", "stewart", "morris", "morales",
    "murphy", "cook", "rogers", "gutierrez", "ortiz", "morgan", "cooper", "peterson", "bailey",
    "reed", "kelly", "howard", "ramos", "kim", "cox", "ward", "richardson", "watson", "brooks",
    "chavez", "wood", "james", "bennett", "gray", "mendoza", "ruiz", "hughes", "price", "alvarez",
    "castillo", "sanders", "patel", "myers", "long", "ross", "foster", "jimenez", "doe", "roe",
];

/// Vocabulary that marks an identifier context, not a person.
const TECHNICAL_TERMS: &[&str] = &[
    "api", "function", "method", "class", "variable", "struct", "module", "endpoint", "parameter",
    "import", "const", "enum",
];

pub struct PersonNameDetector {
    first_names: HashSet<&'static str>,
    last_names: HashSet<&'static str>,
    title_re: Regex,
    pair_re: Regex,
    reversed_re: Regex,
}

impl PersonNameDetector {
    pub fn new() -> Self {
        Self {
            first_names: FIRST_NAMES.iter().copied().collect(),
            last_names: LAST_NAMES.iter().copied().collect(),
            title_re: Regex::new(
                r"\b(?:Mr|Mrs|Ms|Dr|Prof|Rev)\.?\s+([A-Z][a-z]+)(?:\s+[A-Z]\.?)?\s+([A-Z][a-z]+)\b",
            )
            .unwrap(),
            pair_re: Regex::new(r"\b([A-Z][a-z]{2,})\s+([A-Z][a-z]{2,})\b").unwrap(),
            reversed_re: Regex::new(r"\b([A-Z][a-z]{2,}),\s+([A-Z][a-z]{2,})\b").unwrap(),
        }
    }

    /// Early exit: does any token in the text appear in the name tables?
    fn shares_tokens(&self, text: &str) -> bool {
        text.split(|c: char| !c.is_alphabetic())
            .filter(|t| t.len() >= 3)
            .any(|t| {
                let lower = t.to_ascii_lowercase();
                self.first_names.contains(lower.as_str()) || self.last_names.contains(lower.as_str())
            })
    }

    fn score_pair(&self, first: &str, last: &str) -> f64 {
        let first_known = self.first_names.contains(first.to_ascii_lowercase().as_str());
        let last_known = self.last_names.contains(last.to_ascii_lowercase().as_str());
        match (first_known, last_known) {
            (true, true) => 65.0,
            (true, false) | (false, true) => 40.0,
            (false, false) => 0.0,
        }
    }
}

impl Default for PersonNameDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for PersonNameDetector {
    fn detector_type(&self) -> DetectorType {
        DetectorType::PersonName
    }

    fn name(&self) -> &'static str {
        "person_name"
    }

    fn configure(&mut self, _cfg: &ValidatorsConfig) {}

    fn validate(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch> {
        if !self.shares_tokens(&payload.body_text) {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for (line_number, line) in numbered_lines(&payload.body_text, 1) {
            let mut claimed: Vec<(usize, usize)> = Vec::new();

            for caps in self.title_re.captures_iter(line) {
                let whole = caps.get(0).unwrap();
                claimed.push((whole.start(), whole.end()));
                let mut candidate = match_on_line(
                    DetectorType::PersonName,
                    line_number,
                    line,
                    whole.start(),
                    whole.end(),
                    75.0,
                    MatchSource::Body,
                );
                candidate
                    .detector_meta
                    .push(("form".to_string(), "title_first_last".to_string()));
                apply_penalty(&mut candidate);
                if candidate.confidence > 0.0 {
                    matches.push(candidate);
                }
            }

            for caps in self.reversed_re.captures_iter(line) {
                let whole = caps.get(0).unwrap();
                if overlaps(&claimed, whole.start(), whole.end()) {
                    continue;
                }
                let last = caps.get(1).unwrap().as_str();
                let first = caps.get(2).unwrap().as_str();
                let confidence = self.score_pair(first, last);
                if confidence == 0.0 {
                    continue;
                }
                claimed.push((whole.start(), whole.end()));
                let mut candidate = match_on_line(
                    DetectorType::PersonName,
                    line_number,
                    line,
                    whole.start(),
                    whole.end(),
                    confidence,
                    MatchSource::Body,
                );
                candidate
                    .detector_meta
                    .push(("form".to_string(), "last_first".to_string()));
                apply_penalty(&mut candidate);
                if candidate.confidence > 0.0 {
                    matches.push(candidate);
                }
            }

            for caps in self.pair_re.captures_iter(line) {
                let whole = caps.get(0).unwrap();
                if overlaps(&claimed, whole.start(), whole.end()) {
                    continue;
                }
                let first = caps.get(1).unwrap().as_str();
                let last = caps.get(2).unwrap().as_str();
                let confidence = self.score_pair(first, last);
                if confidence == 0.0 {
                    continue;
                }
                let mut candidate = match_on_line(
                    DetectorType::PersonName,
                    line_number,
                    line,
                    whole.start(),
                    whole.end(),
                    confidence,
                    MatchSource::Body,
                );
                candidate
                    .detector_meta
                    .push(("form".to_string(), "first_last".to_string()));
                apply_penalty(&mut candidate);
                if candidate.confidence > 0.0 {
                    matches.push(candidate);
                }
            }
        }
        matches
    }
}

fn overlaps(claimed: &[(usize, usize)], start: usize, end: usize) -> bool {
    claimed.iter().any(|(s, e)| start < *e && end > *s)
}

fn apply_penalty(candidate: &mut CandidateMatch) {
    if context_has_keyword(candidate, TECHNICAL_TERMS) {
        candidate.confidence -= 25.0;
    }
    candidate.clamp_confidence();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractorId;
    use std::path::Path;

    fn payload(text: &str) -> ExtractedPayload {
        ExtractedPayload::empty(Path::new("doc.txt"), ExtractorId::Plaintext)
            .with_text_stats(text.to_string())
    }

    #[test]
    fn test_known_pair_found() {
        let detector = PersonNameDetector::new();
        let matches = detector.validate(&payload("Prepared by Sarah Johnson last week\n"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_text, "Sarah Johnson");
        assert!(matches[0].confidence >= 60.0);
    }

    #[test]
    fn test_title_form_scores_higher() {
        let detector = PersonNameDetector::new();
        let titled = detector.validate(&payload("Meeting with Dr. Emily Carter today\n"));
        assert!(!titled.is_empty());
        assert!(titled[0].confidence >= 70.0);
    }

    #[test]
    fn test_reversed_form() {
        let detector = PersonNameDetector::new();
        let matches = detector.validate(&payload("Attendee: Johnson, Sarah\n"));
        assert!(!matches.is_empty());
        assert!(matches[0]
            .detector_meta
            .iter()
            .any(|(k, v)| k == "form" && v == "last_first"));
    }

    #[test]
    fn test_unknown_pairs_skipped() {
        let detector = PersonNameDetector::new();
        // Capitalized pair with no table hit anywhere in the text.
        assert!(detector
            .validate(&payload("Quantum Flux exceeded Threshold Limits\n"))
            .is_empty());
    }

    #[test]
    fn test_technical_context_penalised() {
        let detector = PersonNameDetector::new();
        let plain = detector.validate(&payload("author Sarah Johnson wrote it\n"));
        let technical = detector.validate(&payload("api method Sarah Johnson class variable\n"));
        assert!(technical.is_empty() || technical[0].confidence < plain[0].confidence);
    }
}
