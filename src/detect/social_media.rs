//! Social media detector
//!
//! Opt-in: stays dormant until configuration enables it. Profile URLs use
//! per-platform patterns (overridable from config); bare `@handle` tokens
//! are accepted only when they cannot be the tail of an email address.

use super::context::{context_has_keyword, match_on_line, numbered_lines};
use super::{CandidateMatch, Detector, DetectorType, MatchSource};
use crate::config::ValidatorsConfig;
use crate::extract::ExtractedPayload;
use regex::Regex;

const SOCIAL_KEYWORDS: &[&str] = &[
    "follow", "dm", "tweet", "post", "profile", "handle", "social", "instagram", "tiktok",
    "linkedin",
];

/// Built-in platform profile-URL patterns.
const DEFAULT_PLATFORMS: &[(&str, &str)] = &[
    ("twitter", r"(?:twitter|x)\.com/[A-Za-z0-9_]{2,15}\b"),
    ("instagram", r"instagram\.com/[A-Za-z0-9_.]{2,30}\b"),
    ("facebook", r"facebook\.com/[A-Za-z0-9.]{5,50}\b"),
    ("linkedin", r"linkedin\.com/in/[A-Za-z0-9\-]{3,100}\b"),
    ("tiktok", r"tiktok\.com/@[A-Za-z0-9_.]{2,24}\b"),
    ("youtube", r"youtube\.com/@[A-Za-z0-9_.\-]{3,30}\b"),
    ("mastodon", r"@[A-Za-z0-9_]{2,30}@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b"),
];

pub struct SocialMediaDetector {
    enabled: bool,
    platforms: Vec<(String, Regex)>,
    handle_re: Regex,
}

impl SocialMediaDetector {
    pub fn new() -> Self {
        Self {
            enabled: false,
            platforms: Vec::new(),
            handle_re: Regex::new(r"@[A-Za-z0-9_]{2,30}").unwrap(),
        }
    }
}

/// A handle is only a handle when it is not embedded in an email address:
/// the char before `@` must not be a word char, and the text after the
/// handle must not continue as a domain label.
fn is_email_embedded(line: &str, start: usize, end: usize) -> bool {
    if let Some(prev) = line[..start].chars().next_back() {
        if prev.is_alphanumeric() || prev == '.' || prev == '_' || prev == '-' {
            return true;
        }
    }
    let mut after = line[end..].chars();
    if let (Some('.'), Some(next)) = (after.next(), after.next()) {
        if next.is_ascii_alphabetic() {
            return true;
        }
    }
    false
}

impl Default for SocialMediaDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SocialMediaDetector {
    fn detector_type(&self) -> DetectorType {
        DetectorType::SocialMedia
    }

    fn name(&self) -> &'static str {
        "social_media"
    }

    fn configure(&mut self, cfg: &ValidatorsConfig) {
        self.enabled = cfg.social_media.enabled;
        let mut platforms: Vec<(String, Regex)> = Vec::new();
        if cfg.social_media.platform_patterns.is_empty() {
            for (name, pattern) in DEFAULT_PLATFORMS {
                platforms.push(((*name).to_string(), Regex::new(pattern).unwrap()));
            }
        } else {
            for (name, pattern) in &cfg.social_media.platform_patterns {
                if let Ok(regex) = Regex::new(pattern) {
                    platforms.push((name.clone(), regex));
                }
            }
        }
        self.platforms = platforms;
    }

    fn validate(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch> {
        if !self.enabled {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for (line_number, line) in numbered_lines(&payload.body_text, 1) {
            let mut claimed: Vec<(usize, usize)> = Vec::new();

            for (platform, regex) in &self.platforms {
                for m in regex.find_iter(line) {
                    if claimed.iter().any(|(s, e)| m.start() < *e && m.end() > *s) {
                        continue;
                    }
                    claimed.push((m.start(), m.end()));
                    let mut candidate = match_on_line(
                        DetectorType::SocialMedia,
                        line_number,
                        line,
                        m.start(),
                        m.end(),
                        70.0,
                        MatchSource::Body,
                    );
                    candidate
                        .detector_meta
                        .push(("platform".to_string(), platform.clone()));
                    candidate.clamp_confidence();
                    matches.push(candidate);
                }
            }

            for m in self.handle_re.find_iter(line) {
                if claimed.iter().any(|(s, e)| m.start() < *e && m.end() > *s) {
                    continue;
                }
                if is_email_embedded(line, m.start(), m.end()) {
                    continue;
                }
                let mut candidate = match_on_line(
                    DetectorType::SocialMedia,
                    line_number,
                    line,
                    m.start(),
                    m.end(),
                    55.0,
                    MatchSource::Body,
                );
                if context_has_keyword(&candidate, SOCIAL_KEYWORDS) {
                    candidate.confidence += 15.0;
                }
                candidate
                    .detector_meta
                    .push(("platform".to_string(), "handle".to_string()));
                candidate.clamp_confidence();
                matches.push(candidate);
            }
        }
        matches
    }
}
