//! Detector registry
//!
//! Each detector consumes one source partition of an extracted payload
//! (body text or structured metadata) and returns candidate matches with a
//! calibrated confidence. The registry holds detectors in a stable order;
//! that order defines the within-file emission order.

pub mod context;
pub mod credit_card;
pub mod email;
pub mod entropy;
pub mod intellectual_property;
pub mod ip_address;
pub mod metadata;
pub mod passport;
pub mod person_name;
pub mod phone;
pub mod secrets;
pub mod social_media;
pub mod ssn;

use crate::config::ValidatorsConfig;
use crate::extract::ExtractedPayload;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// The detector taxonomy. `Display` renders the wire names used in output
/// formats and suppression fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectorType {
    CreditCard,
    Email,
    IpAddress,
    Metadata,
    Passport,
    PersonName,
    Phone,
    Secrets,
    SocialMedia,
    Ssn,
    IntellectualProperty,
}

impl DetectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorType::CreditCard => "CREDIT_CARD",
            DetectorType::Email => "EMAIL",
            DetectorType::IpAddress => "IP_ADDRESS",
            DetectorType::Metadata => "METADATA",
            DetectorType::Passport => "PASSPORT",
            DetectorType::PersonName => "PERSON_NAME",
            DetectorType::Phone => "PHONE",
            DetectorType::Secrets => "SECRETS",
            DetectorType::SocialMedia => "SOCIAL_MEDIA",
            DetectorType::Ssn => "SSN",
            DetectorType::IntellectualProperty => "INTELLECTUAL_PROPERTY",
        }
    }

    /// Parse a `--checks` token (case-insensitive).
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_uppercase();
        Self::all().iter().copied().find(|t| t.as_str() == token)
    }

    pub fn all() -> &'static [DetectorType] {
        &[
            DetectorType::CreditCard,
            DetectorType::Email,
            DetectorType::IpAddress,
            DetectorType::Metadata,
            DetectorType::Passport,
            DetectorType::PersonName,
            DetectorType::Phone,
            DetectorType::Secrets,
            DetectorType::SocialMedia,
            DetectorType::Ssn,
            DetectorType::IntellectualProperty,
        ]
    }
}

impl std::fmt::Display for DetectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which partition of the payload a match came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Body,
    Metadata { key: String },
}

impl MatchSource {
    pub fn is_metadata(&self) -> bool {
        matches!(self, MatchSource::Metadata { .. })
    }
}

/// A raw detection before calibration and fingerprinting.
#[derive(Debug, Clone)]
pub struct CandidateMatch {
    pub detector_type: DetectorType,
    pub match_text: String,
    /// 1-based line within the extracted text.
    pub line_number: usize,
    pub column_start: usize,
    pub column_end: usize,
    pub full_line: String,
    pub before_context: String,
    pub after_context: String,
    /// Confidence in [0, 100]. A candidate at 0 is dropped downstream.
    pub confidence: f64,
    pub source: MatchSource,
    pub detector_meta: Vec<(String, String)>,
}

impl CandidateMatch {
    /// Clamp confidence into the contract range.
    pub fn clamp_confidence(&mut self) {
        self.confidence = self.confidence.clamp(0.0, 100.0);
    }

    /// Best-effort scrub of the sensitive text after emission.
    pub fn scrub(&mut self) {
        self.match_text.zeroize();
        self.full_line.zeroize();
        self.before_context.zeroize();
        self.after_context.zeroize();
    }
}

/// Contract every detector implements. `validate` must be pure with
/// respect to the payload: all state is frozen at `configure` time.
pub trait Detector: Send + Sync {
    fn detector_type(&self) -> DetectorType;

    fn name(&self) -> &'static str;

    fn configure(&mut self, cfg: &ValidatorsConfig);

    fn validate(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch>;
}

/// Holds the detector set in registration order.
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn Detector>>,
    enabled: Vec<DetectorType>,
}

impl DetectorRegistry {
    /// Build the full registry. Registration order is fixed and defines
    /// the within-file finding order.
    pub fn with_defaults(cfg: &ValidatorsConfig) -> Self {
        let mut detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(credit_card::CreditCardDetector::new()),
            Box::new(email::EmailDetector::new()),
            Box::new(ip_address::IpAddressDetector::new()),
            Box::new(passport::PassportDetector::new()),
            Box::new(person_name::PersonNameDetector::new()),
            Box::new(phone::PhoneDetector::new()),
            Box::new(secrets::SecretsDetector::new()),
            Box::new(social_media::SocialMediaDetector::new()),
            Box::new(ssn::SsnDetector::new()),
            Box::new(intellectual_property::IntellectualPropertyDetector::new()),
            Box::new(metadata::MetadataDetector::new()),
        ];
        for detector in &mut detectors {
            detector.configure(cfg);
        }
        Self {
            detectors,
            enabled: DetectorType::all().to_vec(),
        }
    }

    /// Restrict to a subset of detector types (`--checks`).
    pub fn with_enabled(mut self, enabled: Vec<DetectorType>) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self, detector_type: DetectorType) -> bool {
        self.enabled.contains(&detector_type)
    }

    /// Run the body-sourced detectors over a payload, in registration
    /// order. The METADATA detector never runs here.
    pub fn run_body(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch> {
        if !payload.has_body() {
            return Vec::new();
        }
        let mut matches = Vec::new();
        for detector in &self.detectors {
            let dt = detector.detector_type();
            if dt == DetectorType::Metadata || !self.is_enabled(dt) {
                continue;
            }
            matches.extend(detector.validate(payload));
        }
        matches
    }

    /// Run the METADATA detector. The file-type filter is absolute: only
    /// payloads produced by a `*_metadata` extractor are eligible.
    pub fn run_metadata(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch> {
        if !payload.extractor_id.is_metadata()
            || !payload.has_metadata()
            || !self.is_enabled(DetectorType::Metadata)
        {
            return Vec::new();
        }
        self.detectors
            .iter()
            .filter(|d| d.detector_type() == DetectorType::Metadata)
            .flat_map(|d| d.validate(payload))
            .collect()
    }

    /// Registration order, used by tests and the emission contract.
    pub fn registration_order(&self) -> Vec<DetectorType> {
        self.detectors.iter().map(|d| d.detector_type()).collect()
    }
}
