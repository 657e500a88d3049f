//! Confidence calibration and cross-signal bus
//!
//! Runs once per payload after the detector set returns, seeing every
//! candidate for that payload and nothing across file boundaries. Order
//! matters: source boosts, then cross-detector overlap suppression, then
//! the environment signal, then the drop-at-zero filter.

use crate::detect::metadata::FieldClass;
use crate::detect::CandidateMatch;
use crate::extract::ExtractedPayload;

/// Path fragments that mark fixture material.
const TEST_PATH_MARKERS: &[&str] = &["/test/", "/tests/", "/spec/", "/fixtures/"];
const TEST_FILE_MARKERS: &[&str] = &[".test.", ".spec.", ".example."];

/// Calibrate all candidates for one payload.
pub fn calibrate(payload: &ExtractedPayload, mut matches: Vec<CandidateMatch>) -> Vec<CandidateMatch> {
    apply_source_boosts(&mut matches);
    apply_overlap_suppression(&mut matches);
    apply_environment_signal(payload, &mut matches);

    for m in &mut matches {
        m.clamp_confidence();
    }
    // A zero after calibration is not a finding.
    matches.retain(|m| m.confidence > 0.0);
    matches
}

/// Metadata-sourced detections gain the boost their field class earns.
fn apply_source_boosts(matches: &mut [CandidateMatch]) {
    for m in matches.iter_mut() {
        if !m.source.is_metadata() {
            continue;
        }
        if let Some(class) = FieldClass::from_meta(&m.detector_meta) {
            m.confidence = (m.confidence + class.source_boost()).min(100.0);
        }
    }
}

/// When two detectors claim overlapping spans on one line and the winner
/// is at 80 or above, the loser's confidence is halved.
fn apply_overlap_suppression(matches: &mut [CandidateMatch]) {
    for i in 0..matches.len() {
        for j in 0..matches.len() {
            if i == j {
                continue;
            }
            let (a, b) = (&matches[i], &matches[j]);
            if a.detector_type == b.detector_type
                || a.line_number != b.line_number
                || !spans_overlap(a, b)
            {
                continue;
            }
            if b.confidence >= 80.0 && a.confidence < b.confidence {
                matches[i].confidence *= 0.5;
            }
        }
    }
}

fn spans_overlap(a: &CandidateMatch, b: &CandidateMatch) -> bool {
    a.column_start < b.column_end && a.column_end > b.column_start
}

/// Fixture-looking paths demote body matches unless the file itself says
/// it runs in production.
fn apply_environment_signal(payload: &ExtractedPayload, matches: &mut [CandidateMatch]) {
    let path = payload.origin_path.to_ascii_lowercase();
    let in_test_path = TEST_PATH_MARKERS.iter().any(|m| path.contains(m))
        || TEST_FILE_MARKERS
            .iter()
            .any(|m| payload.filename.to_ascii_lowercase().contains(m));
    if !in_test_path {
        return;
    }
    if payload.body_text.contains("NODE_ENV=production") {
        return;
    }
    for m in matches.iter_mut() {
        if !m.source.is_metadata() {
            m.confidence -= 20.0;
        }
    }
}
