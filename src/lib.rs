//! # Ferret-Scan - sensitive-data detection engine
//!
//! Ferret-Scan takes a file, directory, or glob and produces a ranked
//! list of findings (credit cards, secrets, SSNs, passports, emails, IPs,
//! phones, names, social handles, IP references, metadata leaks), each
//! tagged with a confidence band, location, and a stable fingerprint that
//! suppression rules can key on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferret_scan::{scan_path, Severity};
//!
//! fn main() -> anyhow::Result<()> {
//!     let outcome = scan_path("reports/q3.docx")?;
//!     for finding in &outcome.emitted {
//!         if finding.severity == Severity::High {
//!             println!("{} at {}:{}", finding.detector_type, finding.origin_path, finding.line_number);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Re-export main types for easy access
pub use crate::config::{FerretConfig, ValidatorsConfig};
pub use crate::detect::{CandidateMatch, Detector, DetectorRegistry, DetectorType, MatchSource};
pub use crate::error::{ErrorKind, FerretError, FerretResult};
pub use crate::extract::{ExtractedPayload, ExtractorId, PositionMap, Preprocessor, ProcessContext};
pub use crate::findings::{FileError, Finding, ScanStatus, ScanSummary, Severity};
pub use crate::report::{Formatter, ScanEvent};
pub use crate::router::FileRouter;
pub use crate::schedule::{EngineOptions, ScanEngine, ScanOutcome};
pub use crate::suppress::{SuppressionRule, SuppressionStore};

// Core modules
pub mod calibrate;
pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod findings;
pub mod limits;
pub mod observer;
pub mod report;
pub mod router;
pub mod schedule;
pub mod suppress;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Scan one path with default options and no suppression rules.
///
/// The event stream is drained internally; callers who want streaming
/// output should drive [`ScanEngine::scan`] themselves.
pub fn scan_path<P: AsRef<Path>>(path: P) -> FerretResult<ScanOutcome> {
    let store = Arc::new(SuppressionStore::empty(Path::new("suppressions.yaml")));
    let engine = ScanEngine::new(
        &ValidatorsConfig::default(),
        store,
        EngineOptions::default(),
        limits::Limits::from_env(),
    );
    let (tx, rx) = schedule::event_channel();
    let outcome = engine.scan(
        &[PathBuf::from(path.as_ref())],
        tx,
        Arc::new(AtomicBool::new(false)),
    )?;
    drop(rx);
    Ok(outcome)
}

/// Scan with an explicit suppression file, mirroring the CLI defaults.
pub fn scan_with_suppressions<P: AsRef<Path>>(
    path: P,
    suppression_file: &Path,
) -> FerretResult<ScanOutcome> {
    let store = Arc::new(SuppressionStore::load(suppression_file)?);
    let engine = ScanEngine::new(
        &ValidatorsConfig::default(),
        store,
        EngineOptions::default(),
        limits::Limits::from_env(),
    );
    let (tx, rx) = schedule::event_channel();
    let outcome = engine.scan(
        &[PathBuf::from(path.as_ref())],
        tx,
        Arc::new(AtomicBool::new(false)),
    )?;
    drop(rx);
    Ok(outcome)
}
