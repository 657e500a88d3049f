//! End-to-end pipeline scenarios: real files on disk, the full engine,
//! suppression round-trips, and streaming equivalence.

use ferret_scan::calibrate::calibrate;
use ferret_scan::config::ValidatorsConfig;
use ferret_scan::detect::DetectorRegistry;
use ferret_scan::extract::{ExtractedPayload, ExtractorId};
use ferret_scan::findings::{Finding, Severity};
use ferret_scan::limits::Limits;
use ferret_scan::schedule::{event_channel, EngineOptions, ScanEngine};
use ferret_scan::suppress::SuppressionStore;
use ferret_scan::{DetectorType, ScanOutcome};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn write_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn scan(path: &Path, store: Arc<SuppressionStore>, options: EngineOptions) -> ScanOutcome {
    let engine = ScanEngine::new(&ValidatorsConfig::default(), store, options, Limits::new());
    let (tx, rx) = event_channel();
    let outcome = engine
        .scan(&[path.to_path_buf()], tx, Arc::new(AtomicBool::new(false)))
        .unwrap();
    drop(rx);
    outcome
}

fn scan_default(path: &Path) -> ScanOutcome {
    let store = Arc::new(SuppressionStore::empty(Path::new("unused.yaml")));
    scan(path, store, EngineOptions::default())
}

// --- scenario S1: credit card in plaintext -------------------------------

#[test]
fn s1_credit_card_in_plaintext() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        &dir,
        "tx.txt",
        b"Paid with card 4111 1111 1111 1111 yesterday.\n",
    );

    let outcome = scan_default(&file);
    assert_eq!(outcome.emitted.len(), 1);
    let finding = &outcome.emitted[0];
    assert_eq!(finding.detector_type, DetectorType::CreditCard);
    assert_eq!(finding.severity, Severity::High);
    assert_eq!(finding.line_number, 1);
    assert!(finding
        .detector_meta
        .iter()
        .any(|(k, v)| k == "brand" && v == "Visa"));
}

#[test]
fn s1_suppression_rule_hides_the_finding() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        &dir,
        "tx.txt",
        b"Paid with card 4111 1111 1111 1111 yesterday.\n",
    );

    // First scan to learn the fingerprint, persisted as a disabled rule.
    let outcome = scan_default(&file);
    let fingerprint = outcome.emitted[0].fingerprint.clone();

    let rules_path = dir.path().join("suppressions.yaml");
    let mut store = SuppressionStore::empty(&rules_path);
    store.generate_and_persist(&outcome.emitted).unwrap();

    // Enable the rule on disk the way a reviewer would.
    let text = std::fs::read_to_string(&rules_path).unwrap();
    std::fs::write(&rules_path, text.replace("enabled: false", "enabled: true")).unwrap();

    let store = Arc::new(SuppressionStore::load(&rules_path).unwrap());
    let options = EngineOptions {
        show_suppressed: true,
        ..EngineOptions::default()
    };
    let outcome = scan(&file, store, options);
    assert!(outcome.emitted.is_empty());
    assert_eq!(outcome.suppressed.len(), 1);
    assert_eq!(outcome.suppressed[0].fingerprint, fingerprint);
}

// --- scenario S2: SSN with test-data context -----------------------------

#[test]
fn s2_test_ssn_lands_in_low_band() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "doc.txt", b"Example SSN: 123-45-6789 (for testing).\n");

    let outcome = scan_default(&file);
    let ssn: Vec<&Finding> = outcome
        .emitted
        .iter()
        .filter(|f| f.detector_type == DetectorType::Ssn)
        .collect();
    assert_eq!(ssn.len(), 1);
    assert_eq!(ssn[0].severity, Severity::Low);
    assert!(ssn[0].confidence < 60.0);
    // Default pre-commit threshold is HIGH: this must not trip it.
    assert!(!outcome.summary.has_findings_at_or_above(Severity::High));
}

// --- scenario S3: private IP addresses ignored ---------------------------

#[test]
fn s3_private_ips_suppressed() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "hosts.txt", b"host 10.0.0.4\ngw 192.168.1.1\ndns 8.8.8.8\n");

    let outcome = scan_default(&file);
    let ips: Vec<&Finding> = outcome
        .emitted
        .iter()
        .filter(|f| f.detector_type == DetectorType::IpAddress)
        .collect();
    assert_eq!(ips.len(), 1);
    assert_eq!(ips[0].match_text, "8.8.8.8");
    assert_eq!(ips[0].line_number, 3);
}

// --- scenario S4: image with GPS EXIF ------------------------------------

/// Minimal JPEG wrapping an EXIF block whose GPS IFD holds
/// 37.7749 N, 122.4194 W, altitude 52 m.
fn gps_jpeg() -> Vec<u8> {
    fn entry(tag: u16, kind: u16, count: u32, value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
        out
    }
    fn rational(num: u32, denom: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&num.to_le_bytes());
        out.extend_from_slice(&denom.to_le_bytes());
        out
    }

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&0x2Au16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes()); // IFD0 offset

    // IFD0: one entry, the GPS IFD pointer (tag 0x8825).
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&entry(0x8825, 4, 1, 26));
    tiff.extend_from_slice(&0u32.to_le_bytes());

    // GPS IFD at offset 26: five entries.
    tiff.extend_from_slice(&5u16.to_le_bytes());
    tiff.extend_from_slice(&entry(0x0001, 2, 2, u32::from_le_bytes(*b"N\0\0\0"))); // lat ref
    tiff.extend_from_slice(&entry(0x0002, 5, 3, 92)); // lat
    tiff.extend_from_slice(&entry(0x0003, 2, 2, u32::from_le_bytes(*b"W\0\0\0"))); // lon ref
    tiff.extend_from_slice(&entry(0x0004, 5, 3, 116)); // lon
    tiff.extend_from_slice(&entry(0x0006, 5, 1, 140)); // altitude
    tiff.extend_from_slice(&0u32.to_le_bytes());

    assert_eq!(tiff.len(), 92);
    // 37 deg 46 min 29.64 sec
    tiff.extend_from_slice(&rational(37, 1));
    tiff.extend_from_slice(&rational(46, 1));
    tiff.extend_from_slice(&rational(2964, 100));
    // 122 deg 25 min 9.84 sec
    tiff.extend_from_slice(&rational(122, 1));
    tiff.extend_from_slice(&rational(25, 1));
    tiff.extend_from_slice(&rational(984, 100));
    // 52 m
    tiff.extend_from_slice(&rational(52, 1));

    let mut app1 = Vec::new();
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&tiff);

    let mut jpeg = vec![0xFF, 0xD8]; // SOI
    jpeg.extend_from_slice(&[0xFF, 0xE1]);
    jpeg.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
    jpeg.extend_from_slice(&app1);
    jpeg.extend_from_slice(&[0xFF, 0xD9]); // EOI
    jpeg
}

#[test]
fn s4_gps_exif_consolidated_and_high() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "photo.jpg", &gps_jpeg());

    let outcome = scan_default(&file);
    let gps: Vec<&Finding> = outcome
        .emitted
        .iter()
        .filter(|f| {
            f.detector_type == DetectorType::Metadata
                && f.detector_meta
                    .iter()
                    .any(|(k, v)| k == "metadata_key" && v == "GPS_Coordinates")
        })
        .collect();
    assert_eq!(gps.len(), 1);
    assert_eq!(gps[0].match_text, "37.7749, -122.4194, 52 m");
    assert_eq!(gps[0].severity, Severity::High);
}

// --- scenario S5: office document with embedded image --------------------

fn docx_with_embedded_gps_image(dir: &tempfile::TempDir) -> PathBuf {
    use zip::write::SimpleFileOptions;
    let path = dir.path().join("doc.docx");
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    writer.start_file("docProps/core.xml", options).unwrap();
    writer
        .write_all(
            br#"<?xml version="1.0"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
                   xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:creator>Jordan Smith</dc:creator>
</cp:coreProperties>"#,
        )
        .unwrap();

    writer.start_file("docProps/app.xml", options).unwrap();
    writer
        .write_all(
            br#"<?xml version="1.0"?>
<Properties><Application>Microsoft Office Word</Application><Company>Acme Corp</Company></Properties>"#,
        )
        .unwrap();

    writer.start_file("word/media/image1.jpg", options).unwrap();
    writer.write_all(&gps_jpeg()).unwrap();
    writer.finish().unwrap();
    path
}

#[test]
fn s5_embedded_image_chains_origin() {
    let dir = tempfile::tempdir().unwrap();
    let file = docx_with_embedded_gps_image(&dir);

    let outcome = scan_default(&file);

    let author = outcome
        .emitted
        .iter()
        .find(|f| {
            f.detector_type == DetectorType::Metadata
                && f.detector_meta
                    .iter()
                    .any(|(k, v)| k == "metadata_key" && v == "Author")
        })
        .expect("author metadata finding");
    assert!(author.origin_path.ends_with("doc.docx"));
    assert_eq!(author.match_text, "Jordan Smith");

    let gps = outcome
        .emitted
        .iter()
        .find(|f| {
            f.detector_meta
                .iter()
                .any(|(k, v)| k == "metadata_key" && v == "GPS_Coordinates")
        })
        .expect("embedded gps finding");
    assert!(
        gps.origin_path.contains("doc.docx -> image1.jpg"),
        "origin was {}",
        gps.origin_path
    );
}

// --- scenario S6: generate then re-scan suppressions ---------------------

#[test]
fn s6_generation_is_idempotent_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        &dir,
        "tx.txt",
        b"Paid with card 4111 1111 1111 1111 yesterday.\n",
    );
    let rules_path = dir.path().join("suppressions.yaml");

    // Session one.
    let outcome = scan_default(&file);
    let fingerprint = outcome.emitted[0].fingerprint.clone();
    let mut store = SuppressionStore::empty(&rules_path);
    store.generate_and_persist(&outcome.emitted).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.rules()[0].hash, fingerprint);
    assert!(!store.rules()[0].enabled);
    let first_id = store.rules()[0].id.clone();
    let first_seen = store.rules()[0].last_seen_at;

    // Session two: fresh process, same file.
    std::thread::sleep(std::time::Duration::from_millis(5));
    let outcome = scan_default(&file);
    assert_eq!(outcome.emitted[0].fingerprint, fingerprint);
    let mut store = SuppressionStore::load(&rules_path).unwrap();
    store.generate_and_persist(&outcome.emitted).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.rules()[0].id, first_id);
    assert_ne!(store.rules()[0].last_seen_at, first_seen);
}

// --- universal properties ------------------------------------------------

#[test]
fn fingerprints_are_stable_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        &dir,
        "stable.txt",
        b"contact alex.roe@acme-corp.io\nemployee ssn 536-22-8745\n",
    );
    let first: Vec<String> = scan_default(&file)
        .emitted
        .iter()
        .map(|f| f.fingerprint.clone())
        .collect();
    let second: Vec<String> = scan_default(&file)
        .emitted
        .iter()
        .map(|f| f.fingerprint.clone())
        .collect();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn metadata_detector_only_sees_metadata_payloads() {
    let registry = DetectorRegistry::with_defaults(&ValidatorsConfig::default());
    for extractor in [
        ExtractorId::Plaintext,
        ExtractorId::PdfText,
        ExtractorId::OfficeText,
        ExtractorId::None,
    ] {
        let mut payload = ExtractedPayload::empty(Path::new("x.bin"), extractor);
        payload.structured_metadata = vec![("Author".to_string(), "Somebody".to_string())];
        payload.body_text = "Author: Somebody".to_string();
        assert!(
            registry.run_metadata(&payload).is_empty(),
            "{:?} leaked into the metadata detector",
            extractor
        );
    }
}

#[test]
fn no_zero_confidence_finding_ever_emitted() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        &dir,
        "mixed.txt",
        b"host 127.0.0.1\ncard 4111 1111 1111 1111\nuser@example.com test example\n",
    );
    let outcome = scan_default(&file);
    for finding in outcome.emitted.iter().chain(outcome.suppressed.iter()) {
        assert!(finding.confidence > 0.0);
    }
}

#[test]
fn streaming_and_whole_file_scans_agree() {
    let dir = tempfile::tempdir().unwrap();

    // ~12 MB of filler with sensitive lines sprinkled through, so the
    // engine takes the streaming path.
    let mut content = String::with_capacity(13 * 1024 * 1024);
    for i in 0..280_000 {
        if i % 50_000 == 0 {
            content.push_str("card 4111 1111 1111 1111 charged here\n");
        } else if i % 70_001 == 0 {
            content.push_str("dns server 8.8.8.8 configured\n");
        } else {
            content.push_str(&format!("filler line {:07} with ordinary words\n", i));
        }
    }
    let file = write_file(&dir, "big.log", content.as_bytes());
    assert!(std::fs::metadata(&file).unwrap().len() > 10 * 1024 * 1024);

    let streamed = scan_default(&file);
    let mut streamed_keys: Vec<(DetectorType, usize, String)> = streamed
        .emitted
        .iter()
        .map(|f| (f.detector_type, f.line_number, f.fingerprint.clone()))
        .collect();
    streamed_keys.sort();

    // Whole-file reference: one payload through the same registry and
    // calibration.
    let registry = DetectorRegistry::with_defaults(&ValidatorsConfig::default());
    let mut payload =
        ExtractedPayload::empty(&file, ExtractorId::Plaintext).with_text_stats(content);
    payload.origin_path = file.display().to_string();
    let candidates = registry.run_body(&payload);
    let calibrated = calibrate(&payload, candidates);
    let mut whole_keys: Vec<(DetectorType, usize, String)> = calibrated
        .into_iter()
        .filter_map(|c| Finding::from_candidate(c, &payload.origin_path, &payload.filename))
        .map(|f| (f.detector_type, f.line_number, f.fingerprint))
        .collect();
    whole_keys.sort();

    assert_eq!(streamed_keys, whole_keys);
    assert!(!streamed_keys.is_empty());
}

#[test]
fn findings_within_a_file_follow_registration_order() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        &dir,
        "order.txt",
        b"card 4111 1111 1111 1111 ok\ncontact casey.roe@acme-corp.io\nemployee ssn 536-22-8745\n",
    );
    let engine = ScanEngine::new(
        &ValidatorsConfig::default(),
        Arc::new(SuppressionStore::empty(Path::new("unused.yaml"))),
        EngineOptions::default(),
        Limits::new(),
    );
    let (tx, rx) = event_channel();
    engine
        .scan(&[file], tx, Arc::new(AtomicBool::new(false)))
        .unwrap();

    let order: Vec<DetectorType> = rx
        .try_iter()
        .filter_map(|e| match e {
            ferret_scan::ScanEvent::Finding(f) => Some(f.detector_type),
            _ => None,
        })
        .collect();
    let registry = DetectorRegistry::with_defaults(&ValidatorsConfig::default());
    let registration = registry.registration_order();
    let positions: Vec<usize> = order
        .iter()
        .map(|t| registration.iter().position(|r| r == t).unwrap())
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "emission order {:?}", order);
}
