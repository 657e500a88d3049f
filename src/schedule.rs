//! Scan scheduler
//!
//! One coordinator feeds a bounded queue; a fixed pool of workers runs
//! the per-file pipeline synchronously and fans findings out onto the
//! event channel. Backpressure exists only at the queue boundary. The
//! live worker count shrinks under memory pressure and while a very
//! large file is in flight.

use crate::calibrate::calibrate;
use crate::config::ValidatorsConfig;
use crate::detect::{DetectorRegistry, DetectorType};
use crate::error::{ErrorKind, FerretError, FerretResult};
use crate::extract::streaming::ChunkReader;
use crate::extract::{basename, ExtractedPayload, ExtractorId, ProcessContext};
use crate::findings::{FileError, Finding, ScanStatus, ScanSummary, Severity};
use crate::limits::{Limits, CANCEL_GRACE, PER_FILE_TIMEOUT, STREAMING_THRESHOLD};
use crate::observer::ScanObserver;
use crate::report::ScanEvent;
use crate::router::FileRouter;
use crate::suppress::SuppressionStore;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Files above this size clamp pool concurrency while they are in flight.
const BIG_FILE_THRESHOLD: u64 = 250 * 1024 * 1024;
/// Resident-set ceiling before the pool halves itself.
const MEMORY_PRESSURE_BYTES: u64 = 1024 * 1024 * 1024;

/// Options the engine consumes; everything else stays with the CLI layer.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub checks: Vec<DetectorType>,
    /// Bands allowed through to emission.
    pub bands: Vec<Severity>,
    pub show_suppressed: bool,
    pub enable_preprocessors: bool,
    pub preprocess_only: bool,
    pub recursive: bool,
    pub workers: Option<usize>,
    /// Redaction plumbing: when set, emitted findings append their
    /// original positions to this JSON-lines audit log.
    pub redaction_audit_log: Option<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            checks: DetectorType::all().to_vec(),
            bands: vec![Severity::High, Severity::Medium, Severity::Low],
            show_suppressed: false,
            enable_preprocessors: true,
            preprocess_only: false,
            recursive: false,
            workers: None,
            redaction_audit_log: None,
        }
    }
}

/// Pool sizing: between 2 and 32, tracking the CPU count.
pub fn default_pool_size() -> usize {
    num_cpus::get().min(32).max(2)
}

/// Live-worker limit derived from current pressure signals.
struct ThrottleGate {
    total: usize,
    big_active: AtomicUsize,
    memory_pressure: AtomicBool,
}

impl ThrottleGate {
    fn new(total: usize) -> Self {
        Self {
            total,
            big_active: AtomicUsize::new(0),
            memory_pressure: AtomicBool::new(false),
        }
    }

    fn limit(&self) -> usize {
        if self.big_active.load(Ordering::Relaxed) > 0 {
            (self.total / 4).max(2)
        } else if self.memory_pressure.load(Ordering::Relaxed) {
            (self.total / 2).max(2)
        } else {
            self.total
        }
    }
}

/// Everything a scan accumulates besides the event stream.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub summary: ScanSummary,
    pub emitted: Vec<Finding>,
    pub suppressed: Vec<Finding>,
    pub status: ScanStatus,
}

pub struct ScanEngine {
    registry: Arc<DetectorRegistry>,
    router: Arc<FileRouter>,
    store: Arc<SuppressionStore>,
    observer: Arc<ScanObserver>,
    options: EngineOptions,
    limits: Limits,
    audit: Option<Arc<crate::report::AuditLog>>,
}

impl ScanEngine {
    pub fn new(
        validators: &ValidatorsConfig,
        store: Arc<SuppressionStore>,
        options: EngineOptions,
        limits: Limits,
    ) -> Self {
        let observer = Arc::new(ScanObserver::new());
        let registry = DetectorRegistry::with_defaults(validators)
            .with_enabled(options.checks.clone());
        let mut router = FileRouter::new(limits.clone(), options.enable_preprocessors);
        router.set_observer(Arc::clone(&observer));
        let audit = options
            .redaction_audit_log
            .as_deref()
            .and_then(|path| crate::report::AuditLog::open(path).ok())
            .map(Arc::new);
        Self {
            registry: Arc::new(registry),
            router: Arc::new(router),
            store,
            observer,
            options,
            limits,
            audit,
        }
    }

    pub fn observer(&self) -> Arc<ScanObserver> {
        Arc::clone(&self.observer)
    }

    /// Run a full scan over the resolved inputs. Events stream to
    /// `events`; the outcome accumulates everything rule generation and
    /// exit codes need.
    pub fn scan(
        &self,
        inputs: &[PathBuf],
        events: Sender<ScanEvent>,
        cancel: Arc<AtomicBool>,
    ) -> FerretResult<ScanOutcome> {
        let started = Instant::now();
        let workers = self
            .options
            .workers
            .unwrap_or_else(default_pool_size)
            .clamp(1, 32);
        let gate = Arc::new(ThrottleGate::new(workers));
        let outcome = Arc::new(Mutex::new(ScanOutcome::default()));

        let (task_tx, task_rx) = bounded::<PathBuf>(2 * workers);
        let monitor_stop = Arc::new(AtomicBool::new(false));
        let monitor = spawn_memory_monitor(
            Arc::clone(&gate),
            Arc::clone(&monitor_stop),
            Arc::clone(&self.observer),
        );

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let task_rx = task_rx.clone();
            let events = events.clone();
            let cancel = Arc::clone(&cancel);
            let gate = Arc::clone(&gate);
            let outcome = Arc::clone(&outcome);
            let worker = WorkerContext {
                registry: Arc::clone(&self.registry),
                router: Arc::clone(&self.router),
                store: Arc::clone(&self.store),
                observer: Arc::clone(&self.observer),
                options: self.options.clone(),
                limits: self.limits.clone(),
                audit: self.audit.clone(),
            };
            handles.push(std::thread::spawn(move || {
                run_worker(index, worker, task_rx, events, cancel, gate, outcome);
            }));
        }
        drop(task_rx);

        // The walker runs on this thread; a full queue blocks it, which is
        // the only source of backpressure in the pipeline.
        let walk_result = self.walk_inputs(inputs, &task_tx, &cancel);
        drop(task_tx);

        let deadline = Instant::now() + CANCEL_GRACE;
        for handle in handles {
            if cancel.load(Ordering::Relaxed) && Instant::now() > deadline {
                break;
            }
            let _ = handle.join();
        }
        monitor_stop.store(true, Ordering::Relaxed);
        let _ = monitor.join();

        walk_result?;

        // A worker abandoned past the grace deadline may still hold a
        // clone; fall back to copying what was accumulated so far.
        let mut outcome = match Arc::try_unwrap(outcome) {
            Ok(inner) => inner
                .into_inner()
                .map_err(|_| FerretError::scheduler("outcome lock poisoned"))?,
            Err(shared) => shared
                .lock()
                .map_err(|_| FerretError::scheduler("outcome lock poisoned"))?
                .clone(),
        };

        outcome.summary.scan_time_ms = started.elapsed().as_millis() as u64;
        outcome.status = if cancel.load(Ordering::Relaxed) {
            ScanStatus::Cancelled
        } else if outcome.summary.files_errored > outcome.summary.files_scanned {
            ScanStatus::Failed
        } else {
            ScanStatus::Completed
        };

        let _ = events.send(ScanEvent::EndOfScan {
            summary: outcome.summary.clone(),
            status: outcome.status,
        });
        Ok(outcome)
    }

    /// Expand the inputs (files, directories, globs) into the task queue.
    fn walk_inputs(
        &self,
        inputs: &[PathBuf],
        task_tx: &Sender<PathBuf>,
        cancel: &AtomicBool,
    ) -> FerretResult<()> {
        for input in inputs {
            if cancel.load(Ordering::Relaxed) {
                return Ok(());
            }
            let text = input.to_string_lossy();
            if text.contains(&['*', '?', '['][..]) {
                let paths = glob::glob(&text)
                    .map_err(|e| FerretError::config(format!("bad glob '{}': {}", text, e)))?;
                for entry in paths.flatten() {
                    if entry.is_file() && enqueue(task_tx, cancel, entry).is_err() {
                        return Ok(());
                    }
                }
            } else if input.is_dir() {
                let mut builder = ignore::WalkBuilder::new(input);
                builder.follow_links(false).hidden(true);
                if !self.options.recursive {
                    builder.max_depth(Some(1));
                }
                for entry in builder.build().flatten() {
                    if cancel.load(Ordering::Relaxed) {
                        return Ok(());
                    }
                    let path = entry.path();
                    if path.is_file() && enqueue(task_tx, cancel, path.to_path_buf()).is_err() {
                        return Ok(());
                    }
                }
            } else {
                if enqueue(task_tx, cancel, input.clone()).is_err() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

fn enqueue(task_tx: &Sender<PathBuf>, cancel: &AtomicBool, path: PathBuf) -> Result<(), ()> {
    if cancel.load(Ordering::Relaxed) {
        return Err(());
    }
    task_tx.send(path).map_err(|_| ())
}

/// State one worker needs; cloned Arc handles throughout.
struct WorkerContext {
    registry: Arc<DetectorRegistry>,
    router: Arc<FileRouter>,
    store: Arc<SuppressionStore>,
    observer: Arc<ScanObserver>,
    options: EngineOptions,
    limits: Limits,
    audit: Option<Arc<crate::report::AuditLog>>,
}

fn run_worker(
    index: usize,
    worker: WorkerContext,
    task_rx: Receiver<PathBuf>,
    events: Sender<ScanEvent>,
    cancel: Arc<AtomicBool>,
    gate: Arc<ThrottleGate>,
    outcome: Arc<Mutex<ScanOutcome>>,
) {
    while let Ok(path) = task_rx.recv() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        // Hold back while the gate says fewer workers should be live.
        while index >= gate.limit() {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(25));
        }

        let file_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let is_big = file_size > BIG_FILE_THRESHOLD;
        if is_big {
            gate.big_active.fetch_add(1, Ordering::Relaxed);
        }

        process_one(&worker, &path, &events, &cancel, &outcome);

        if is_big {
            gate.big_active.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

fn process_one(
    worker: &WorkerContext,
    path: &Path,
    events: &Sender<ScanEvent>,
    cancel: &Arc<AtomicBool>,
    outcome: &Arc<Mutex<ScanOutcome>>,
) {
    let started = Instant::now();
    let display_path = path.display().to_string();
    worker.observer.file_started(&display_path);

    let ctx = ProcessContext::new(Arc::clone(cancel), PER_FILE_TIMEOUT);
    let result = scan_file(worker, path, &ctx, events);

    match result {
        Ok(FileResult::Findings { emitted, suppressed }) => {
            worker
                .observer
                .file_finished(&display_path, emitted.len(), started.elapsed());
            let mut outcome = outcome.lock().expect("outcome lock poisoned");
            outcome.summary.files_scanned += 1;
            for finding in emitted {
                outcome.summary.record_finding(&finding);
                let _ = events.send(ScanEvent::Finding(finding.clone()));
                outcome.emitted.push(finding);
            }
            for finding in suppressed {
                outcome.summary.record_suppressed();
                if worker.options.show_suppressed {
                    let _ = events.send(ScanEvent::Suppressed(finding.clone()));
                }
                outcome.suppressed.push(finding);
            }
        }
        Ok(FileResult::PreprocessedOnly) => {
            let mut outcome = outcome.lock().expect("outcome lock poisoned");
            outcome.summary.files_scanned += 1;
        }
        Err(e) => {
            let kind = e.kind();
            if kind == ErrorKind::Cancelled {
                return;
            }
            worker
                .observer
                .file_errored(&display_path, kind.as_str(), &e.to_string());
            let error = FileError {
                path: display_path,
                kind,
                message: e.to_string(),
                suggestion: e.suggestion().map(|s| s.to_string()),
            };
            let mut outcome = outcome.lock().expect("outcome lock poisoned");
            outcome.summary.record_error(&error);
            let _ = events.send(ScanEvent::FileError(error));
        }
    }
}

enum FileResult {
    Findings {
        emitted: Vec<Finding>,
        suppressed: Vec<Finding>,
    },
    PreprocessedOnly,
}

/// Per-file pipeline: route, detect, calibrate, fingerprint, suppress.
/// Timed-out files propagate the error and keep no partial matches.
fn scan_file(
    worker: &WorkerContext,
    path: &Path,
    ctx: &ProcessContext,
    events: &Sender<ScanEvent>,
) -> FerretResult<FileResult> {
    // Large plaintext bodies go through the streaming reader instead of
    // one giant payload.
    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if worker.options.enable_preprocessors
        && !worker.options.preprocess_only
        && file_size > STREAMING_THRESHOLD
        && is_plaintext_candidate(path, &worker.limits)
    {
        let (emitted, suppressed) = scan_streamed(worker, path, ctx)?;
        return Ok(FileResult::Findings { emitted, suppressed });
    }

    let mut payloads = worker.router.process_file(path, ctx)?;

    if worker.options.preprocess_only {
        for payload in &payloads {
            if payload.has_body() {
                let _ = events.send(ScanEvent::ExtractedText {
                    path: payload.origin_path.clone(),
                    text: payload.body_text.clone(),
                });
            }
        }
        return Ok(FileResult::PreprocessedOnly);
    }

    let mut emitted = Vec::new();
    let mut suppressed = Vec::new();
    for payload in &mut payloads {
        ctx.check(path)?;
        let (e, s) = scan_payload(worker, payload);
        if let Some(audit) = &worker.audit {
            for finding in &e {
                let mapping = payload
                    .position_map
                    .as_ref()
                    .and_then(|map| map.lookup_line(finding.line_number));
                let _ = audit.record(&finding.fingerprint, mapping);
            }
        }
        emitted.extend(e);
        suppressed.extend(s);
        scrub_payload(payload);
    }
    Ok(FileResult::Findings { emitted, suppressed })
}

/// Detect and calibrate one payload, splitting results on suppression.
fn scan_payload(
    worker: &WorkerContext,
    payload: &ExtractedPayload,
) -> (Vec<Finding>, Vec<Finding>) {
    let mut candidates = worker.registry.run_body(payload);
    candidates.extend(worker.registry.run_metadata(payload));
    let calibrated = calibrate(payload, candidates);

    split_by_suppression(
        calibrated
            .into_iter()
            .filter_map(|c| Finding::from_candidate(c, &payload.origin_path, &payload.filename)),
        &worker.store,
        &worker.options.bands,
    )
}

/// Apply the band filter, then the suppression store.
fn split_by_suppression(
    findings: impl Iterator<Item = Finding>,
    store: &SuppressionStore,
    bands: &[Severity],
) -> (Vec<Finding>, Vec<Finding>) {
    let mut emitted = Vec::new();
    let mut suppressed = Vec::new();
    for finding in findings {
        if !bands.contains(&finding.severity) {
            continue;
        }
        if store.is_suppressed(&finding) {
            suppressed.push(finding);
        } else {
            emitted.push(finding);
        }
    }
    (emitted, suppressed)
}

/// Streamed body scan: one chunk at a time, line numbers rebased onto the
/// whole file. Chunks split on line boundaries, so the finding set matches
/// a whole-file scan.
fn scan_streamed(
    worker: &WorkerContext,
    path: &Path,
    ctx: &ProcessContext,
) -> FerretResult<(Vec<Finding>, Vec<Finding>)> {
    let mut emitted = Vec::new();
    let mut suppressed = Vec::new();
    let reader = ChunkReader::open(path, STREAMING_THRESHOLD as usize)?;

    for chunk in reader {
        ctx.check(path)?;
        let chunk = chunk?;
        let first_line = chunk.first_line;
        let mut payload =
            ExtractedPayload::empty(path, ExtractorId::Plaintext).with_text_stats(chunk.text);
        payload.origin_path = path.display().to_string();
        payload.filename = basename(path);

        let mut candidates = worker.registry.run_body(&payload);
        for candidate in &mut candidates {
            candidate.line_number += first_line - 1;
        }
        let calibrated = calibrate(&payload, candidates);
        let (e, s) = split_by_suppression(
            calibrated
                .into_iter()
                .filter_map(|c| Finding::from_candidate(c, &payload.origin_path, &payload.filename)),
            &worker.store,
            &worker.options.bands,
        );
        emitted.extend(e);
        suppressed.extend(s);
        scrub_payload(&mut payload);
    }
    Ok((emitted, suppressed))
}

fn is_plaintext_candidate(path: &Path, limits: &Limits) -> bool {
    use crate::extract::Preprocessor;
    crate::extract::PlaintextExtractor::new(limits.clone()).can_process(path)
}

/// Best-effort scrub of buffers that held match text.
fn scrub_payload(payload: &mut ExtractedPayload) {
    use zeroize::Zeroize;
    payload.body_text.zeroize();
    for (_, value) in &mut payload.structured_metadata {
        value.zeroize();
    }
}

/// Samples resident memory twice a second and flips the pressure flag.
fn spawn_memory_monitor(
    gate: Arc<ThrottleGate>,
    stop: Arc<AtomicBool>,
    observer: Arc<ScanObserver>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(_) => return,
        };
        let mut system = sysinfo::System::new();
        while !stop.load(Ordering::Relaxed) {
            system.refresh_process(pid);
            if let Some(process) = system.process(pid) {
                let before = gate.limit();
                let pressure = process.memory() > MEMORY_PRESSURE_BYTES;
                gate.memory_pressure.store(pressure, Ordering::Relaxed);
                let after = gate.limit();
                if before != after {
                    observer.workers_resized(before, after, "memory pressure");
                }
            }
            std::thread::sleep(std::time::Duration::from_millis(500));
        }
    })
}

/// Event channel constructor used by the library entry points.
pub fn event_channel() -> (Sender<ScanEvent>, Receiver<ScanEvent>) {
    unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn engine(options: EngineOptions) -> ScanEngine {
        let store = Arc::new(SuppressionStore::empty(Path::new("/tmp/nonexistent.yaml")));
        ScanEngine::new(&ValidatorsConfig::default(), store, options, Limits::new())
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn drain(rx: Receiver<ScanEvent>) -> Vec<ScanEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_pool_size_bounds() {
        let size = default_pool_size();
        assert!((2..=32).contains(&size));
    }

    #[test]
    fn test_throttle_gate_transitions() {
        let gate = ThrottleGate::new(16);
        assert_eq!(gate.limit(), 16);
        gate.memory_pressure.store(true, Ordering::Relaxed);
        assert_eq!(gate.limit(), 8);
        gate.big_active.fetch_add(1, Ordering::Relaxed);
        assert_eq!(gate.limit(), 4);
        gate.big_active.fetch_sub(1, Ordering::Relaxed);
        gate.memory_pressure.store(false, Ordering::Relaxed);
        assert_eq!(gate.limit(), 16);
    }

    #[test]
    fn test_scan_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "tx.txt", "Paid with card 4111 1111 1111 1111 yesterday.\n");
        let engine = engine(EngineOptions::default());
        let (tx, rx) = event_channel();
        let outcome = engine
            .scan(&[file], tx, Arc::new(AtomicBool::new(false)))
            .unwrap();
        assert_eq!(outcome.summary.files_scanned, 1);
        assert_eq!(outcome.emitted.len(), 1);
        assert_eq!(outcome.emitted[0].detector_type, DetectorType::CreditCard);
        assert_eq!(outcome.emitted[0].severity, Severity::High);

        let events = drain(rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, ScanEvent::Finding(f) if f.line_number == 1)));
        assert!(events
            .iter()
            .any(|e| matches!(e, ScanEvent::EndOfScan { status: ScanStatus::Completed, .. })));
    }

    #[test]
    fn test_findings_within_file_follow_registration_order() {
        let dir = tempfile::tempdir().unwrap();
        // SSN registers after CREDIT_CARD; both hit on different lines.
        let file = write_file(
            &dir,
            "mix.txt",
            "card 4111 1111 1111 1111 ok\nemployee ssn 536-22-8745\n",
        );
        let engine = engine(EngineOptions::default());
        let (tx, rx) = event_channel();
        engine
            .scan(&[file], tx, Arc::new(AtomicBool::new(false)))
            .unwrap();
        let findings: Vec<DetectorType> = drain(rx)
            .into_iter()
            .filter_map(|e| match e {
                ScanEvent::Finding(f) => Some(f.detector_type),
                _ => None,
            })
            .collect();
        let card_pos = findings
            .iter()
            .position(|t| *t == DetectorType::CreditCard)
            .unwrap();
        let ssn_pos = findings.iter().position(|t| *t == DetectorType::Ssn).unwrap();
        assert!(card_pos < ssn_pos);
    }

    #[test]
    fn test_directory_scan_nonrecursive() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "a.txt", "dns 8.8.8.8\n");
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write_file(&dir, "sub/b.txt", "dns 9.9.9.9\n");

        let engine = engine(EngineOptions::default());
        let (tx, _rx) = event_channel();
        let outcome = engine
            .scan(
                &[dir.path().to_path_buf()],
                tx,
                Arc::new(AtomicBool::new(false)),
            )
            .unwrap();
        assert_eq!(outcome.summary.files_scanned, 1);

        let engine = engine_with_recursive();
        let (tx, _rx) = event_channel();
        let outcome = engine
            .scan(
                &[dir.path().to_path_buf()],
                tx,
                Arc::new(AtomicBool::new(false)),
            )
            .unwrap();
        assert_eq!(outcome.summary.files_scanned, 2);
    }

    fn engine_with_recursive() -> ScanEngine {
        engine(EngineOptions {
            recursive: true,
            ..EngineOptions::default()
        })
    }

    #[test]
    fn test_cancelled_scan_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "a.txt", "dns 8.8.8.8\n");
        let engine = engine(EngineOptions::default());
        let (tx, rx) = event_channel();
        let cancel = Arc::new(AtomicBool::new(true));
        engine.scan(&[file], tx, cancel).unwrap();
        assert!(drain(rx)
            .iter()
            .any(|e| matches!(e, ScanEvent::EndOfScan { status: ScanStatus::Cancelled, .. })));
    }

    #[test]
    fn test_missing_file_becomes_file_error() {
        let engine = engine(EngineOptions::default());
        let (tx, rx) = event_channel();
        let outcome = engine
            .scan(
                &[PathBuf::from("/definitely/not/here.txt")],
                tx,
                Arc::new(AtomicBool::new(false)),
            )
            .unwrap();
        assert_eq!(outcome.summary.files_errored, 1);
        assert!(drain(rx)
            .iter()
            .any(|e| matches!(e, ScanEvent::FileError(err) if err.kind == ErrorKind::FileAccess)));
    }

    #[test]
    fn test_band_filter() {
        let dir = tempfile::tempdir().unwrap();
        // Test-context SSN lands in LOW.
        let file = write_file(&dir, "doc.txt", "Example SSN: 123-45-6789 (for testing).\n");
        let engine = engine(EngineOptions {
            bands: vec![Severity::High],
            ..EngineOptions::default()
        });
        let (tx, _rx) = event_channel();
        let outcome = engine
            .scan(&[file], tx, Arc::new(AtomicBool::new(false)))
            .unwrap();
        assert!(outcome.emitted.is_empty());
    }
}
