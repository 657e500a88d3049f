//! Ferret-Scan CLI
//!
//! Thin wrapper over the scan engine: argument parsing, config and
//! profile resolution, formatter selection, and the process exit-code
//! contract (0 clean, 1 findings at or above the threshold, 2 scan
//! error).

use clap::Parser;
use ferret_scan::config::FerretConfig;
use ferret_scan::detect::DetectorType;
use ferret_scan::findings::{ScanStatus, Severity};
use ferret_scan::limits::Limits;
use ferret_scan::report::formatter_for;
use ferret_scan::schedule::{event_channel, EngineOptions, ScanEngine};
use ferret_scan::suppress::SuppressionStore;
use ferret_scan::{FerretError, FerretResult};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(
    name = "ferret-scan",
    author,
    version,
    about = "Scan files for sensitive data: credit cards, secrets, SSNs, PII and metadata leaks"
)]
struct Cli {
    /// File, directory, or glob to scan
    #[arg(long, short = 'f')]
    file: Vec<PathBuf>,

    /// Walk directories recursively
    #[arg(long)]
    recursive: bool,

    /// YAML config file (default search: ./config.yaml, ./ferret.yaml, ~/.ferret-scan/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Named profile from the config file
    #[arg(long)]
    profile: Option<String>,

    /// Comma-separated detector types, or `all`
    #[arg(long)]
    checks: Option<String>,

    /// Comma-separated confidence bands (high, medium, low), or `all`
    #[arg(long)]
    confidence: Option<String>,

    /// Output format
    #[arg(long)]
    format: Option<String>,

    /// Write output to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Include match text in output (otherwise rendered as [HIDDEN])
    #[arg(long)]
    show_match: bool,

    /// Include suppressed findings in output
    #[arg(long)]
    show_suppressed: bool,

    /// Append disabled suppression rules for new findings
    #[arg(long)]
    generate_suppressions: bool,

    /// Override the suppression rules file location
    #[arg(long)]
    suppression_file: Option<PathBuf>,

    /// Disable text extraction (metadata extractors remain active)
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    enable_preprocessors: bool,

    /// Emit extracted text and skip detection
    #[arg(long, short = 'p')]
    preprocess_only: bool,

    /// Enable redaction plumbing (position maps + audit log)
    #[arg(long)]
    enable_redaction: bool,

    /// Directory for redacted output (consumed by the redaction writer)
    #[arg(long)]
    redaction_output_dir: Option<PathBuf>,

    /// Redaction strategy name (consumed by the redaction writer)
    #[arg(long)]
    redaction_strategy: Option<String>,

    /// Append-only JSON-lines audit log for redacted spans
    #[arg(long)]
    redaction_audit_log: Option<PathBuf>,

    #[arg(long)]
    quiet: bool,

    #[arg(long)]
    no_color: bool,

    #[arg(long)]
    verbose: bool,

    #[arg(long)]
    debug: bool,
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ferret-scan: {}", e);
            if let Some(suggestion) = e.suggestion() {
                eprintln!("  hint: {}", suggestion);
            }
            2
        }
    };
    std::process::exit(code);
}

fn run() -> FerretResult<i32> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FerretConfig::load(path)?,
        None => FerretConfig::discover()?,
    };
    if let Some(profile) = &cli.profile {
        config.apply_profile(profile)?;
    }
    config.apply_env();

    // CLI flags win over config.
    let defaults = &mut config.defaults;
    if cli.recursive {
        defaults.recursive = true;
    }
    if cli.show_match {
        defaults.show_match = true;
    }
    if cli.show_suppressed {
        defaults.show_suppressed = true;
    }
    if cli.preprocess_only {
        defaults.preprocess_only = true;
    }
    if !cli.enable_preprocessors {
        defaults.enable_preprocessors = false;
    }
    if cli.quiet {
        defaults.quiet = true;
    }
    if cli.no_color {
        defaults.no_color = true;
    }
    if cli.verbose {
        defaults.verbose = true;
    }
    if cli.debug {
        defaults.debug = true;
    }
    if let Some(checks) = &cli.checks {
        defaults.checks = checks.clone();
    }
    if let Some(confidence) = &cli.confidence {
        defaults.confidence = confidence.clone();
    }
    if let Some(format) = &cli.format {
        defaults.format = format.clone();
    }

    init_tracing(&config);

    if cli.file.is_empty() {
        return Err(FerretError::config_with_suggestion(
            "no input given",
            "pass --file <path|glob>",
        ));
    }

    let checks = parse_checks(&config.defaults.checks)?;
    let bands = parse_bands(&config.defaults.confidence)?;

    let suppression_path = cli
        .suppression_file
        .clone()
        .unwrap_or_else(|| config.suppression_file());
    let store = Arc::new(SuppressionStore::load(&suppression_path)?);
    debug!(
        rules = store.len(),
        file = %suppression_path.display(),
        "suppression store loaded"
    );

    if cli.enable_redaction {
        debug!(
            output_dir = ?cli.redaction_output_dir,
            strategy = cli.redaction_strategy.as_deref().unwrap_or("mask"),
            "redaction plumbing enabled"
        );
    }

    let options = EngineOptions {
        checks,
        bands,
        show_suppressed: config.defaults.show_suppressed || config.suppressions.show_suppressed,
        enable_preprocessors: config.defaults.enable_preprocessors,
        preprocess_only: config.defaults.preprocess_only,
        recursive: config.defaults.recursive,
        workers: None,
        redaction_audit_log: if cli.enable_redaction {
            cli.redaction_audit_log.clone()
        } else {
            None
        },
    };

    let writer: Box<dyn Write + Send> = match &cli.output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout()),
    };
    let mut formatter = formatter_for(
        &config.defaults.format,
        writer,
        config.defaults.show_match,
        config.defaults.quiet,
        config.defaults.verbose,
    )?;

    let engine = ScanEngine::new(
        &config.validators,
        Arc::clone(&store),
        options,
        Limits::from_env(),
    );

    let (tx, rx) = event_channel();
    let formatter_thread = std::thread::spawn(move || -> FerretResult<()> {
        for event in rx {
            formatter.handle(&event)?;
        }
        Ok(())
    });

    let cancel = Arc::new(AtomicBool::new(false));
    let outcome = engine.scan(&cli.file, tx, cancel)?;
    drop(engine);

    if let Err(e) = formatter_thread
        .join()
        .unwrap_or_else(|_| Err(FerretError::scheduler("formatter thread panicked")))
    {
        warn!("formatter error: {}", e);
    }

    let generate = cli.generate_suppressions || config.suppressions.generate_on_scan;
    if generate {
        let mut store = Arc::try_unwrap(store)
            .map_err(|_| FerretError::scheduler("suppression store still shared after scan"))?;
        let appended = store.generate_and_persist(&outcome.emitted)?;
        debug!(appended, "suppression rules generated");
    }

    // Exit-code contract: scan errors dominate, then the HIGH threshold.
    if outcome.status == ScanStatus::Failed
        || outcome.summary.files_errored > outcome.summary.files_scanned
    {
        return Ok(2);
    }
    if outcome.summary.has_findings_at_or_above(Severity::High) {
        return Ok(1);
    }
    Ok(0)
}

fn init_tracing(config: &FerretConfig) {
    let filter = if config.defaults.debug {
        "debug"
    } else if config.defaults.verbose {
        "info"
    } else if config.defaults.quiet {
        "error"
    } else {
        "warn"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_ansi(!config.defaults.no_color)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_checks(input: &str) -> FerretResult<Vec<DetectorType>> {
    if input.trim().eq_ignore_ascii_case("all") {
        return Ok(DetectorType::all().to_vec());
    }
    let mut checks = Vec::new();
    for token in input.split(',') {
        let detector = DetectorType::parse(token).ok_or_else(|| {
            FerretError::config_with_suggestion(
                format!("unknown check '{}'", token.trim()),
                "valid checks: CREDIT_CARD, EMAIL, IP_ADDRESS, METADATA, PASSPORT, PERSON_NAME, PHONE, SECRETS, SOCIAL_MEDIA, SSN, INTELLECTUAL_PROPERTY",
            )
        })?;
        checks.push(detector);
    }
    Ok(checks)
}

fn parse_bands(input: &str) -> FerretResult<Vec<Severity>> {
    if input.trim().eq_ignore_ascii_case("all") {
        return Ok(vec![Severity::High, Severity::Medium, Severity::Low]);
    }
    let mut bands = Vec::new();
    for token in input.split(',') {
        let band = Severity::parse(token).ok_or_else(|| {
            FerretError::config_with_suggestion(
                format!("unknown confidence band '{}'", token.trim()),
                "valid bands: high, medium, low, all",
            )
        })?;
        bands.push(band);
    }
    Ok(bands)
}
