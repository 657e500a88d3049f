//! Configuration
//!
//! YAML config file with `defaults`, `validators`, `suppressions` and
//! named `profiles`. Precedence: profile overrides global, global
//! overrides built-in; environment variables land last.

use crate::error::{FerretError, FerretResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Scalar options shared by CLI and config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Comma-separated detector types or `all`.
    pub checks: String,
    /// Any combination of `high`, `medium`, `low`, or `all`.
    pub confidence: String,
    pub format: String,
    pub output: Option<PathBuf>,
    pub recursive: bool,
    pub show_match: bool,
    pub show_suppressed: bool,
    pub enable_preprocessors: bool,
    pub preprocess_only: bool,
    pub quiet: bool,
    pub no_color: bool,
    pub verbose: bool,
    pub debug: bool,
    /// Informational: set from `FERRET_CONTAINER_MODE`, never from file.
    #[serde(skip)]
    pub container_mode: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            checks: "all".to_string(),
            confidence: "all".to_string(),
            format: "text".to_string(),
            output: None,
            recursive: false,
            show_match: false,
            show_suppressed: false,
            enable_preprocessors: true,
            preprocess_only: false,
            quiet: false,
            no_color: false,
            verbose: false,
            debug: false,
            container_mode: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialMediaConfig {
    pub enabled: bool,
    /// Platform name → regex pattern, overriding the built-in table.
    pub platform_patterns: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntellectualPropertyConfig {
    pub enabled: bool,
    /// Regex patterns identifying internal hosts and URLs.
    pub internal_urls: Vec<String>,
}

/// Per-detector options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorsConfig {
    pub social_media: SocialMediaConfig,
    pub intellectual_property: IntellectualPropertyConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SuppressionsConfig {
    /// Suppression rules file; defaults to `<config dir>/suppressions.yaml`.
    pub file: Option<PathBuf>,
    pub generate_on_scan: bool,
    pub show_suppressed: bool,
}

/// A profile: partial defaults plus optional validator overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub checks: Option<String>,
    pub confidence: Option<String>,
    pub format: Option<String>,
    pub recursive: Option<bool>,
    pub show_match: Option<bool>,
    pub show_suppressed: Option<bool>,
    pub enable_preprocessors: Option<bool>,
    pub validators: Option<ValidatorsConfig>,
}

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FerretConfig {
    pub defaults: DefaultsConfig,
    pub validators: ValidatorsConfig,
    pub suppressions: SuppressionsConfig,
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl FerretConfig {
    /// Load from an explicit path, failing loudly on bad YAML.
    pub fn load(path: &Path) -> FerretResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FerretError::file_access(path, &e.to_string()))?;
        serde_yaml::from_str(&content).map_err(|e| {
            FerretError::config_with_suggestion(
                format!("failed to parse {}: {}", path.display(), e),
                "check the YAML structure against the documented config layout",
            )
        })
    }

    /// Search order: `./config.yaml`, `./ferret.yaml`, `<config dir>/config.yaml`.
    pub fn discover() -> FerretResult<Self> {
        let mut candidates = vec![
            PathBuf::from("./config.yaml"),
            PathBuf::from("./ferret.yaml"),
        ];
        candidates.push(config_dir().join("config.yaml"));

        for candidate in candidates {
            if candidate.is_file() {
                return Self::load(&candidate);
            }
        }
        Ok(Self::default())
    }

    /// Apply a named profile on top of the globals.
    pub fn apply_profile(&mut self, name: &str) -> FerretResult<()> {
        let profile = self.profiles.get(name).cloned().ok_or_else(|| {
            FerretError::config_with_suggestion(
                format!("profile '{}' not found", name),
                "list available profiles under `profiles:` in the config file",
            )
        })?;

        if let Some(checks) = profile.checks {
            self.defaults.checks = checks;
        }
        if let Some(confidence) = profile.confidence {
            self.defaults.confidence = confidence;
        }
        if let Some(format) = profile.format {
            self.defaults.format = format;
        }
        if let Some(recursive) = profile.recursive {
            self.defaults.recursive = recursive;
        }
        if let Some(show_match) = profile.show_match {
            self.defaults.show_match = show_match;
        }
        if let Some(show_suppressed) = profile.show_suppressed {
            self.defaults.show_suppressed = show_suppressed;
        }
        if let Some(enable_preprocessors) = profile.enable_preprocessors {
            self.defaults.enable_preprocessors = enable_preprocessors;
        }
        if let Some(validators) = profile.validators {
            self.validators = validators;
        }
        Ok(())
    }

    /// Environment overrides: debug flag and pre-commit auto-quiet.
    pub fn apply_env(&mut self) {
        if std::env::var("FERRET_DEBUG").map(|v| v == "1").unwrap_or(false) {
            self.defaults.debug = true;
        }
        if running_under_pre_commit() {
            self.defaults.quiet = true;
            self.defaults.no_color = true;
        }
        if std::env::var("FERRET_QUIET_MODE").is_ok() {
            self.defaults.quiet = true;
        }
        if std::env::var("FERRET_CONTAINER_MODE").is_ok() {
            self.defaults.container_mode = true;
        }
    }

    /// Resolved suppression file location.
    pub fn suppression_file(&self) -> PathBuf {
        self.suppressions
            .file
            .clone()
            .unwrap_or_else(|| config_dir().join("suppressions.yaml"))
    }
}

/// Base directory for user state: `FERRET_CONFIG_DIR` or `~/.ferret-scan`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FERRET_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".ferret-scan")
}

/// Any of the pre-commit markers forces quiet, colorless output.
pub fn running_under_pre_commit() -> bool {
    ["PRE_COMMIT", "_PRE_COMMIT_RUNNING", "PRE_COMMIT_HOME"]
        .iter()
        .any(|var| std::env::var(var).is_ok())
}
