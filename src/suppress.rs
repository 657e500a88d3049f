//! Suppression engine
//!
//! Findings are identified by a SHA-256 fingerprint over a fixed tuple of
//! classifying fields. The byte-level construction is a compatibility
//! contract with existing suppression files and must not drift: two
//! 16-hex-char SHA-256 prefixes for context and match text, then one
//! digest over the `|`-joined tuple.

use crate::error::{FerretError, FerretResult};
use crate::findings::Finding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// First 16 hex chars of SHA-256 over the concatenated contexts.
pub fn context_hash(before: &str, after: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(before.as_bytes());
    hasher.update(after.as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

/// First 16 hex chars of SHA-256 over the match text.
pub fn match_hash(match_text: &str) -> String {
    sha256_hex(match_text.as_bytes())[..16].to_string()
}

/// The normative fingerprint: SHA-256 over
/// `type|confidence(2dp)|trim(full_line)|basename|line|ctx16|match16`.
#[allow(clippy::too_many_arguments)]
pub fn fingerprint(
    detector_type: &str,
    confidence: f64,
    full_line: &str,
    filename: &str,
    line_number: usize,
    before_context: &str,
    after_context: &str,
    match_text: &str,
) -> String {
    let basename = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let joined = format!(
        "{}|{:.2}|{}|{}|{}|{}|{}",
        detector_type,
        confidence,
        full_line.trim(),
        basename,
        line_number,
        context_hash(before_context, after_context),
        match_hash(match_text),
    );
    sha256_hex(joined.as_bytes())
}

/// One persisted suppression rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionRule {
    /// Monotonic identifier, `SUP-NNNNNNNN`.
    pub id: String,
    /// 64 hex chars matching a finding fingerprint.
    pub hash: String,
    pub reason: String,
    pub enabled: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Redundant classifying fields for human review.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl SuppressionRule {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }

    fn review_metadata(finding: &Finding) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "detector_type".to_string(),
            finding.detector_type.as_str().to_string(),
        );
        metadata.insert("filename".to_string(), finding.filename.clone());
        metadata.insert("line_number".to_string(), finding.line_number.to_string());
        metadata.insert(
            "confidence".to_string(),
            format!("{:.2}", finding.confidence),
        );
        metadata.insert(
            "context_hash".to_string(),
            context_hash(&finding.before_context, &finding.after_context),
        );
        metadata.insert(
            "match_text_hash".to_string(),
            match_hash(&finding.match_text),
        );
        metadata
    }
}

/// On-disk document shape.
#[derive(Debug, Serialize, Deserialize)]
struct SuppressionDocument {
    version: String,
    #[serde(default)]
    rules: Vec<SuppressionRule>,
}

/// The rule set for one scan. Read-shared; `last_seen_at` refreshes are
/// buffered under a mutex and merged at persist time.
#[derive(Debug)]
pub struct SuppressionStore {
    path: PathBuf,
    rules: Vec<SuppressionRule>,
    touched: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SuppressionStore {
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            rules: Vec::new(),
            touched: Mutex::new(HashMap::new()),
        }
    }

    /// Load rules from disk; a missing file is an empty store.
    pub fn load(path: &Path) -> FerretResult<Self> {
        if !path.exists() {
            return Ok(Self::empty(path));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| FerretError::suppression(format!("cannot read {}: {}", path.display(), e)))?;
        let doc: SuppressionDocument = serde_yaml::from_str(&content)
            .map_err(|e| FerretError::suppression(format!("cannot parse {}: {}", path.display(), e)))?;
        Ok(Self {
            path: path.to_path_buf(),
            rules: doc.rules,
            touched: Mutex::new(HashMap::new()),
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[SuppressionRule] {
        &self.rules
    }

    /// O(n) scan over enabled, unexpired rules. On a hit the rule's
    /// `last_seen_at` refresh is buffered for the end-of-scan merge.
    pub fn is_suppressed(&self, finding: &Finding) -> bool {
        let now = Utc::now();
        let hit = self
            .rules
            .iter()
            .any(|rule| rule.is_active(now) && rule.hash == finding.fingerprint);
        if hit {
            self.touched
                .lock()
                .expect("suppression touch lock poisoned")
                .insert(finding.fingerprint.clone(), now);
        }
        hit
    }

    fn next_id(&self) -> String {
        let max = self
            .rules
            .iter()
            .filter_map(|rule| rule.id.strip_prefix("SUP-"))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        format!("SUP-{:08}", max + 1)
    }

    /// Rule generation: append a disabled rule for every finding with no
    /// matching rule, refresh `last_seen_at` on the rest, persist once.
    pub fn generate_and_persist(&mut self, findings: &[Finding]) -> FerretResult<usize> {
        let now = Utc::now();
        let mut appended = 0;

        for finding in findings {
            if let Some(rule) = self
                .rules
                .iter_mut()
                .find(|rule| rule.hash == finding.fingerprint)
            {
                rule.last_seen_at = Some(now);
                continue;
            }
            let rule = SuppressionRule {
                id: self.next_id(),
                hash: finding.fingerprint.clone(),
                reason: "auto-generated; review and enable".to_string(),
                enabled: false,
                created_by: whoami(),
                created_at: now,
                expires_at: None,
                last_seen_at: Some(now),
                metadata: SuppressionRule::review_metadata(finding),
            };
            self.rules.push(rule);
            appended += 1;
        }

        self.merge_touched();
        self.persist()?;
        Ok(appended)
    }

    /// Fold buffered `last_seen_at` refreshes into the rule list.
    pub fn merge_touched(&mut self) {
        let touched = std::mem::take(
            &mut *self
                .touched
                .lock()
                .expect("suppression touch lock poisoned"),
        );
        for rule in &mut self.rules {
            if let Some(seen) = touched.get(&rule.hash) {
                rule.last_seen_at = Some(*seen);
            }
        }
    }

    /// Write the store with mode 0600.
    pub fn persist(&self) -> FerretResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let doc = SuppressionDocument {
            version: "1.0".to_string(),
            rules: self.rules.clone(),
        };
        let content = serde_yaml::to_string(&doc)
            .map_err(|e| FerretError::suppression(format!("serialize failed: {}", e)))?;
        std::fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "ferret-scan".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{CandidateMatch, DetectorType, MatchSource};

    fn finding(confidence: f64, line: usize) -> Finding {
        let candidate = CandidateMatch {
            detector_type: DetectorType::CreditCard,
            match_text: "4111 1111 1111 1111".to_string(),
            line_number: line,
            column_start: 16,
            column_end: 35,
            full_line: "Paid with card 4111 1111 1111 1111 yesterday.".to_string(),
            before_context: "Paid with card ".to_string(),
            after_context: " yesterday.".to_string(),
            confidence,
            source: MatchSource::Body,
            detector_meta: Vec::new(),
        };
        Finding::from_candidate(candidate, "tx.txt", "tx.txt").unwrap()
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = finding(95.0, 1);
        let b = finding(95.0, 1);
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn test_fingerprint_changes_with_inputs() {
        assert_ne!(finding(95.0, 1).fingerprint, finding(95.0, 2).fingerprint);
        assert_ne!(finding(95.0, 1).fingerprint, finding(94.0, 1).fingerprint);
    }

    #[test]
    fn test_fingerprint_uses_basename_only() {
        let fp1 = fingerprint("SSN", 80.0, "line", "/a/b/doc.txt", 3, "x", "y", "123-45-6789");
        let fp2 = fingerprint("SSN", 80.0, "line", "/other/doc.txt", 3, "x", "y", "123-45-6789");
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn test_confidence_formatting_two_decimals() {
        // 85 and 85.004 format to the same two-decimal text.
        let fp1 = fingerprint("SSN", 85.0, "l", "f", 1, "b", "a", "m");
        let fp2 = fingerprint("SSN", 85.004, "l", "f", 1, "b", "a", "m");
        assert_eq!(fp1, fp2);
        let fp3 = fingerprint("SSN", 85.01, "l", "f", 1, "b", "a", "m");
        assert_ne!(fp1, fp3);
    }

    #[test]
    fn test_store_roundtrip_and_suppression() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suppressions.yaml");
        let target = finding(95.0, 1);

        let mut store = SuppressionStore::empty(&path);
        store.generate_and_persist(&[target.clone()]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.rules()[0].id, "SUP-00000001");
        assert!(!store.rules()[0].enabled);
        assert_eq!(store.rules()[0].hash, target.fingerprint);

        // Disabled rules do not suppress.
        let reloaded = SuppressionStore::load(&path).unwrap();
        assert!(!reloaded.is_suppressed(&target));

        // Enabled rules do.
        let mut enabled = SuppressionStore::load(&path).unwrap();
        enabled.rules[0].enabled = true;
        assert!(enabled.is_suppressed(&target));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suppressions.yaml");
        let target = finding(95.0, 1);

        let mut store = SuppressionStore::empty(&path);
        let first = store.generate_and_persist(&[target.clone()]).unwrap();
        assert_eq!(first, 1);
        let first_seen = store.rules()[0].last_seen_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        let mut store = SuppressionStore::load(&path).unwrap();
        let second = store.generate_and_persist(&[target.clone()]).unwrap();
        assert_eq!(second, 0);
        assert_eq!(store.len(), 1);
        assert_eq!(store.rules()[0].id, "SUP-00000001");
        assert_ne!(store.rules()[0].last_seen_at, first_seen);
    }

    #[test]
    fn test_expired_rules_inactive() {
        let rule = SuppressionRule {
            id: "SUP-00000001".to_string(),
            hash: "00".repeat(32),
            reason: "old".to_string(),
            enabled: true,
            created_by: "tester".to_string(),
            created_at: Utc::now(),
            expires_at: Some(Utc::now() - chrono::Duration::days(1)),
            last_seen_at: None,
            metadata: BTreeMap::new(),
        };
        assert!(!rule.is_active(Utc::now()));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_mode_0600() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suppressions.yaml");
        let mut store = SuppressionStore::empty(&path);
        store.generate_and_persist(&[finding(95.0, 1)]).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_review_metadata_fields() {
        let target = finding(95.0, 1);
        let metadata = SuppressionRule::review_metadata(&target);
        assert_eq!(metadata.get("detector_type").unwrap(), "CREDIT_CARD");
        assert_eq!(metadata.get("confidence").unwrap(), "95.00");
        assert_eq!(metadata.get("context_hash").unwrap().len(), 16);
        assert_eq!(metadata.get("match_text_hash").unwrap().len(), 16);
    }
}
