//! CLI contract tests: exit codes, hidden match text, output formats.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path
}

fn ferret() -> Command {
    let mut cmd = Command::cargo_bin("ferret-scan").unwrap();
    // Keep user-level config out of the tests.
    cmd.env("FERRET_CONFIG_DIR", "/nonexistent-ferret-config");
    cmd.env_remove("PRE_COMMIT");
    cmd.env_remove("_PRE_COMMIT_RUNNING");
    cmd.env_remove("PRE_COMMIT_HOME");
    cmd.env_remove("MAX_FILE_SIZE");
    cmd
}

#[test]
fn high_finding_exits_one_and_hides_match() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "tx.txt", "Paid with card 4111 1111 1111 1111 yesterday.\n");

    ferret()
        .arg("--file")
        .arg(&file)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("CREDIT_CARD"))
        .stdout(predicate::str::contains("[HIDDEN]"))
        .stdout(predicate::str::contains("4111 1111").not());
}

#[test]
fn show_match_reveals_the_text() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "tx.txt", "Paid with card 4111 1111 1111 1111 yesterday.\n");

    ferret()
        .arg("--file")
        .arg(&file)
        .arg("--show-match")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("4111 1111 1111 1111"));
}

#[test]
fn low_findings_exit_zero() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "doc.txt", "Example SSN: 123-45-6789 (for testing).\n");

    ferret().arg("--file").arg(&file).assert().code(0);
}

#[test]
fn missing_input_exits_two() {
    ferret()
        .arg("--file")
        .arg("/definitely/not/a/real/path.txt")
        .assert()
        .code(2);
}

#[test]
fn json_format_is_a_valid_document() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "hosts.txt", "dns 8.8.8.8\n");

    let output = ferret()
        .arg("--file")
        .arg(&file)
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["findings"][0]["detector_type"], "IP_ADDRESS");
    assert_eq!(parsed["findings"][0]["match_text"], "[HIDDEN]");
    assert_eq!(
        parsed["findings"][0]["fingerprint"].as_str().unwrap().len(),
        64
    );
}

#[test]
fn checks_filter_limits_detectors() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        &dir,
        "mixed.txt",
        "dns 8.8.8.8\ncard 4111 1111 1111 1111 here\n",
    );

    ferret()
        .arg("--file")
        .arg(&file)
        .arg("--checks")
        .arg("IP_ADDRESS")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("IP_ADDRESS"))
        .stdout(predicate::str::contains("CREDIT_CARD").not());
}

#[test]
fn generate_suppressions_writes_rule_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "tx.txt", "Paid with card 4111 1111 1111 1111 yesterday.\n");
    let rules = dir.path().join("suppressions.yaml");

    ferret()
        .arg("--file")
        .arg(&file)
        .arg("--generate-suppressions")
        .arg("--suppression-file")
        .arg(&rules)
        .assert()
        .code(1);

    let text = std::fs::read_to_string(&rules).unwrap();
    assert!(text.contains("version: '1.0'") || text.contains("version: \"1.0\""));
    assert!(text.contains("SUP-00000001"));
    assert!(text.contains("enabled: false"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&rules).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn unknown_format_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "a.txt", "nothing here\n");

    ferret()
        .arg("--file")
        .arg(&file)
        .arg("--format")
        .arg("sarif-ng")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown output format"));
}
