//! Integration tests for the confstack binary.
//!
//! Responsibilities:
//! - Validate `pages`, `get`, `patterns`, `encrypt`, and `decrypt`
//!   against a temporary search directory.
//! - Verify structured exit codes and help text.
//!
//! Invariants:
//! - All tests use the hermetic `confstack_cmd()` helper: dotenv disabled,
//!   ambient CONFSTACK_* variables removed.

use assert_cmd::Command;
use predicates::prelude::*;

fn confstack_cmd() -> Command {
    let mut cmd = Command::cargo_bin("confstack").unwrap();
    cmd.env("DOTENV_DISABLED", "1")
        .env_remove("CONFSTACK_DIR")
        .env_remove("CONFSTACK_PATH")
        .env_remove("CONFSTACK_CONFIG_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    confstack_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("pages")
            .and(predicate::str::contains("get"))
            .and(predicate::str::contains("patterns"))
            .and(predicate::str::contains("encrypt"))
            .and(predicate::str::contains("decrypt")),
    );
}

#[test]
fn test_pages_lists_discovered_files() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a.prc"), "window-title Demo\n").unwrap();
    std::fs::write(tmp.path().join("skip.txt"), "not a page\n").unwrap();

    confstack_cmd()
        .arg("--dir")
        .arg(tmp.path())
        .arg("pages")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("a.prc")
                .and(predicate::str::contains("implicit"))
                .and(predicate::str::contains("skip.txt").not()),
        );
}

#[test]
fn test_get_resolves_value() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a.prc"), "window-title Demo App\n").unwrap();

    confstack_cmd()
        .arg("--dir")
        .arg(tmp.path())
        .args(["get", "window-title"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo App"));
}

#[test]
fn test_get_missing_key_exit_code() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a.prc"), "present 1\n").unwrap();

    confstack_cmd()
        .arg("--dir")
        .arg(tmp.path())
        .args(["get", "absent"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("not declared"));
}

#[test]
fn test_get_all_json_output() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a.prc"), "quality high\n").unwrap();
    std::fs::write(tmp.path().join("b.prc"), "quality low\n").unwrap();

    let output = confstack_cmd()
        .arg("--dir")
        .arg(tmp.path())
        .args(["get", "quality", "--all", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let matches: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = matches.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["value"], "high");
    assert_eq!(rows[0]["origin"], "implicit");
}

#[test]
fn test_patterns_lists_families() {
    confstack_cmd()
        .arg("patterns")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("*.prc")
                .and(predicate::str::contains("*.pre"))
                .and(predicate::str::contains("executable")),
        );
}

#[test]
fn test_unknown_output_format_exit_code() {
    confstack_cmd()
        .args(["--output", "yaml", "patterns"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown output format"));
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let tmp = tempfile::tempdir().unwrap();
    let plain = tmp.path().join("settings.prc");
    std::fs::write(&plain, "secret-token abc123\n").unwrap();

    confstack_cmd()
        .args(["--password", "s3cret", "encrypt"])
        .arg(&plain)
        .assert()
        .success();

    let encrypted = tmp.path().join("settings.pre");
    assert!(encrypted.exists());
    let container = std::fs::read(&encrypted).unwrap();
    assert_eq!(&container[..4], b"CSPG");

    let restored = tmp.path().join("restored.prc");
    confstack_cmd()
        .args(["--password", "s3cret", "decrypt"])
        .arg(&encrypted)
        .args(["-f"])
        .arg(&restored)
        .assert()
        .success();
    assert_eq!(
        std::fs::read_to_string(&restored).unwrap(),
        "secret-token abc123\n"
    );
}

#[test]
fn test_encrypted_page_resolves_with_password() {
    let tmp = tempfile::tempdir().unwrap();
    let plain = tmp.path().join("settings.prc");
    std::fs::write(&plain, "secret-token abc123\n").unwrap();

    confstack_cmd()
        .args(["--password", "s3cret", "encrypt"])
        .arg(&plain)
        .assert()
        .success();
    // Leave only the encrypted page behind.
    std::fs::remove_file(&plain).unwrap();

    confstack_cmd()
        .arg("--dir")
        .arg(tmp.path())
        .args(["--password", "s3cret", "get", "secret-token"])
        .assert()
        .success()
        .stdout(predicate::str::contains("abc123"));
}
