use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_help_lists_flags() {
    Command::cargo_bin("trashbin-purge")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--force"))
        .stdout(predicate::str::contains("--progress"))
        .stdout(predicate::str::contains("--depth"));
}

#[test]
fn test_requires_at_least_one_file() {
    Command::cargo_bin("trashbin-purge")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("<FILES>"));
}

#[test]
fn test_progress_conflicts_with_verbose() {
    Command::cargo_bin("trashbin-purge")
        .unwrap()
        .args(["-C", "-v", "unit.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_every_unit_is_processed_even_after_failures() {
    let dir = tempdir().unwrap();
    let no_patterns = dir.path().join("no-patterns.toml");
    fs::write(
        &no_patterns,
        "[nextcloud]\nurl = \"https://cloud.example.com\"\nusername = \"a\"\npassword = \"b\"\n",
    )
    .unwrap();
    let missing = dir.path().join("missing.toml");

    Command::cargo_bin("trashbin-purge")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg(&no_patterns)
        .arg(&missing)
        .assert()
        .failure()
        .stdout(predicate::str::contains("no patterns specified"))
        .stdout(predicate::str::contains("missing.toml"))
        .stderr(predicate::str::contains("2 of 2 configuration units failed"));
}

#[test]
fn test_unreachable_server_is_reported_as_listing_failure() {
    let dir = tempdir().unwrap();
    let unit = dir.path().join("offline.toml");
    fs::write(
        &unit,
        r#"
[nextcloud]
url = "http://127.0.0.1:9"
username = "alice"
password = "s3cret"
timeout_secs = 2

[[pattern]]
pattern = "tempfile-"
"#,
    )
    .unwrap();

    Command::cargo_bin("trashbin-purge")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg("--dry-run")
        .arg(&unit)
        .assert()
        .failure()
        .stdout(predicate::str::contains("failed to list trashbin"));
}
