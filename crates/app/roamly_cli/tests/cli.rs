#![allow(deprecated)] // cargo_bin is deprecated but still functional

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

/// Run from an empty directory so no `.env` file is picked up.
fn roamly(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("roamly").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("DATABASE_URL")
        .env_remove("ROAMLY_PLAYLIST_PRIVACY")
        .env_remove("ROAMLY_TOKEN_SAFETY_MARGIN_SECS");
    cmd
}

#[test]
fn version_prints_name_and_version() {
    let dir = TempDir::new().unwrap();
    roamly(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(contains("roamly "))
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    roamly(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("sync"))
        .stdout(contains("serve"))
        .stdout(contains("migrate"))
        .stdout(contains("credentials"));
}

#[test]
fn sync_country_requires_a_country() {
    let dir = TempDir::new().unwrap();
    roamly(&dir)
        .args(["sync", "country"])
        .assert()
        .failure()
        .stderr(contains("<COUNTRY>"));
}

#[test]
fn invalid_configuration_exits_with_error() {
    let dir = TempDir::new().unwrap();
    roamly(&dir)
        .args(["sync", "all"])
        .env("ROAMLY_PLAYLIST_PRIVACY", "secret")
        .assert()
        .code(1)
        .stderr(contains("ROAMLY_PLAYLIST_PRIVACY"));
}
