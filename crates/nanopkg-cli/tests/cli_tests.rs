//! CLI integration tests for nanopkg (spec §6, §10).
//!
//! These exercise the compiled binary's argument parsing, help output and
//! error handling directly, independent of the `tests/scenario_*.rs`
//! end-to-end transaction scenarios at the workspace root.

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

/// Get the `nanopkg` binary command.
fn nanopkg() -> Command {
    Command::new(cargo_bin!("nanopkg"))
}

// ========== Help and Version Tests ==========

#[test]
fn test_help_output() {
    nanopkg()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Embedded package manager transaction engine"))
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("upgrade"))
        .stdout(predicate::str::contains("remove"));
}

#[test]
fn test_version_output() {
    nanopkg()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nanopkg"));
}

#[test]
fn test_install_help() {
    nanopkg()
        .args(["install", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pkgs"));
}

#[test]
fn test_upgrade_help_has_dist_upgrade_alias() {
    nanopkg()
        .args(["upgrade", "--help"])
        .assert()
        .success();

    // `dist-upgrade` is an alias of `upgrade` (spec §6).
    nanopkg().args(["dist-upgrade", "--help"]).assert().success();
}

#[test]
fn test_list_installed_help() {
    nanopkg().args(["list-installed", "--help"]).assert().success();
}

// ========== Error Handling Tests ==========

#[test]
fn test_invalid_command() {
    nanopkg()
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_empty_args() {
    nanopkg().assert().failure();
}

#[test]
fn test_missing_config_fails_closed() {
    let temp = TempDir::new().expect("create temp dir");
    let missing = temp.path().join("does-not-exist.toml");

    nanopkg()
        .arg("--conf")
        .arg(&missing)
        .arg("list")
        .assert()
        .failure();
}

// ========== compare-versions (no config required) ==========

#[test]
fn test_compare_versions_true() {
    nanopkg()
        .args(["compare-versions", "2.0", ">>", "1.0"])
        .assert()
        .success();
}

#[test]
fn test_compare_versions_false() {
    nanopkg()
        .args(["compare-versions", "1.0", ">>", "2.0"])
        .assert()
        .failure();
}

#[test]
fn test_compare_versions_rejects_unknown_operator() {
    nanopkg()
        .args(["compare-versions", "1.0", "~~", "2.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown comparison operator"));
}

// ========== Global flags ==========

#[test]
fn test_multiple_verbose_flags() {
    nanopkg().args(["-vvv", "--help"]).assert().success();
}

#[test]
fn test_quiet_flag() {
    nanopkg().args(["--quiet", "--help"]).assert().success();
}

#[test]
fn test_batch_flag_accepted() {
    nanopkg().args(["--batch", "--help"]).assert().success();
}

// ========== Concurrent Execution Safety ==========

#[test]
fn test_concurrent_help_calls() {
    use std::thread;

    let handles: Vec<_> = (0..4)
        .map(|_| thread::spawn(|| nanopkg().arg("--help").assert().success()))
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked");
    }
}
