use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const NOW: &str = "2024-03-15T12:00";

const BACKUPS: [&str; 5] = [
    "backup-20240315-0000.tar",
    "readme.txt",
    "backup-20240313-0000.tar",
    "backup-20240301-0000.tar.part",
    "backup-20240314-0000.tar",
];

/// Runs the binary in an empty directory so no stray aging.toml is picked up.
fn aging(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("aging").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("AGING__RETENTION__WEEK_ANCHOR_DAY")
        .env_remove("AGING__RETENTION__TIMEZONE");
    cmd
}

#[test]
fn test_no_mode_prints_short_usage() {
    let dir = TempDir::new().unwrap();
    aging(&dir)
        .arg("backup-20240315-0000.tar")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Usage: aging"));
}

#[test]
fn test_help_lists_policy_syntax() {
    let dir = TempDir::new().unwrap();
    aging(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--keep <RETENTION>"))
        .stdout(predicate::str::contains("no|<number>{y|m|w|d|h}|latest|all"))
        .stdout(predicate::str::contains("keywords `none`, `latest`, `all`"));
}

#[test]
fn test_keep_lists_sorted_kept_files() {
    let dir = TempDir::new().unwrap();
    aging(&dir)
        .args(["--now", NOW, "--keep", "2d latest"])
        .args(BACKUPS)
        .assert()
        .success()
        .stdout(
            "backup-20240313-0000.tar\nbackup-20240314-0000.tar\nbackup-20240315-0000.tar\n",
        );
}

#[test]
fn test_discard_lists_only_discarded_files() {
    let dir = TempDir::new().unwrap();
    // the current year slot keeps the earliest backup of 2024
    aging(&dir)
        .args(["--now", NOW, "-d", "1d"])
        .args(BACKUPS)
        .arg("backup-20231231-0000.tar")
        .assert()
        .success()
        .stdout("backup-20231231-0000.tar\n");

    // `no` discards every recognized backup but never unknown names
    aging(&dir)
        .args(["--now", NOW, "-d", "no"])
        .args(BACKUPS)
        .assert()
        .success()
        .stdout(
            "backup-20240313-0000.tar\nbackup-20240314-0000.tar\nbackup-20240315-0000.tar\n",
        );
}

#[test]
fn test_none_keyword_keeps_nothing() {
    let dir = TempDir::new().unwrap();
    aging(&dir)
        .args(["--now", NOW, "-k", "none"])
        .args(BACKUPS)
        .assert()
        .success()
        .stdout("");

    aging(&dir)
        .args(["--now", NOW, "-d", "none"])
        .args(BACKUPS)
        .assert()
        .success()
        .stdout(
            "backup-20240313-0000.tar\nbackup-20240314-0000.tar\nbackup-20240315-0000.tar\n",
        );
}

#[test]
fn test_policy_words_match_by_prefix() {
    let dir = TempDir::new().unwrap();
    aging(&dir)
        .args(["--now", NOW, "-p", "2days latestfoo"])
        .arg("backup-20240315-0000.tar")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Retaining:      latest 2d\n"));
}

#[test]
fn test_print_shows_reasons() {
    let dir = TempDir::new().unwrap();
    let expected = "\
Retaining:      latest 1d
UNKNOWN         backup-20240301-0000.tar.part
first of YEAR   backup-20240313-0000.tar
first of DAY    backup-20240314-0000.tar
LATEST          backup-20240315-0000.tar
UNKNOWN         readme.txt
";
    aging(&dir)
        .args(["--now", NOW, "-p", "1d latest bogus"])
        .args(BACKUPS)
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn test_print_json() {
    let dir = TempDir::new().unwrap();
    let output = aging(&dir)
        .args(["--now", NOW, "-p", "2d", "--json"])
        .args(BACKUPS)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["policy"], "2d");
    assert_eq!(report["now"], "2024-03-15T12:00:00");
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 5);
    assert_eq!(files[1]["name"], "backup-20240313-0000.tar");
    assert_eq!(files[1]["classification"], "DAY");
    assert_eq!(files[3]["classification"], "LATEST");
    assert_eq!(files[4]["classification"], "UNKNOWN");
    assert!(files[4]["timestamp"].is_null());
}

#[test]
fn test_modes_run_in_order() {
    let dir = TempDir::new().unwrap();
    aging(&dir)
        .args(["--now", NOW, "-p", "all", "-k", "1d"])
        .args(["x-20240315", "x-20240310"])
        .assert()
        .success()
        .stdout(concat!(
            "x-20240310\nx-20240315\n",
            "Retaining:      all\n",
            "ALL             x-20240310\n",
            "ALL             x-20240315\n",
        ));
}

#[test]
fn test_week_anchor_from_config_file() {
    let dir = TempDir::new().unwrap();
    // 2024-03-15 is a Friday; with a Friday anchor the week starts today
    std::fs::write(
        dir.path().join("aging.toml"),
        "[retention]\nweek_anchor_day = 4\n",
    )
    .unwrap();

    aging(&dir)
        .args(["--now", NOW, "-p", "1w"])
        .args(["w-20240315-0100", "w-20240315-0200", "w-20240308-0100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("first of WEEK   w-20240308-0100"))
        .stdout(predicate::str::contains("first of WEEK   w-20240315-0100"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    aging(&dir)
        .args(["--now", NOW, "-k", "1d", "x-20240315"])
        .env("AGING__RETENTION__TIMEZONE", "Mars/Olympus")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid timezone 'Mars/Olympus'"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    aging(&dir)
        .args(["--config", "nope.toml", "--now", NOW, "-k", "1d", "x-20240315"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_unknown_flag_is_rejected() {
    let dir = TempDir::new().unwrap();
    aging(&dir)
        .args(["--frobnicate", "x"])
        .assert()
        .failure()
        .code(2);
}
