#![allow(deprecated)]

//! Binary-level tests for the `feedrelay` command line.

use assert_cmd::Command;
use chrono::{TimeZone, Utc};
use predicates::prelude::*;

use feedrelay::watermark::{SqliteWatermarkStore, WatermarkStore};

mod common;

fn feedrelay(config: &std::path::Path, db: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("feedrelay").unwrap();
    cmd.env_remove("RUST_LOG")
        .env("FEEDRELAY_WATERMARK_DB", db)
        .arg("--config")
        .arg(config);
    cmd
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("feedrelay").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("watermark"));
}

#[test]
fn test_invalid_batch_size_is_rejected() {
    let (dir, config_path) = common::temp_config_file("destination:\n  batch_size: 0\n");
    feedrelay(&config_path, &dir.path().join("wm.db"))
        .args(["watermark", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("batch_size must be greater than 0"));
}

#[test]
fn test_run_without_feeds_fails() {
    let (dir, config_path) = common::temp_config_file("feeds:\n  urls: []\n");
    feedrelay(&config_path, &dir.path().join("wm.db"))
        .args(["run", "--once"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no feed urls configured"));
}

#[test]
fn test_watermark_list_empty_json() {
    let (dir, config_path) = common::temp_config_file("logging:\n  level: warn\n");
    feedrelay(&config_path, &dir.path().join("wm.db"))
        .args(["watermark", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_watermark_get_unknown_feed() {
    let (dir, config_path) = common::temp_config_file("logging:\n  level: warn\n");
    feedrelay(&config_path, &dir.path().join("wm.db"))
        .args(["watermark", "get", "https://unknown.example.com/rss"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(no watermark)"));
}

#[tokio::test]
async fn test_watermark_list_shows_stored_feeds() {
    let (dir, config_path) = common::temp_config_file("logging:\n  level: warn\n");
    let db = dir.path().join("wm.db");
    let store = SqliteWatermarkStore::new_with_path(db.clone()).unwrap();
    store
        .set(
            "https://news.example.com/rss",
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        )
        .await
        .unwrap();

    feedrelay(&config_path, &db)
        .args(["watermark", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://news.example.com/rss"))
        .stdout(predicate::str::contains("2024-03-01T12:00:00Z"));

    feedrelay(&config_path, &db)
        .args(["watermark", "get", "https://news.example.com/rss"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-03-01T12:00:00+00:00"));
}
