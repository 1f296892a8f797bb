//! End-to-end CLI tests for the feed-sdk binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

use std::io::Write;

use assert_cmd::Command;
use flate2::Compression;
use flate2::write::GzEncoder;
use predicates::prelude::*;
use tempfile::TempDir;

fn feed_sdk() -> Command {
    let mut cmd = Command::cargo_bin("feed-sdk").unwrap();
    cmd.env_remove("FEED_SDK_TOKEN").env_remove("RUST_LOG");
    cmd
}

fn write_feed(dir: &std::path::Path) {
    let path = dir.join("item_daily_1_20190127_EBAY_US.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(path).unwrap(), Compression::fast());
    writeln!(encoder, "ItemId\tPriceValue").unwrap();
    writeln!(encoder, "v1|1|0\t5").unwrap();
    writeln!(encoder, "v1|2|0\t15").unwrap();
    encoder.finish().unwrap();
}

#[test]
fn test_binary_help_displays_usage() {
    feed_sdk()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Download item feed files"));
}

#[test]
fn test_binary_requires_category() {
    feed_sdk()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--category"));
}

#[test]
fn test_binary_rejects_unknown_scope() {
    feed_sdk()
        .args(["-c", "1", "--scope", "WEEKLY"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown feed scope"));
}

#[test]
fn test_download_without_token_fails() {
    let temp_dir = TempDir::new().unwrap();
    feed_sdk()
        .args(["-c", "1", "-d", "20190127", "-l"])
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No token has been provided"));
}

#[test]
fn test_filter_only_writes_filtered_file() {
    let temp_dir = TempDir::new().unwrap();
    write_feed(temp_dir.path());

    feed_sdk()
        .args(["-q", "-c", "1", "-d", "20190127", "--filter-only", "--price-upper", "10", "-l"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "item_daily_1_20190127_EBAY_US-filtered-",
        ));
}

#[test]
fn test_filter_only_without_filters_fails() {
    let temp_dir = TempDir::new().unwrap();
    write_feed(temp_dir.path());

    feed_sdk()
        .args(["-q", "-c", "1", "-d", "20190127", "--filter-only", "-l"])
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No filters have been specified"));
}

#[test]
fn test_missing_config_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    feed_sdk()
        .arg("--config")
        .arg(temp_dir.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist or is empty"));
}
