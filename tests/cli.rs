//! Integration tests for the phototracks binary.
//!
//! Each test builds a throwaway photos/tracks layout in a temp dir and runs
//! the real executable against it.

#![allow(deprecated)] // cargo_bin deprecation, replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn phototracks() -> Command {
    let mut cmd = Command::cargo_bin("phototracks").expect("binary 'phototracks' should be built");
    cmd.env_remove("RUST_LOG").env_remove("PHOTOTRACKS_TIMEZONE");
    cmd
}

const HIKE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Afternoon hike</name>
    <trkseg>
      <trkpt lat="40.5" lon="-3.9"><time>2023-06-01T13:00:00Z</time></trkpt>
      <trkpt lat="40.55" lon="-3.85"><time>2023-06-01T13:55:00Z</time></trkpt>
      <trkpt lat="40.6" lon="-3.8"><time>2023-06-01T14:05:00Z</time></trkpt>
      <trkpt lat="40.7" lon="-3.7"><time>2023-06-01T15:00:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

fn layout(photos: &[&str]) -> TempDir {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("photos")).unwrap();
    fs::create_dir_all(root.path().join("tracks")).unwrap();
    fs::write(root.path().join("tracks/hike.gpx"), HIKE).unwrap();
    for name in photos {
        fs::write(root.path().join("photos").join(name), b"jpeg bytes").unwrap();
    }
    root
}

fn args(root: &Path) -> Vec<String> {
    vec![
        "--photos".to_string(),
        root.join("photos").display().to_string(),
        "--tracks".to_string(),
        root.join("tracks").display().to_string(),
        "--output".to_string(),
        root.join("out").display().to_string(),
    ]
}

// ─── Flags ───────────────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    phototracks()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: phototracks"))
        .stdout(predicate::str::contains("--photos"))
        .stdout(predicate::str::contains("--tracks"))
        .stdout(predicate::str::contains("--timezone"));
}

#[test]
fn version_flag() {
    phototracks()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_required_args_fail() {
    phototracks()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--photos"));
}

#[test]
fn unknown_timezone_is_rejected() {
    let root = layout(&["20230601_140000.jpg"]);
    phototracks()
        .args(args(root.path()))
        .args(["--timezone", "Mars/Olympus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown timezone"));
}

// ─── Runs ────────────────────────────────────────────────────────────────────

#[test]
fn places_photo_on_nearest_point() {
    let root = layout(&["20230601_140000.jpg", "20230601_230000.jpg"]);

    phototracks()
        .args(args(root.path()))
        .assert()
        .success()
        .stdout(predicate::str::contains("2 photos: 1 matched, 1 unassigned, 0 failed"))
        .stdout(predicate::str::contains("20230601_230000.jpg"));

    let written = fs::read_to_string(root.path().join("out/hike_with_imgs.gpx")).unwrap();
    assert!(written.contains(r#"<wpt lat="40.55" lon="-3.85">"#));
    assert!(written.contains("<name>20230601_140000</name>"));
}

#[test]
fn images_folder_alias_is_accepted() {
    let root = layout(&["20230601_140000.jpg"]);

    phototracks()
        .arg("--images-folder")
        .arg(root.path().join("photos"))
        .arg("--tracks-folder")
        .arg(root.path().join("tracks"))
        .arg("-o")
        .arg(root.path().join("out"))
        .assert()
        .success();

    assert!(root.path().join("out/hike_with_imgs.gpx").exists());
}

#[test]
fn timezone_flag_shifts_photos() {
    // 15:00 in Madrid (UTC+2 in June) is 13:00 UTC, the first track point
    let root = layout(&["20230601_150000.jpg"]);

    phototracks()
        .args(args(root.path()))
        .args(["--timezone", "Europe/Madrid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 matched"));

    let written = fs::read_to_string(root.path().join("out/hike_with_imgs.gpx")).unwrap();
    assert!(written.contains(r#"<wpt lat="40.5" lon="-3.9">"#));
}

#[test]
fn dry_run_writes_no_files() {
    let root = layout(&["20230601_140000.jpg"]);

    phototracks()
        .args(args(root.path()))
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 matched"));

    assert!(!root.path().join("out").exists());
}

#[test]
fn exports_csv_and_geojson() {
    let root = layout(&["20230601_140000.jpg", "notes.jpg"]);
    let csv = root.path().join("report.csv");
    let geojson = root.path().join("photos.geojson");

    phototracks()
        .args(args(root.path()))
        .arg("--report-csv")
        .arg(&csv)
        .arg("--geojson")
        .arg(&geojson)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 failed"));

    let report = fs::read_to_string(&csv).unwrap();
    assert!(report.starts_with("photo,status,"));
    assert!(report.contains("missing_timestamp"));
    let features = fs::read_to_string(&geojson).unwrap();
    assert!(features.contains("FeatureCollection"));
    assert!(features.contains("Afternoon hike"));
}

#[test]
fn empty_photo_folder_fails() {
    let root = layout(&[]);

    phototracks()
        .args(args(root.path()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no photos found"));
}

#[test]
fn missing_track_folder_fails() {
    let root = layout(&["20230601_140000.jpg"]);
    fs::remove_dir_all(root.path().join("tracks")).unwrap();

    phototracks()
        .args(args(root.path()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}
