// this_file: tests/cli.rs
//! CLI integration tests for the drawcache binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const SCENE: &str = r#"{
    "width": 64, "height": 48, "frames": 2,
    "items": [
        {"type": "rect", "area": {"x1": 4, "y1": 4, "x2": 35, "y2": 35},
         "radius": 6, "bg_color": {"r": 200, "g": 40, "b": 40},
         "border_width": 2, "shadow_width": 4}
    ]
}"#;

/// Helper to run the `drawcache` binary
fn bin() -> Command {
    let mut cmd = Command::cargo_bin("drawcache").expect("binary exists");
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("DRAWCACHE_MAX_ENTRIES");
    cmd.env_remove("DRAWCACHE_MAX_BYTES");
    cmd
}

#[test]
fn test_cli_version_prints() {
    bin()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("drawcache "));
}

#[test]
fn test_cli_validate_accepts_scene_on_stdin() {
    bin()
        .arg("validate")
        .write_stdin(SCENE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid scene"))
        .stdout(predicate::str::contains("1 rect(s), 0 label(s)"));
}

#[test]
fn test_cli_validate_rejects_bad_scene() {
    bin()
        .args(["--quiet", "validate"])
        .write_stdin(r#"{"width": 0, "height": 8, "items": []}"#)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Invalid scene"));
}

#[test]
fn test_cli_render_writes_png_and_stats() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scene = dir.path().join("scene.json");
    let output = dir.path().join("frame.png");
    fs::write(&scene, SCENE).expect("scene written");

    let out = bin()
        .args(["--quiet", "render"])
        .arg(&scene)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&out).expect("JSON report");
    assert_eq!(report["frames"], 2);
    assert_eq!(report["live_textures"], 0);
    assert!(report["cache"]["hits"].as_u64().unwrap_or(0) > 0);
    assert_eq!(report["cache"]["misses"], report["cache"]["inserts"]);

    let image = image::open(&output).expect("png written");
    assert_eq!((image.width(), image.height()), (64, 48));
}

#[test]
fn test_cli_render_honours_entry_bound() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scene = dir.path().join("scene.json");
    fs::write(&scene, SCENE).expect("scene written");

    let out = bin()
        .args(["--quiet", "render"])
        .arg(&scene)
        .args(["--frames", "3", "--max-entries", "1"])
        .arg("--output")
        .arg(dir.path().join("bounded.png"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&out).expect("JSON report");
    assert_eq!(report["frames"], 3);
    assert!(report["cache"]["evictions"].as_u64().unwrap_or(0) > 0);
    assert!(report["cache"]["entries"].as_u64().unwrap_or(99) <= 1);
}

#[test]
fn test_cli_render_missing_scene_fails() {
    bin()
        .args(["--quiet", "render", "/nonexistent/scene.json"])
        .assert()
        .failure();
}
