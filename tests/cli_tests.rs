//! CLI surface tests

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn vidshrink() -> Command {
    Command::cargo_bin("vidshrink").unwrap()
}

#[test]
fn convert_rejects_missing_input() {
    vidshrink()
        .args(["convert", "--input", "/no/such/file.mp4", "--output", "out.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn convert_rejects_unknown_mode() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mp4");
    std::fs::write(&input, b"data").unwrap();

    vidshrink()
        .args([
            "convert",
            "--input",
            input.to_str().unwrap(),
            "--output",
            dir.path().join("out.mp4").to_str().unwrap(),
            "--mode",
            "turbo",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown mode"));
}

#[test]
fn convert_reports_missing_encoder() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mp4");
    std::fs::write(&input, b"data").unwrap();

    vidshrink()
        .args([
            "convert",
            "--input",
            input.to_str().unwrap(),
            "--output",
            dir.path().join("out.mp4").to_str().unwrap(),
            "--encoder",
            dir.path().join("missing-ffmpeg").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Encoder binary not found"));
}

#[test]
fn estimate_previews_size_without_duration() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mp4");
    // 1 MiB input, 25% reduction -> 0.75 MiB preview.
    std::fs::write(&input, vec![0u8; 1024 * 1024]).unwrap();

    vidshrink()
        .args([
            "estimate",
            "--input",
            input.to_str().unwrap(),
            "--reduction",
            "25",
            "--encoder",
            dir.path().join("missing-ffmpeg").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.75 MB"))
        .stdout(predicate::str::contains("unavailable"));
}

#[test]
fn estimate_clamps_reduction_to_supported_range() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mp4");
    std::fs::write(&input, vec![0u8; 1024]).unwrap();

    vidshrink()
        .args([
            "estimate",
            "--input",
            input.to_str().unwrap(),
            "--reduction",
            "99",
            "--json",
            "--encoder",
            dir.path().join("missing-ffmpeg").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reduction_percent\":80"));
}
