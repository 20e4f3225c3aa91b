//! Command-line smoke tests. Frame commands run on still images, so no
//! external encoder is needed.

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use tempfile::TempDir;

fn spherecast(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("spherecast").unwrap();
    cmd.current_dir(dir.path()).env("SPHERECAST_LOG_LEVEL", "error");
    cmd
}

/// Equirectangular test pattern: hue follows longitude, brightness latitude
fn write_panorama(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let image = RgbImage::from_fn(64, 32, |x, y| Rgb([(x * 4) as u8, (y * 8) as u8, 128]));
    image.save(&path).unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    spherecast(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("encode"))
        .stdout(predicate::str::contains("package"))
        .stdout(predicate::str::contains("viewport"));
}

#[test]
fn test_analyze_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    spherecast(&dir)
        .args(["analyze", "-i", "absent_360.mp4"])
        .assert()
        .failure();
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    spherecast(&dir)
        .args(["--config", "nope.toml", "analyze", "-i", "clip.mp4"])
        .assert()
        .failure();
}

#[test]
fn test_convert_equirect_to_cubemap() {
    let dir = TempDir::new().unwrap();
    let input = write_panorama(&dir, "pano.png");
    let output = dir.path().join("out").join("cube.png");

    spherecast(&dir)
        .arg("convert")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args([
            "--from",
            "equirectangular",
            "--to",
            "cubemap",
            "--to-layout",
            "grid_3x2",
            "--width",
            "96",
            "--height",
            "64",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("cubemap"));

    let converted = image::open(&output).unwrap();
    assert_eq!((converted.width(), converted.height()), (96, 64));
}

#[test]
fn test_convert_rejects_bad_cubemap_geometry() {
    let dir = TempDir::new().unwrap();
    let input = write_panorama(&dir, "pano.png");

    spherecast(&dir)
        .arg("convert")
        .arg("-i")
        .arg(&input)
        .args([
            "-o",
            "cube.png",
            "--from",
            "equirectangular",
            "--to",
            "cubemap",
            "--to-layout",
            "grid_3x2",
            "--width",
            "100",
            "--height",
            "100",
        ])
        .assert()
        .failure();
    assert!(!dir.path().join("cube.png").exists());
}

#[test]
fn test_viewport_from_still_image() {
    let dir = TempDir::new().unwrap();
    let input = write_panorama(&dir, "pano.png");
    let output = dir.path().join("view.png");

    spherecast(&dir)
        .arg("viewport")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args([
            "--projection",
            "equirectangular",
            "--yaw",
            "-45",
            "--width",
            "32",
            "--height",
            "18",
        ])
        .assert()
        .success();

    let view = image::open(&output).unwrap();
    assert_eq!((view.width(), view.height()), (32, 18));
}
