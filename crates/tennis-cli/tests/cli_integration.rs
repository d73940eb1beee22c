//! CLI Integration Tests
//!
//! These tests run the `tennis` binary and check its output.
//! Tests that need a sensor are marked with #[ignore].
//!
//! Run mock tests:
//! ```
//! cargo test --package tennis-cli --test cli_integration
//! ```
//!
//! Run hardware tests:
//! ```
//! TENNIS_DEVICE="Tennis Sensor" cargo test --package tennis-cli --test cli_integration -- --ignored --nocapture
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Run tennis with an isolated config directory.
fn run_tennis_in(config_home: &Path, args: &[&str], envs: &[(&str, &str)]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tennis"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home)
        .env_remove("TENNIS_DEVICE")
        .env_remove("TENNIS_API_KEY")
        .env_remove("TENNIS_HMAC_KEY")
        .envs(envs.iter().copied())
        .output()
        .expect("Failed to run tennis binary")
}

fn run_tennis(args: &[&str]) -> Output {
    let dir = tempfile::tempdir().unwrap();
    run_tennis_in(dir.path(), args, &[])
}

/// Get device from environment
fn get_device() -> Option<String> {
    env::var("TENNIS_DEVICE").ok().filter(|s| !s.is_empty())
}

/// Write a two-frame dataset export and return its path.
fn write_sample_dataset(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("dataset-serve.json");
    fs::write(
        &path,
        r#"[{"ax":0.5,"ay":-0.25,"az":9.75,"gx":0.0,"gy":1.5,"gz":-2.0,"pos":1},
            {"ax":0.0,"ay":0.0,"az":9.8,"gx":0.0,"gy":0.0,"gz":0.0,"pos":2}]"#,
    )
    .unwrap();
    path
}

// =============================================================================
// Help and Version Tests (no hardware required)
// =============================================================================

#[test]
fn test_help_command() {
    let output = run_tennis(&["--help"]);

    assert!(output.status.success(), "Help should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for cmd in ["scan", "capture", "upload", "sign", "config", "completions"] {
        assert!(stdout.contains(cmd), "Help should list {} command", cmd);
    }
}

#[test]
fn test_version_command() {
    let output = run_tennis(&["--version"]);

    assert!(output.status.success(), "Version should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tennis"), "Version should contain tennis");
}

#[test]
fn test_subcommand_help() {
    for cmd in ["scan", "capture", "upload", "sign", "config"] {
        let output = run_tennis(&[cmd, "--help"]);

        assert!(output.status.success(), "{} --help should succeed", cmd);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(!stdout.is_empty(), "{} --help should produce output", cmd);
    }
}

#[test]
fn test_completions() {
    let output = run_tennis(&["completions", "bash"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("tennis"));
}

// =============================================================================
// Config Commands (no device required)
// =============================================================================

#[test]
fn test_config_path() {
    let output = run_tennis(&["config", "path"]);

    assert!(output.status.success(), "Config path should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tennis-capture"), "Should show config dir");
    assert!(stdout.trim_end().ends_with("config.toml"), "Should show config file");
}

#[test]
fn test_config_set_then_show_redacts_secrets() {
    let dir = tempfile::tempdir().unwrap();

    let set = run_tennis_in(dir.path(), &["config", "set", "hmac-key", "top-secret"], &[]);
    assert!(set.status.success(), "Config set should succeed");
    let set = run_tennis_in(dir.path(), &["config", "set", "label", "forehand"], &[]);
    assert!(set.status.success());

    let show = run_tennis_in(dir.path(), &["config", "show"], &[]);
    assert!(show.status.success());
    let stdout = String::from_utf8_lossy(&show.stdout);
    assert!(stdout.contains("forehand"));
    assert!(!stdout.contains("top-secret"), "Secrets must not be printed");
}

#[test]
fn test_config_set_rejects_bad_value() {
    let output = run_tennis(&["config", "set", "timeout", "soon"]);
    assert!(!output.status.success());
}

// =============================================================================
// Sign and Upload (no device required)
// =============================================================================

#[test]
fn test_sign_prints_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_sample_dataset(dir.path());

    let output = run_tennis_in(
        dir.path(),
        &["sign", dataset.to_str().unwrap(), "-q"],
        &[("TENNIS_HMAC_KEY", "secret")],
    );
    assert!(output.status.success(), "Sign should succeed: {:?}", output);

    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let signature = envelope["signature"].as_str().unwrap();
    assert_eq!(signature.len(), 64);
    assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(envelope["protected"]["alg"], "HS256");
    assert_eq!(envelope["payload"]["values"].as_array().unwrap().len(), 2);
    assert_eq!(envelope["payload"]["values"][0][2], 9.75);
}

#[test]
fn test_sign_to_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_sample_dataset(dir.path());
    let out = dir.path().join("signed.json");

    let output = run_tennis_in(
        dir.path(),
        &["sign", dataset.to_str().unwrap(), "-o", out.to_str().unwrap()],
        &[("TENNIS_HMAC_KEY", "secret")],
    );
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let envelope: serde_json::Value = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
    assert_eq!(envelope["payload"]["device_type"], "tinyml-forwarder");
}

#[test]
fn test_sign_without_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_sample_dataset(dir.path());

    let output = run_tennis_in(dir.path(), &["sign", dataset.to_str().unwrap()], &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No HMAC key"));
}

#[test]
fn test_upload_missing_file_fails() {
    let output = run_tennis(&["upload", "/nonexistent/dataset-x.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read dataset"));
}

// =============================================================================
// Error Handling
// =============================================================================

#[test]
fn test_invalid_subcommand() {
    let output = run_tennis(&["swing"]);
    assert!(!output.status.success());
}

#[test]
fn test_invalid_category() {
    let output = run_tennis(&["upload", "dataset.json", "--category", "validation"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown category"));
}

// =============================================================================
// Hardware Tests (require a powered sensor)
// =============================================================================

#[test]
#[ignore]
fn test_scan_finds_sensor() {
    let output = run_tennis(&["scan", "--format", "json"]);
    assert!(output.status.success());

    let sensors: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(!sensors.as_array().unwrap().is_empty(), "No sensors in range");
}

#[test]
#[ignore]
fn test_capture_frame_count() {
    let Some(device) = get_device() else {
        eprintln!("TENNIS_DEVICE not set, skipping");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("dataset-hw.json");

    let output = run_tennis_in(
        dir.path(),
        &[
            "capture",
            "--device",
            &device,
            "--count",
            "50",
            "--export",
            "-o",
            out.to_str().unwrap(),
        ],
        &[],
    );
    assert!(output.status.success(), "{:?}", output);

    let frames: serde_json::Value = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
    assert_eq!(frames.as_array().unwrap().len(), 50);
}
