//! Integration tests for phasetrack-cli.
//!
//! Each test runs the built binary against files in a temporary directory.

use std::path::Path;
use std::process::{Command, Output};

use phasetrack_analysis::AnalysisConfig;
use tempfile::TempDir;

/// Helper to get the path to the `phasetrack` binary built by cargo.
fn phasetrack_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_phasetrack"))
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{what} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// One second of a noisy 440 Hz tone at 44.1 kHz.
fn generate_tone(path: &Path) {
    let output = phasetrack_bin()
        .args(["generate", "--duration", "1", "--noise-variance", "0.01"])
        .arg(path)
        .output()
        .expect("failed to run phasetrack generate");
    assert_success(&output, "generate");
}

#[test]
fn cli_help_lists_commands() {
    let output = phasetrack_bin()
        .arg("--help")
        .output()
        .expect("failed to run phasetrack --help");
    assert_success(&output, "--help");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["generate", "track", "resynth", "config"] {
        assert!(stdout.contains(command), "help should list '{command}'");
    }
}

#[test]
fn cli_version() {
    let output = phasetrack_bin()
        .arg("--version")
        .output()
        .expect("failed to run phasetrack --version");
    assert_success(&output, "--version");
    assert!(String::from_utf8_lossy(&output.stdout).contains("phasetrack"));
}

#[test]
fn generate_writes_wav() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    generate_tone(&path);

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 44100);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len(), 44100);
}

#[test]
fn track_writes_csv_and_summary() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    let csv = dir.path().join("track.csv");
    generate_tone(&input);

    let output = phasetrack_bin()
        .args(["track", "--freq", "440", "--skip", "10", "--output"])
        .arg(&csv)
        .arg(&input)
        .output()
        .expect("failed to run phasetrack track");
    assert_success(&output, "track");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Input SNR"), "stderr: {stderr}");
    assert!(stderr.contains("Output SNR"), "stderr: {stderr}");

    // 1024-sample window, hop 512: (44100 - 1024) / 512 + 1 frames.
    let table = std::fs::read_to_string(&csv).unwrap();
    let mut lines = table.lines();
    assert!(lines.next().unwrap().starts_with("frame,start_sample"));
    assert_eq!(lines.count(), 85);
}

#[test]
fn track_bin_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    generate_tone(&input);

    let output = phasetrack_bin()
        .args(["track", "--bin", "20", "--strategy", "adaptive"])
        .arg(&input)
        .output()
        .expect("failed to run phasetrack track");
    assert_success(&output, "track --bin");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 86);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Tracked bin 20"));
}

#[test]
fn track_peak_finds_tone_near_bin() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    generate_tone(&input);

    // 440 Hz sits at bin 20.43 of a 2048-point FFT at 44.1 kHz.
    let output = phasetrack_bin()
        .args(["track", "--bin", "22", "--peak"])
        .arg(&input)
        .output()
        .expect("failed to run phasetrack track --peak");
    assert_success(&output, "track --peak");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Tracked bin 20"), "stderr: {stderr}");
}

#[test]
fn resynth_preserves_frame_coverage() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    let resynth = dir.path().join("resynth.wav");
    let spectrogram = dir.path().join("spec.csv");
    generate_tone(&input);

    let output = phasetrack_bin()
        .args(["resynth", "--window", "hann", "--spectrogram-csv"])
        .arg(&spectrogram)
        .arg(&input)
        .arg(&resynth)
        .output()
        .expect("failed to run phasetrack resynth");
    assert_success(&output, "resynth");

    let reader = hound::WavReader::open(&resynth).unwrap();
    assert_eq!(reader.len() as usize, 85 * 512 + 1024);

    let table = std::fs::read_to_string(&spectrogram).unwrap();
    assert_eq!(table.lines().count(), 86);
}

#[test]
fn resynth_rejects_unsupported_bit_depth() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    let resynth = dir.path().join("resynth.wav");
    generate_tone(&input);

    let output = phasetrack_bin()
        .args(["resynth", "--bits", "0"])
        .arg(&input)
        .arg(&resynth)
        .output()
        .expect("failed to run phasetrack resynth");

    // A clean error exit, not a panic.
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported bit depth"), "stderr: {stderr}");
    assert!(!stderr.contains("panicked"), "stderr: {stderr}");
}

#[test]
fn config_prints_parsable_defaults() {
    let output = phasetrack_bin()
        .arg("config")
        .output()
        .expect("failed to run phasetrack config");
    assert_success(&output, "config");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed = AnalysisConfig::from_toml(&stdout).unwrap();
    assert_eq!(parsed, AnalysisConfig::default());
}

#[test]
fn config_check_rejects_bad_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[stft]\noverlap = 1.5\n").unwrap();

    let output = phasetrack_bin()
        .arg("config")
        .arg("--check")
        .arg(&path)
        .output()
        .expect("failed to run phasetrack config --check");
    assert!(!output.status.success(), "bad config should be rejected");
}

#[test]
fn track_missing_input_fails() {
    let output = phasetrack_bin()
        .args(["track", "--freq", "440", "/nonexistent/input.wav"])
        .output()
        .expect("failed to run phasetrack track");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("/nonexistent/input.wav"));
}
