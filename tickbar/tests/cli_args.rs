//! CLI arg tests for tickbar (client)
use std::process::Command;

use tempfile::tempdir;

fn output_text(out: &std::process::Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    )
}

#[test]
fn test_help_mentions_short_and_long_flags() {
    let assert = assert_cmd::Command::cargo_bin("tickbar")
        .expect("tickbar binary")
        .arg("--help")
        .assert()
        .success();
    let text = output_text(assert.get_output());
    assert!(
        text.contains("--settings")
            && text.contains("-s")
            && text.contains("--counter-path")
            && text.contains("-c")
            && text.contains("--worker"),
        "help text missing expected flags\n{text}"
    );
}

#[test]
fn test_dry_run_resolves_host_and_defaults() {
    let dir = tempdir().unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_tickbar"))
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["--dry-run", "-c", "overlay", "10.0.0.5:24050"])
        .output()
        .expect("run tickbar");
    assert!(out.status.success());
    let text = output_text(&out);
    assert!(text.contains("host: 10.0.0.5:24050"), "{text}");
    assert!(text.contains("counter path: overlay"), "{text}");
    assert!(text.contains("\"pool_capacity\": 100"), "{text}");
    assert!(text.contains("\"offload_pool\": false"), "{text}");
    // Dry run never writes a settings file on its own
    assert!(!dir.path().join("tickbar").join("settings.json").exists());
}

#[test]
fn test_worker_and_save_persist_settings() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("custom.json");
    let out = Command::new(env!("CARGO_BIN_EXE_tickbar"))
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["--dry-run", "--worker", "--save", "--settings"])
        .arg(&file)
        .output()
        .expect("run tickbar");
    assert!(out.status.success(), "{}", output_text(&out));
    let saved = std::fs::read_to_string(&file).expect("settings written");
    assert!(saved.contains("\"offload_pool\": true"), "{saved}");
}

#[test]
fn test_unknown_flag_prints_usage() {
    let out = Command::new(env!("CARGO_BIN_EXE_tickbar"))
        .arg("--bogus")
        .output()
        .expect("run tickbar");
    assert!(output_text(&out).contains("Usage:"));
}
