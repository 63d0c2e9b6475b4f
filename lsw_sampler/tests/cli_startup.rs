//! Binary startup behavior.

use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn test_rejected_config_is_reported() {
    let mut config = NamedTempFile::new().unwrap();
    write!(config, "[timing]\nclock_hz = 0\n").unwrap();
    config.flush().unwrap();
    let region = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_lsw_sampler"))
        .arg("--config")
        .arg(config.path())
        .arg("--region")
        .arg(region.path().join("lsw_region"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let logs = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(logs.contains("clock_hz must be > 0"), "logs: {logs}");
    assert!(!region.path().join("lsw_region").exists());
}
