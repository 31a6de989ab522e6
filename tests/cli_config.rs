use std::{fs, process::Command as Process, time::Duration};

use statpanel::{
    app::{load_app_config, LogLevel},
    cli::{Command, RunOptions},
    config::{Config, TouchDriver},
};

fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn opts_for(cmd: Command) -> RunOptions {
    match cmd {
        Command::Run(opts) | Command::TestPattern(opts) => opts,
        Command::TouchProbe { opts, .. } => opts,
        other => panic!("no run options in {other:?}"),
    }
}

#[test]
fn cli_refresh_overrides_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "# bench unit\ntouch_driver = \"i2cdev\"\nrefresh_interval = \"3s\"\n",
    )
    .unwrap();

    let cmd = Command::parse(&args(&[
        "run",
        "--config",
        path.to_str().unwrap(),
        "--refresh",
        "250ms",
        "--log-level",
        "trace",
    ]))
    .unwrap();
    let cfg = load_app_config(&opts_for(cmd)).unwrap();
    assert_eq!(cfg.touch_driver, TouchDriver::I2cdev);
    assert_eq!(cfg.timing.refresh_interval, Duration::from_millis(250));
    assert_eq!(cfg.log_level, LogLevel::Trace);
}

#[test]
fn file_values_apply_when_cli_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let file = Config {
        touch_addr: 0x39,
        backlight_pin: None,
        refresh_interval: Duration::from_secs(5),
        ..Config::default()
    };
    file.save_to_path(&path).unwrap();

    let cmd = Command::parse(&args(&["test-pattern", "--config", path.to_str().unwrap()])).unwrap();
    let cfg = load_app_config(&opts_for(cmd)).unwrap();
    assert_eq!(cfg.touch_addr, 0x39);
    assert_eq!(cfg.display.backlight_pin, None);
    assert_eq!(cfg.timing.refresh_interval, Duration::from_secs(5));
    assert_eq!(cfg.log_level, LogLevel::Info);
}

#[test]
fn refresh_override_must_exceed_poll_interval() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "poll_interval = \"50ms\"\n").unwrap();
    let cmd = Command::parse(&args(&[
        "--config",
        path.to_str().unwrap(),
        "--refresh",
        "40ms",
    ]))
    .unwrap();
    let err = load_app_config(&opts_for(cmd)).unwrap_err();
    assert!(format!("{err}").contains("poll_interval"), "{err}");
}

#[test]
fn malformed_config_line_is_reported_with_line_number() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "spi_bus = 0\ndc_pin 25\n").unwrap();
    let cmd = Command::parse(&args(&["run", "--config", path.to_str().unwrap()])).unwrap();
    let err = load_app_config(&opts_for(cmd)).unwrap_err();
    assert!(format!("{err}").contains("invalid config line 2"), "{err}");
}

#[test]
fn binary_prints_version_and_rejects_unknown_command() {
    let exe = env!("CARGO_BIN_EXE_statpanel");

    let out = Process::new(exe).arg("--version").output().unwrap();
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        env!("CARGO_PKG_VERSION")
    );

    let out = Process::new(exe).arg("dance").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("error: invalid arguments"));
}
