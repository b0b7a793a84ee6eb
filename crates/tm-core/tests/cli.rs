//! CLI E2E tests for the time-machine binary.
//!
//! Validates:
//! - A CSV replay runs to completion and writes a JSON summary
//! - Unsupported formats fail with the dataset exit code before binding
//! - Invalid intervals fail with the config exit code
//! - An occupied endpoint fails with the bind exit code

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

const PLANT_CSV: &str = "\
Timestamp,Temperature,Pressure
2019-06-01 08:00:00,20.5,101.3
2019-06-01 08:01:00,21.0,101.1
2019-06-01 08:02:00,21.5,100.9
";

/// Command for the binary, isolated from the caller's environment and config.
fn time_machine(config_home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("time-machine");
    cmd.timeout(Duration::from_secs(60))
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("RUST_LOG");
    for var in [
        "TIME_MACHINE_INTERVAL",
        "TIME_MACHINE_ENDPOINT",
        "TIME_MACHINE_NAMESPACE",
        "TIME_MACHINE_CADENCE",
        "TIME_MACHINE_SERVER_NAME",
        "TIME_MACHINE_CONFIG",
        "TIME_MACHINE_LOG_FORMAT",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn csv_replay_writes_summary() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("plant.csv");
    let summary = dir.path().join("summary.json");
    fs::write(&data, PLANT_CSV).expect("write csv");

    time_machine(dir.path())
        .arg(&data)
        .args(["--interval", "10ms", "--endpoint", "127.0.0.1:0", "--summary"])
        .arg(&summary)
        .assert()
        .success()
        .code(0);

    let json: Value =
        serde_json::from_str(&fs::read_to_string(&summary).expect("summary")).expect("json");
    assert_eq!(json["rows_total"], 3);
    assert_eq!(json["ticks_completed"], 3);
    assert_eq!(json["writes_attempted"], 9);
    assert_eq!(json["writes_failed"], 0);
    assert_eq!(json["interrupted"], false);
    assert!(json["run_id"].as_str().is_some_and(|id| id.starts_with("run-")));
}

#[test]
fn json_logs_on_stderr() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("plant.tsv");
    fs::write(&data, PLANT_CSV.replace(',', "\t")).expect("write tsv");

    time_machine(dir.path())
        .arg(&data)
        .args(["--interval", "1ms", "--endpoint", "127.0.0.1:0", "--log-format", "json"])
        .assert()
        .success()
        .stderr(predicate::str::contains(r#""message":"replay finished""#));
}

#[test]
fn unsupported_format_exits_with_dataset_code() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("plant.pdf");
    fs::write(&data, "not a table").expect("write file");

    time_machine(dir.path())
        .arg(&data)
        .args(["--endpoint", "127.0.0.1:0"])
        .assert()
        .failure()
        .code(11)
        .stderr(predicate::str::contains("unsupported input format"));
}

#[test]
fn zero_interval_exits_with_config_code() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("plant.csv");
    fs::write(&data, PLANT_CSV).expect("write csv");

    time_machine(dir.path())
        .arg(&data)
        .args(["--interval", "0s", "--endpoint", "127.0.0.1:0"])
        .assert()
        .failure()
        .code(10);
}

#[test]
fn occupied_endpoint_exits_with_bind_code() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("plant.csv");
    fs::write(&data, PLANT_CSV).expect("write csv");
    let squatter = TcpListener::bind("127.0.0.1:0").expect("bind");
    let endpoint = format!("127.0.0.1:{}", squatter.local_addr().expect("addr").port());

    time_machine(dir.path())
        .arg(&data)
        .args(["--interval", "1ms", "--endpoint", &endpoint])
        .assert()
        .failure()
        .code(12);
}

#[test]
fn config_file_supplies_interval() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("plant.csv");
    let config = dir.path().join("replay.toml");
    fs::write(&data, PLANT_CSV).expect("write csv");
    fs::write(&config, "interval = \"5ms\"\nendpoint = \"127.0.0.1:0\"\n").expect("write config");

    time_machine(dir.path())
        .arg(&data)
        .arg("--config")
        .arg(&config)
        .assert()
        .success();
}
