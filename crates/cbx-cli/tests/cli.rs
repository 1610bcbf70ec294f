use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const RAW_CSV: &str = "\
Date;Tranche horaire du programme d'échange;FR vers GB (MWh);GB vers FR (MWh);FR vers CH (MWh);CH vers FR (MWh);FR vers IT (MWh);IT vers FR (MWh);FR vers ES (MWh);ES vers FR (MWh);FR->CWE/Core;CWE/Core->FR
2024-01-01;1;100;20;50;5;30;10;40;15;200;50
2024-01-01;2;90;25;45;5;35;10;42;12;180;60
2024-01-01;24;95;22;48;6;32;11;41;13;190;55
";

const PROCESSED_CSV: &str = "\
timestamp,partner,export_mw,import_mw,net_mw
2024-01-01 00:00:00,GBR,100.0,20.0,80.0
2024-01-01 00:00:00,TOTAL,100.0,20.0,80.0
2024-01-01 01:00:00,GBR,90.0,25.0,65.0
2024-01-01 01:00:00,TOTAL,90.0,25.0,65.0
";

#[test]
fn cbx_etl_writes_processed_dataset() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("raw.csv");
    fs::write(&raw, RAW_CSV).unwrap();
    let out = dir.path().join("processed.csv");
    let report = dir.path().join("report.json");

    let mut cmd = Command::cargo_bin("cbx-cli").unwrap();
    cmd.args([
        "etl",
        "--raw",
        raw.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--report",
        report.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("hour-slot convention: 1-24"))
    .stdout(predicate::str::contains("wrote processed dataset"));

    let processed = fs::read_to_string(&out).unwrap();
    assert!(processed.starts_with("timestamp,partner,export_mw,import_mw,net_mw"));
    // slot 24 wrapped onto the next day
    assert!(processed.contains("2024-01-02 00:00:00"));
    assert!(processed.contains("CWE/Core"));
    assert!(processed.contains("TOTAL"));

    let report_json = fs::read_to_string(&report).unwrap();
    assert!(report_json.contains("\"rows_read\": 3"));
}

#[test]
fn cbx_ts_kpi_emits_json() {
    let dir = tempdir().unwrap();
    let processed = dir.path().join("processed.csv");
    fs::write(&processed, PROCESSED_CSV).unwrap();

    let mut cmd = Command::cargo_bin("cbx-cli").unwrap();
    cmd.args([
        "ts",
        "kpi",
        "--input",
        processed.to_str().unwrap(),
        "--granularity",
        "day",
        "--json",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"total_net_mwh\": 145.0"))
    .stdout(predicate::str::contains("\"exporter_fraction\": 1.0"));
}

#[test]
fn cbx_ts_resample_writes_csv() {
    let dir = tempdir().unwrap();
    let processed = dir.path().join("processed.csv");
    fs::write(&processed, PROCESSED_CSV).unwrap();
    let out = dir.path().join("daily.csv");

    let mut cmd = Command::cargo_bin("cbx-cli").unwrap();
    cmd.args([
        "ts",
        "resample",
        "--input",
        processed.to_str().unwrap(),
        "--granularity",
        "day",
        "-o",
        out.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("wrote 1 day bucket(s)"));

    let daily = fs::read_to_string(&out).unwrap();
    assert!(daily.starts_with("bucket,export_mw,import_mw,net_mw"));
    assert!(daily.contains("2024-01-01 00:00:00,190.0,45.0,145.0"));
}

#[test]
fn cbx_ts_rejects_unknown_granularity() {
    let dir = tempdir().unwrap();
    let processed = dir.path().join("processed.csv");
    fs::write(&processed, PROCESSED_CSV).unwrap();

    let mut cmd = Command::cargo_bin("cbx-cli").unwrap();
    cmd.args([
        "ts",
        "kpi",
        "--input",
        processed.to_str().unwrap(),
        "--granularity",
        "fortnight",
    ])
    .assert()
    .failure()
    .stdout(predicate::str::contains("unknown granularity 'fortnight'"));
}

#[test]
fn cbx_validate_flags_broken_invariants() {
    let dir = tempdir().unwrap();
    let clean = dir.path().join("clean.csv");
    fs::write(&clean, PROCESSED_CSV).unwrap();

    let mut cmd = Command::cargo_bin("cbx-cli").unwrap();
    cmd.args(["validate", clean.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("validation successful"));

    let broken = dir.path().join("broken.csv");
    fs::write(
        &broken,
        "timestamp,partner,export_mw,import_mw,net_mw\n\
         2024-01-01 00:00:00,GBR,100.0,20.0,999.0\n",
    )
    .unwrap();
    let mut cmd = Command::cargo_bin("cbx-cli").unwrap();
    cmd.args(["validate", broken.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("net mismatch"));
}

#[test]
fn cbx_inspect_reports_coverage() {
    let dir = tempdir().unwrap();
    let processed = dir.path().join("processed.csv");
    fs::write(&processed, PROCESSED_CSV).unwrap();

    let mut cmd = Command::cargo_bin("cbx-cli").unwrap();
    cmd.args(["inspect", processed.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rows           : 4"))
        .stdout(predicate::str::contains("GBR"));
}

#[test]
fn cbx_batch_leaves_manifest() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("exchanges-2024.csv");
    fs::write(&raw, RAW_CSV).unwrap();
    let out_root = dir.path().join("out");

    let mut cmd = Command::cargo_bin("cbx-cli").unwrap();
    cmd.args([
        "batch",
        "--raw",
        raw.to_str().unwrap(),
        "--out-root",
        out_root.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("batch finished: 1 ok, 0 failed"));

    assert!(out_root.join("batch_manifest.json").exists());
    assert!(out_root
        .join("exchanges-2024")
        .join("processed.csv")
        .exists());
}

#[test]
fn cbx_completions_prints_script() {
    let mut cmd = Command::cargo_bin("cbx-cli").unwrap();
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cbx-cli"));
}
