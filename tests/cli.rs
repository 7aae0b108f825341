mod common;

use assert_cmd::Command;
use common::TestWorkspace;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

fn datascope() -> Command {
    Command::cargo_bin("datascope").expect("binary under test")
}

#[test]
fn summary_prints_column_table() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write_sample_csv();
    datascope()
        .args(["summary", "-i", csv.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("column").and(contains("feature1")));
}

#[test]
fn correlate_reports_perfect_correlation() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write_sample_csv();
    datascope()
        .args([
            "correlate",
            "-i",
            csv.to_str().unwrap(),
            "-x",
            "feature1",
            "-y",
            "feature2",
        ])
        .assert()
        .success()
        .stdout(contains("1.000000"));
}

#[test]
fn reduce_writes_dim_columns_to_stdout() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write_sample_csv();
    datascope()
        .args([
            "reduce",
            "-i",
            csv.to_str().unwrap(),
            "-m",
            "pca",
            "-k",
            "2",
        ])
        .assert()
        .success()
        .stdout(contains("dim1,dim2"));
}

#[test]
fn missing_column_fails_with_a_named_error() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write_sample_csv();
    datascope()
        .args([
            "correlate",
            "-i",
            csv.to_str().unwrap(),
            "-x",
            "ghost",
            "-y",
            "feature2",
        ])
        .assert()
        .failure()
        .stderr(contains("ghost"));
}

#[test]
fn unsupported_file_extension_is_rejected() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("data.txt", "a,b\n1,2\n");
    datascope()
        .args(["summary", "-i", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("data.txt"));
}

#[test]
fn workspace_flow_ingests_mutates_and_reverts() {
    let scratch = TestWorkspace::new();
    let csv = scratch.write_sample_csv();
    let dir = scratch.path().join("ws");
    let dir_arg = dir.to_str().unwrap();

    datascope()
        .args(["ingest", "-i", csv.to_str().unwrap(), "-w", dir_arg])
        .assert()
        .success();

    datascope()
        .args(["delete-feature", "-w", dir_arg, "--name", "feature3"])
        .assert()
        .success();

    datascope()
        .args(["log", "-w", dir_arg])
        .assert()
        .success()
        .stdout(contains("DELETE_FEATURE").and(contains("false")));

    datascope()
        .args(["revert", "-w", dir_arg, "--entry", "1"])
        .assert()
        .success();

    datascope()
        .args(["log", "-w", dir_arg])
        .assert()
        .success()
        .stdout(contains("true"));

    // after the revert the head is the ingested snapshot again
    let export = scratch.path().join("out.csv");
    datascope()
        .args(["export", "-w", dir_arg, "-o", export.to_str().unwrap()])
        .assert()
        .success();
    let written = std::fs::read_to_string(&export).expect("exported csv");
    assert!(written.starts_with("feature1,feature2,feature3"));
}

#[test]
fn oversample_emits_balanced_csv() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write_classes_csv();
    let assert = datascope()
        .args([
            "oversample",
            "-i",
            csv.to_str().unwrap(),
            "-x",
            "x",
            "-y",
            "class",
            "-m",
            "random",
            "-f",
            "1.0",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let a = stdout.lines().filter(|line| line.ends_with(",a")).count();
    let b = stdout.lines().filter(|line| line.ends_with(",b")).count();
    assert_eq!(a, 6);
    assert_eq!(b, 6);
}
