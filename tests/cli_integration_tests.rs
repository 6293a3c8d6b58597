//! CLI Integration Tests
//!
//! Tests the CLI binary directly using assert_cmd to exercise main.rs code paths.
//!
//! # Coverage Exclusion
//! These tests are skipped during coverage runs. Run without coverage for
//! full testing.

#![cfg(not(coverage))]
#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn gridcalc() -> Command {
    let mut cmd = Command::cargo_bin("gridcalc").unwrap();
    cmd.env_remove("GRIDCALC_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    gridcalc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("gridcalc"))
        .stdout(predicate::str::contains("COMMANDS"));
}

#[test]
fn test_cli_version() {
    gridcalc()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gridcalc"));
}

#[test]
fn test_calc_help() {
    gridcalc()
        .args(["calc", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Build a sheet and apply edits"));
}

#[test]
fn test_missing_subcommand_fails() {
    gridcalc().assert().failure();
}

// ═══════════════════════════════════════════════════════════════════════════
// EVAL
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_eval_literal_arithmetic() {
    gridcalc()
        .args(["eval", "=2+3*4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("14"));
}

#[test]
fn test_eval_with_cells() {
    gridcalc()
        .args(["eval", "=SUM(A1:A3)/A4", "--cell", "A1=1", "--cell", "A2=2"])
        .args(["--cell", "A3=3", "--cell", "A4=4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.5"));
}

#[test]
fn test_eval_formula_error_is_not_a_failure() {
    gridcalc()
        .args(["eval", "=10/0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#DIV/0!"));
}

#[test]
fn test_eval_json() {
    let json = json_stdout(gridcalc().args(["eval", "=A1*2", "--cell", "A1=21", "--json"]));
    assert_eq!(json["formula"], "=A1*2");
    assert_eq!(json["result"]["Ok"]["type"], "Number");
    assert_eq!(json["result"]["Ok"]["value"], 42.0);
}

#[test]
fn test_eval_json_error() {
    let json = json_stdout(gridcalc().args(["eval", "=NOPE(1)", "--json"]));
    assert_eq!(json["result"]["Err"]["kind"], "UnknownFunction");
    assert_eq!(json["result"]["Err"]["detail"], "NOPE");
}

#[test]
fn test_eval_bad_assignment_fails() {
    gridcalc()
        .args(["eval", "=1", "--cell", "A1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidReference"));
}

// ═══════════════════════════════════════════════════════════════════════════
// CALC
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_calc_budget_scenario() {
    gridcalc()
        .args(["calc", "--cell", "A1=50000", "--cell", "A2=35000"])
        .args(["--cell", "A3==A1-A2", "--set", "A1=60000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("A3"))
        .stdout(predicate::str::contains("25000"));
}

#[test]
fn test_calc_json_reports_each_edit() {
    let json = json_stdout(
        gridcalc()
            .args(["calc", "--cell", "A1=50000", "--cell", "A2=35000"])
            .args(["--cell", "A3==A1-A2", "--set", "A1=60000"])
            .args(["--set", "A3==A1-A2-A3", "--json"]),
    );

    let edits = json["edits"].as_array().unwrap();
    assert_eq!(edits.len(), 2);

    let first = &edits[0];
    assert_eq!(first["cell"], "A1");
    assert_eq!(first["report"]["recomputed"][0][1]["Ok"]["value"], 25000.0);

    let second = &edits[1];
    assert_eq!(second["raw"], "=A1-A2-A3");
    assert_eq!(second["report"]["cycles"][0][0]["row"], 3);
    assert_eq!(second["report"]["recomputed"][0][1]["Err"]["kind"], "CircularReference");

    let cells = json["cells"].as_array().unwrap();
    assert_eq!(cells.len(), 3);
    assert_eq!(cells[2]["cell"], "A3");
    assert_eq!(cells[2]["state"], "Error");
    assert!(cells[0].get("state").is_none());
}

#[test]
fn test_calc_propagated_error() {
    let json = json_stdout(gridcalc().args([
        "calc", "--cell", "A1==1/0", "--cell", "B1==A1+1", "--json",
    ]));
    let cells = json["cells"].as_array().unwrap();
    assert_eq!(cells[0]["result"]["Err"]["kind"], "DivisionByZero");
    assert_eq!(cells[1]["result"]["Err"]["kind"], "Propagated");
    assert_eq!(cells[1]["result"]["Err"]["detail"], "DivisionByZero");
}

#[test]
fn test_calc_cycle_warning() {
    gridcalc()
        .args(["calc", "--cell", "A1==B1", "--set", "B1==A1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("circular reference"))
        .stdout(predicate::str::contains("#CIRC!"));
}

#[test]
fn test_calc_invalid_cell_fails() {
    gridcalc()
        .args(["calc", "--cell", "1A=4"])
        .assert()
        .failure();
}

// ═══════════════════════════════════════════════════════════════════════════
// AUDIT AND FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_audit_shows_dependencies() {
    gridcalc()
        .args(["audit", "B1", "--cell", "A1=5", "--cell", "B1==A1*2"])
        .args(["--cell", "C1==B1+A1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Audit Trail"))
        .stdout(predicate::str::contains("Reads:"))
        .stdout(predicate::str::contains("A1"))
        .stdout(predicate::str::contains("C1"))
        .stdout(predicate::str::contains("10"));
}

#[test]
fn test_functions_lists_builtins() {
    gridcalc()
        .arg("functions")
        .assert()
        .success()
        .stdout(predicate::str::contains("VLOOKUP"))
        .stdout(predicate::str::contains("3-4 argument(s)"))
        .stdout(predicate::str::contains("CONCATENATE"));
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG AND LOGGING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_config_file_applies() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gridcalc.yaml");
    fs::write(&path, "plus_concatenates_text: true\n").unwrap();

    let json = json_stdout(
        gridcalc()
            .arg("--config")
            .arg(&path)
            .args(["eval", "=\"id-\"+7", "--json"]),
    );
    assert_eq!(json["result"]["Ok"]["value"], "id-7");
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gridcalc.yaml");
    fs::write(&path, "max_range_cells: 0\n").unwrap();

    gridcalc()
        .arg("--config")
        .arg(&path)
        .args(["eval", "=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_range_cells"));
}

#[test]
fn test_verbose_logs_to_stderr() {
    gridcalc()
        .args(["--verbose", "calc", "--cell", "A1=1", "--cell", "B1==A1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("cell written"));
}
