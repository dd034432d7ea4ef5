//! E2E tests for `pasta sim`.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn pasta_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pasta"));
    cmd.env("PASTA_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

#[test]
fn sim_run_passes_and_reports_json() {
    let output = pasta_cmd()
        .args(["sim", "run", "--seeds", "5", "--rounds", "80", "--format", "json"])
        .output()
        .expect("sim run should not crash");
    assert!(
        output.status.success(),
        "sim run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["seeds_run"], 5);
    assert_eq!(json["all_passed"], true);
    assert!(json["first_failure"].is_null());
}

#[test]
fn sim_run_rejects_empty_seed_range() {
    pasta_cmd()
        .args(["sim", "run", "--seeds", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("seed_range"));
}

#[test]
fn sim_replay_text_is_deterministic() {
    let run = || {
        pasta_cmd()
            .args(["sim", "replay", "--seed", "4", "--format", "text"])
            .output()
            .expect("sim replay should not crash")
    };
    let first = run();
    let second = run();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);

    let text = String::from_utf8(first.stdout).unwrap();
    assert!(text.starts_with("replay seed=4 "));
    assert!(text.contains("oracle_passed=true"));
}
