//! CLI tests for the `autopilot` binary.
//!
//! Runs `init`, then ticks with shell health steps in a scratch repository
//! and checks exit codes, stdout, and the persisted state.

#![cfg(unix)]

use std::process::{Command, Output};

use autopilot::core::progression::ProgressionState;
use autopilot::exit_codes;
use autopilot::io::config::{AutopilotConfig, write_config};
use autopilot::io::health::HealthStep;
use autopilot::test_support::TestRepo;

fn autopilot(repo: &TestRepo, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_autopilot"))
        .current_dir(repo.path())
        .env_remove("GITHUB_REF_NAME")
        .args(args)
        .output()
        .expect("run autopilot")
}

fn configure(repo: &TestRepo, step: &str) {
    let mut cfg = AutopilotConfig::default();
    cfg.push = false;
    cfg.health.steps = Some(vec![HealthStep {
        name: "check".to_string(),
        command: vec![step.to_string()],
        requires: None,
    }]);
    write_config(&repo.paths().config_path, &cfg).expect("config");
}

fn initialized(step: &str) -> TestRepo {
    let repo = TestRepo::new().expect("repo");
    let out = autopilot(&repo, &["init"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    configure(&repo, step);
    repo.commit_all("chore: init autopilot").expect("commit");
    repo
}

#[test]
fn healthy_tick_advances_then_completes() {
    let repo = initialized("true");

    let out = autopilot(&repo, &[]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&out.stdout).contains("advanced to bootstrap"));
    assert_eq!(
        repo.read_state().expect("state").current_task.as_deref(),
        Some("bootstrap")
    );

    let out = autopilot(&repo, &[]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&out.stdout).contains("all tasks complete"));

    let out = autopilot(&repo, &["status"]);
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "current: bootstrap\nnext: (all 1 tasks complete)\n"
    );
}

#[test]
fn unhealthy_tick_holds_with_ok_exit() {
    let repo = initialized("false");
    let out = autopilot(&repo, &[]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&out.stdout).contains("not advancing to bootstrap"));
    assert_eq!(repo.read_state().expect("state"), ProgressionState::default());
}

#[test]
fn drifted_state_exits_with_config_drift() {
    let repo = initialized("true");
    repo.write_state(&ProgressionState {
        current_task: Some("deleted-task".to_string()),
        ..ProgressionState::default()
    })
    .expect("state");

    let out = autopilot(&repo, &[]);
    assert_eq!(out.status.code(), Some(exit_codes::CONFIG_DRIFT));
    assert!(String::from_utf8_lossy(&out.stderr).contains("deleted-task"));
}

#[test]
fn unrunnable_health_step_exits_with_fetch_failure() {
    let repo = initialized("autopilot-definitely-not-a-real-binary");
    let out = autopilot(&repo, &[]);
    assert_eq!(out.status.code(), Some(exit_codes::FETCH_FAILED));
    assert_eq!(repo.read_state().expect("state"), ProgressionState::default());
}

#[test]
fn second_init_without_force_is_rejected() {
    let repo = initialized("true");
    let out = autopilot(&repo, &["init"]);
    assert_eq!(out.status.code(), Some(exit_codes::INVALID));
}
