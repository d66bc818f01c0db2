//! Lifecycle tests driving `run_tick` against a real git repository.
//!
//! These walk a three-task playbook from the sentinel state to completion,
//! interleaving unhealthy snapshots, and check that each advance produces
//! exactly one commit and that repeated ticks never double-advance.

use std::fs;

use autopilot::core::progression::ProgressionState;
use autopilot::io::git::Git;
use autopilot::io::init::NEXT_TASK_FILE;
use autopilot::io::publish::GitPublisher;
use autopilot::test_support::{FixedHealth, TestRepo, task};
use autopilot::tick::{TickOutcome, run_tick};

fn setup() -> (TestRepo, Git, GitPublisher) {
    let repo = TestRepo::new().expect("repo");
    repo.write_playbook(&[task("t1"), task("t2"), task("t3")])
        .expect("playbook");
    repo.write_state(&ProgressionState::default()).expect("state");
    assert!(repo.commit_all("chore: add playbook").expect("commit"));
    let git = Git::new(repo.path());
    let publisher = GitPublisher::new(git.clone(), "origin", "main", false);
    (repo, git, publisher)
}

/// Full walk: advance, hold twice, advance twice, then complete twice.
#[test]
fn playbook_walks_to_completion_one_task_per_healthy_tick() {
    let (repo, git, publisher) = setup();
    let health = FixedHealth::new(true);
    let base = git.commit_count().expect("count");

    assert_eq!(
        run_tick(repo.path(), &health, &publisher).expect("tick 1"),
        TickOutcome::Advanced(task("t1"))
    );
    assert_eq!(git.head_subject().expect("subject"), "autopilot: NEXT_TASK -> t1");
    assert_eq!(git.commit_count().expect("count"), base + 1);

    health.set(false);
    for _ in 0..2 {
        assert_eq!(
            run_tick(repo.path(), &health, &publisher).expect("held tick"),
            TickOutcome::Held {
                candidate: "t2".to_string()
            }
        );
    }
    assert_eq!(git.commit_count().expect("count"), base + 1);
    assert_eq!(
        repo.read_state().expect("state").current_task.as_deref(),
        Some("t1")
    );

    health.set(true);
    for expected in ["t2", "t3"] {
        assert_eq!(
            run_tick(repo.path(), &health, &publisher).expect("tick"),
            TickOutcome::Advanced(task(expected))
        );
    }
    assert_eq!(git.commit_count().expect("count"), base + 3);

    let calls_before = health.calls();
    for _ in 0..2 {
        assert_eq!(
            run_tick(repo.path(), &health, &publisher).expect("final tick"),
            TickOutcome::AllComplete
        );
    }
    assert_eq!(health.calls(), calls_before);
    assert_eq!(git.commit_count().expect("count"), base + 3);
    assert_eq!(
        repo.read_state().expect("state").current_task.as_deref(),
        Some("t3")
    );

    let artifact = fs::read_to_string(repo.path().join(NEXT_TASK_FILE)).expect("artifact");
    assert!(artifact.starts_with("# Task: t3 – t3 title\n\nt3 prompt\n"));
    assert!(artifact.contains("`[AUTO] t3`"));
}

/// State and artifact land in the same commit, and nothing else does.
#[test]
fn advance_commit_contains_only_state_and_artifact() {
    let (repo, _git, publisher) = setup();
    fs::write(repo.path().join("wip.txt"), "unrelated\n").expect("write");

    run_tick(repo.path(), &FixedHealth::new(true), &publisher).expect("tick");

    assert_eq!(
        repo.head_files().expect("files"),
        vec![".autopilot/state.json", "NEXT_TASK.md"]
    );
}

/// A rejected push leaves `t1` committed locally; the retry pushes `t1`
/// rather than stacking `t2` on top of it.
#[cfg(unix)]
#[test]
fn rejected_push_is_retried_before_advancing() {
    use std::os::unix::fs::PermissionsExt;

    let (repo, git, _) = setup();
    let remote = repo.add_bare_remote("origin").expect("remote");
    let hooks = remote.path().join("hooks");
    fs::create_dir_all(&hooks).expect("hooks dir");
    let hook = hooks.join("pre-receive");
    fs::write(&hook, "#!/bin/sh\nexit 1\n").expect("hook");
    fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).expect("chmod");
    let publisher = GitPublisher::new(git.clone(), "origin", "main", true);
    let health = FixedHealth::new(true);

    assert!(run_tick(repo.path(), &health, &publisher).is_err());
    assert_eq!(git.head_subject().expect("subject"), "autopilot: NEXT_TASK -> t1");

    fs::remove_file(&hook).expect("remove hook");
    let commits = git.commit_count().expect("count");
    assert_eq!(
        run_tick(repo.path(), &health, &publisher).expect("retry"),
        TickOutcome::Reemitted(task("t1"))
    );
    assert_eq!(git.commit_count().expect("count"), commits);
    assert_eq!(remote_subject(remote.path()), "autopilot: NEXT_TASK -> t1");

    assert_eq!(
        run_tick(repo.path(), &health, &publisher).expect("advance"),
        TickOutcome::Advanced(task("t2"))
    );
    assert_eq!(remote_subject(remote.path()), "autopilot: NEXT_TASK -> t2");
}

#[cfg(unix)]
fn remote_subject(remote: &std::path::Path) -> String {
    let output = std::process::Command::new("git")
        .args(["log", "-1", "--format=%s", "main"])
        .current_dir(remote)
        .output()
        .expect("git log");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
