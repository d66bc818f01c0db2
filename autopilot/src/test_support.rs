//! Test-only helpers: task builders, scripted collaborators, scratch repos.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::catalog::Task;
use crate::core::progression::ProgressionState;
use crate::error::CollaboratorError;
use crate::io::git::Git;
use crate::io::health::HealthCheck;
use crate::io::init::AutopilotPaths;
use crate::io::playbook::{Playbook, write_playbook};
use crate::io::publish::Publisher;
use crate::io::state_store::{load_state, write_state};

/// Create a deterministic task with derived title and prompt.
pub fn task(id: &str) -> Task {
    Task {
        id: id.to_string(),
        title: format!("{id} title"),
        prompt: format!("{id} prompt"),
    }
}

/// Health oracle with a fixed verdict that counts how often it is asked.
#[derive(Debug)]
pub struct FixedHealth {
    healthy: Cell<bool>,
    calls: Cell<usize>,
}

impl FixedHealth {
    pub fn new(healthy: bool) -> Self {
        Self {
            healthy: Cell::new(healthy),
            calls: Cell::new(0),
        }
    }

    pub fn set(&self, healthy: bool) {
        self.healthy.set(healthy);
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl HealthCheck for FixedHealth {
    fn is_healthy(&self) -> Result<bool> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.healthy.get())
    }
}

/// Health oracle whose checks can never run.
#[derive(Debug, Default)]
pub struct FailingHealth;

impl HealthCheck for FailingHealth {
    fn is_healthy(&self) -> Result<bool> {
        Err(CollaboratorError::HealthCheck {
            step: "test".to_string(),
            detail: "toolchain missing".to_string(),
        }
        .into())
    }
}

/// Publisher that records calls instead of touching git.
///
/// Files count as published until a publish fails, and again after the next
/// successful one.
#[derive(Debug)]
pub struct RecordingPublisher {
    calls: RefCell<Vec<(Vec<String>, String)>>,
    fail: Cell<bool>,
    published: Cell<bool>,
}

impl Default for RecordingPublisher {
    fn default() -> Self {
        Self {
            calls: RefCell::default(),
            fail: Cell::new(false),
            published: Cell::new(true),
        }
    }
}

impl RecordingPublisher {
    /// Publisher that records the call and then fails (e.g. a rejected push).
    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.set_failing(true);
        publisher
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.set(fail);
    }

    pub fn calls(&self) -> Vec<(Vec<String>, String)> {
        self.calls.borrow().clone()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, files: &[&Path], message: &str) -> Result<()> {
        let files = files
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        self.calls.borrow_mut().push((files, message.to_string()));
        if self.fail.get() {
            self.published.set(false);
            return Err(anyhow!("push rejected"));
        }
        self.published.set(true);
        Ok(())
    }

    fn is_published(&self, _files: &[&Path]) -> Result<bool> {
        Ok(self.published.get())
    }
}

/// Scratch git repository with one initial commit on `main`.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        let root = dir.path();
        git(root, &["init", "--quiet"])?;
        git(root, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
        git(root, &["config", "user.email", "autopilot@example.com"])?;
        git(root, &["config", "user.name", "Autopilot Tests"])?;
        git(root, &["config", "commit.gpgsign", "false"])?;
        fs::write(root.join("README.md"), "# scratch\n").context("write README")?;
        let repo = Self { dir };
        let git = Git::new(repo.path());
        git.add_all()?;
        git.commit_staged("chore: initial commit")?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> AutopilotPaths {
        AutopilotPaths::new(self.path())
    }

    pub fn state_path(&self) -> PathBuf {
        self.paths().state_path
    }

    pub fn write_playbook(&self, tasks: &[Task]) -> Result<()> {
        let paths = self.paths();
        fs::create_dir_all(&paths.autopilot_dir).context("create .autopilot")?;
        write_playbook(
            &paths.playbook_path,
            &Playbook {
                tasks: tasks.to_vec(),
            },
        )
    }

    pub fn write_state(&self, state: &ProgressionState) -> Result<()> {
        write_state(&self.state_path(), state)
    }

    pub fn read_state(&self) -> Result<ProgressionState> {
        load_state(&self.state_path())
    }

    /// Paths changed by the `HEAD` commit, sorted.
    pub fn head_files(&self) -> Result<Vec<String>> {
        let output = Command::new("git")
            .args(["show", "--name-only", "--format=", "HEAD"])
            .current_dir(self.path())
            .output()
            .context("spawn git show")?;
        let mut files: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        files.sort();
        Ok(files)
    }

    /// Create a bare repository, register it as `name`, and push `main` to it.
    ///
    /// The returned directory must outlive the remote's use.
    pub fn add_bare_remote(&self, name: &str) -> Result<TempDir> {
        let remote = tempfile::tempdir().context("create remote tempdir")?;
        git(remote.path(), &["init", "--bare", "--quiet"])?;
        let url = remote.path().to_string_lossy().into_owned();
        git(self.path(), &["remote", "add", name, &url])?;
        git(self.path(), &["push", "--quiet", name, "main"])?;
        Ok(remote)
    }

    /// Stage and commit everything currently in the worktree.
    pub fn commit_all(&self, message: &str) -> Result<bool> {
        let git = Git::new(self.path());
        git.add_all()?;
        git.commit_staged(message)
    }
}

fn git(root: &Path, args: &[&str]) -> Result<()> {
    let status = Command::new("git")
        .args(args)
        .current_dir(root)
        .status()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !status.success() {
        return Err(anyhow!("git {} failed", args.join(" ")));
    }
    Ok(())
}
