//! Git adapter for publishing progression updates.
//!
//! A small, explicit wrapper around `git` subprocess calls; nothing here
//! rewrites history.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Stage the given paths (relative to the workdir).
    pub fn add(&self, paths: &[&Path]) -> Result<()> {
        self.run_checked_with_paths(&["add"], paths)?;
        Ok(())
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let out = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(!String::from_utf8_lossy(&out.stdout).trim().is_empty())
    }

    /// Commit staged changes with a message.
    ///
    /// If there are no staged changes, this returns Ok(false) and does nothing.
    #[instrument(skip_all)]
    pub fn commit_staged(&self, message: &str) -> Result<bool> {
        if !self.has_staged_changes()? {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        debug!("committing staged changes");
        self.run_checked(&["commit", "-m", message])?;
        Ok(true)
    }

    /// Commit only `paths`, leaving anything else in the index staged.
    ///
    /// Returns Ok(false) without committing when none of `paths` differ
    /// from `HEAD` in the index.
    #[instrument(skip_all, fields(paths = paths.len()))]
    pub fn commit_paths(&self, paths: &[&Path], message: &str) -> Result<bool> {
        let out = self.run_checked_with_paths(&["diff", "--cached", "--name-only"], paths)?;
        if String::from_utf8_lossy(&out.stdout).trim().is_empty() {
            debug!("no staged changes in paths, skipping commit");
            return Ok(false);
        }
        debug!("committing paths");
        self.run_checked_with_paths(&["commit", "--quiet", "-m", message], paths)?;
        Ok(true)
    }

    /// True if any of `paths` has uncommitted changes (staged, unstaged, or
    /// untracked).
    pub fn has_changes(&self, paths: &[&Path]) -> Result<bool> {
        let out = self.run_checked_with_paths(&["status", "--porcelain"], paths)?;
        Ok(!String::from_utf8_lossy(&out.stdout).trim().is_empty())
    }

    /// Commits on `HEAD` touching `paths` that `remote/branch` does not have.
    ///
    /// `None` when there is no remote-tracking ref to compare against.
    pub fn unpushed_commits(
        &self,
        remote: &str,
        branch: &str,
        paths: &[&Path],
    ) -> Result<Option<usize>> {
        let tracking = format!("refs/remotes/{remote}/{branch}");
        let verify = self.run(&["rev-parse", "--verify", "--quiet", &tracking])?;
        if !verify.status.success() {
            return Ok(None);
        }
        let range = format!("{tracking}..HEAD");
        let out = self.run_checked_with_paths(&["rev-list", "--count", &range], paths)?;
        let raw = String::from_utf8_lossy(&out.stdout);
        raw.trim()
            .parse::<usize>()
            .map(Some)
            .with_context(|| format!("parse unpushed count '{}'", raw.trim()))
    }

    /// Push `HEAD` to `branch` on `remote`.
    #[instrument(skip_all, fields(remote, branch))]
    pub fn push_head(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!("HEAD:{branch}");
        debug!(remote, refspec = %refspec, "pushing");
        self.run_checked(&["push", remote, &refspec])?;
        Ok(())
    }

    /// Subject line of the `HEAD` commit.
    pub fn head_subject(&self) -> Result<String> {
        let out = self.run_checked(&["log", "-1", "--format=%s"])?;
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    /// Number of commits reachable from `HEAD`.
    pub fn commit_count(&self) -> Result<usize> {
        let out = self.run_checked(&["rev-list", "--count", "HEAD"])?;
        let raw = String::from_utf8_lossy(&out.stdout);
        raw.trim()
            .parse()
            .with_context(|| format!("parse commit count '{}'", raw.trim()))
    }

    fn run_checked_with_paths(&self, args: &[&str], paths: &[&Path]) -> Result<Output> {
        let args = with_paths(args, paths);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_checked(&args)
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

/// `args`, then `--`, then `paths`.
fn with_paths(args: &[&str], paths: &[&Path]) -> Vec<String> {
    args.iter()
        .map(|arg| arg.to_string())
        .chain(std::iter::once("--".to_string()))
        .chain(paths.iter().map(|path| path.to_string_lossy().into_owned()))
        .collect()
}
