//! Publishing advanced state and the handoff artifact to version control.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::git::Git;

/// Commits (and usually pushes) the files a tick produced.
pub trait Publisher {
    /// Record `files` (relative to the repository root) with `message`.
    ///
    /// Publishing files that are already committed unchanged must succeed.
    fn publish(&self, files: &[&Path], message: &str) -> Result<()>;

    /// True once `files` as they are on disk have been fully published.
    ///
    /// `false` means an earlier publish was interrupted and the files should
    /// be published again before anything new is produced.
    fn is_published(&self, files: &[&Path]) -> Result<bool>;
}

/// [`Publisher`] that stages, commits, and pushes with `git`.
#[derive(Debug, Clone)]
pub struct GitPublisher {
    git: Git,
    remote: String,
    branch: String,
    push: bool,
}

impl GitPublisher {
    pub fn new(git: Git, remote: impl Into<String>, branch: impl Into<String>, push: bool) -> Self {
        Self {
            git,
            remote: remote.into(),
            branch: branch.into(),
            push,
        }
    }
}

impl Publisher for GitPublisher {
    fn publish(&self, files: &[&Path], message: &str) -> Result<()> {
        self.git.add(files).context("stage autopilot files")?;
        let committed = self.git.commit_paths(files, message)?;
        info!(committed, commit_message = message, "autopilot files recorded");
        if self.push {
            self.git
                .push_head(&self.remote, &self.branch)
                .with_context(|| format!("push to {}/{}", self.remote, self.branch))?;
        }
        Ok(())
    }

    fn is_published(&self, files: &[&Path]) -> Result<bool> {
        if self.git.has_changes(files)? {
            return Ok(false);
        }
        if !self.push {
            return Ok(true);
        }
        match self.git.unpushed_commits(&self.remote, &self.branch, files)? {
            Some(count) => Ok(count == 0),
            None => {
                debug!(
                    remote = %self.remote,
                    branch = %self.branch,
                    "no remote-tracking ref, treating committed files as published"
                );
                Ok(true)
            }
        }
    }
}
