//! Change-set sources for the policy gate.
//!
//! Results are trusted as reported. Any failure to obtain them is a
//! [`CollaboratorError::ChangeSet`], never a partial change-set.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, instrument};

use super::process::run_command_with_timeout;
use crate::core::policy::ChangeSet;
use crate::error::CollaboratorError;

/// Budget for a single `gh api` call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

const FETCH_OUTPUT_LIMIT_BYTES: usize = 16 * 1024 * 1024;

/// Where touched paths and addition counts come from.
pub trait ChangeSetSource {
    fn list_changed_paths(&self, change_id: &str) -> Result<Vec<String>, CollaboratorError>;
    fn total_additions(&self, change_id: &str) -> Result<u64, CollaboratorError>;
}

/// Fetch both halves of a change-set; fails as a whole if either fails.
pub fn fetch_change_set<S: ChangeSetSource + ?Sized>(
    source: &S,
    change_id: &str,
) -> Result<ChangeSet, CollaboratorError> {
    let touched_paths = source.list_changed_paths(change_id)?;
    let total_additions = source.total_additions(change_id)?;
    debug!(
        change_id,
        touched = touched_paths.len(),
        total_additions,
        "change-set fetched"
    );
    Ok(ChangeSet {
        touched_paths,
        total_additions,
    })
}

/// Pull request data via the GitHub CLI (`gh api`).
///
/// `{owner}` and `{repo}` are resolved by `gh` from the repository in
/// `workdir`; authentication is whatever `gh` is configured with.
#[derive(Debug, Clone)]
pub struct GhChangeSetSource {
    pub workdir: PathBuf,
    pub timeout: Duration,
}

impl GhChangeSetSource {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    #[instrument(skip(self), fields(timeout_secs = self.timeout.as_secs()))]
    fn gh_api(
        &self,
        what: &'static str,
        change_id: &str,
        args: &[&str],
    ) -> Result<String, CollaboratorError> {
        let fail = |detail: String| CollaboratorError::ChangeSet {
            what,
            change_id: change_id.to_string(),
            detail,
        };
        let mut cmd = Command::new("gh");
        cmd.arg("api").args(args).current_dir(&self.workdir);
        let output = run_command_with_timeout(cmd, self.timeout, FETCH_OUTPUT_LIMIT_BYTES)
            .map_err(|err| fail(format!("{err:#}")))?;
        if output.timed_out {
            return Err(fail(format!(
                "gh api timed out after {}s",
                self.timeout.as_secs()
            )));
        }
        if !output.status.success() {
            return Err(fail(format!(
                "gh api exited with {:?}: {}",
                output.status.code(),
                output.stderr_lossy().trim()
            )));
        }
        if output.truncated > 0 {
            return Err(fail(format!(
                "gh api output exceeded {FETCH_OUTPUT_LIMIT_BYTES} bytes"
            )));
        }
        Ok(output.stdout_lossy())
    }
}

impl ChangeSetSource for GhChangeSetSource {
    fn list_changed_paths(&self, change_id: &str) -> Result<Vec<String>, CollaboratorError> {
        let endpoint = format!("repos/{{owner}}/{{repo}}/pulls/{change_id}/files");
        let out = self.gh_api(
            "changed paths",
            change_id,
            &[&endpoint, "--paginate", "-q", ".[].filename"],
        )?;
        Ok(parse_path_lines(&out))
    }

    fn total_additions(&self, change_id: &str) -> Result<u64, CollaboratorError> {
        let endpoint = format!("repos/{{owner}}/{{repo}}/pulls/{change_id}");
        let out = self.gh_api("additions", change_id, &[&endpoint, "-q", ".additions"])?;
        parse_additions(&out).map_err(|detail| CollaboratorError::ChangeSet {
            what: "additions",
            change_id: change_id.to_string(),
            detail,
        })
    }
}

/// Change-set recorded in a JSON file, for local dry runs.
///
/// ```json
/// { "paths": ["src/lib.rs"], "additions": 42 }
/// ```
#[derive(Debug, Clone)]
pub struct FileChangeSetSource {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ChangesFile {
    paths: Vec<String>,
    additions: u64,
}

impl FileChangeSetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self, what: &'static str, change_id: &str) -> Result<ChangesFile, CollaboratorError> {
        read_changes_file(&self.path).map_err(|detail| CollaboratorError::ChangeSet {
            what,
            change_id: change_id.to_string(),
            detail,
        })
    }
}

impl ChangeSetSource for FileChangeSetSource {
    fn list_changed_paths(&self, change_id: &str) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.read("changed paths", change_id)?.paths)
    }

    fn total_additions(&self, change_id: &str) -> Result<u64, CollaboratorError> {
        Ok(self.read("additions", change_id)?.additions)
    }
}

fn read_changes_file(path: &Path) -> Result<ChangesFile, String> {
    let raw = fs::read_to_string(path).map_err(|err| format!("read {}: {err}", path.display()))?;
    serde_json::from_str(&raw).map_err(|err| format!("parse {}: {err}", path.display()))
}

fn parse_path_lines(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_additions(out: &str) -> Result<u64, String> {
    let raw = out.trim();
    raw.parse()
        .map_err(|err| format!("unexpected additions value '{raw}': {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubSource {
        paths: Result<Vec<String>, ()>,
        additions: u64,
    }

    impl ChangeSetSource for StubSource {
        fn list_changed_paths(&self, change_id: &str) -> Result<Vec<String>, CollaboratorError> {
            self.paths.clone().map_err(|()| CollaboratorError::ChangeSet {
                what: "changed paths",
                change_id: change_id.to_string(),
                detail: "HTTP 502".to_string(),
            })
        }

        fn total_additions(&self, _change_id: &str) -> Result<u64, CollaboratorError> {
            Ok(self.additions)
        }
    }

    #[test]
    fn parses_paginated_path_output() {
        let paths = parse_path_lines("src/lib.rs\n\n  docs/readme.md  \nCargo.toml\n");
        assert_eq!(paths, vec!["src/lib.rs", "docs/readme.md", "Cargo.toml"]);
    }

    #[test]
    fn parses_additions_or_reports_garbage() {
        assert_eq!(parse_additions("128\n"), Ok(128));
        assert!(parse_additions("null\n").unwrap_err().contains("'null'"));
        assert!(parse_additions("-3").is_err());
    }

    #[test]
    fn fetch_combines_both_halves() {
        let source = StubSource {
            paths: Ok(vec!["src/a.rs".to_string()]),
            additions: 9,
        };
        let changes = fetch_change_set(&source, "17").expect("fetch");
        assert_eq!(
            changes,
            ChangeSet {
                touched_paths: vec!["src/a.rs".to_string()],
                total_additions: 9,
            }
        );
    }

    #[test]
    fn fetch_failure_yields_no_partial_changeset() {
        let source = StubSource {
            paths: Err(()),
            additions: 9,
        };
        let err = fetch_change_set(&source, "17").unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not fetch changed paths for change 17: HTTP 502"
        );
    }

    #[test]
    fn file_source_reads_json() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("changes.json");
        fs::write(&path, r#"{"paths": ["src/a.rs", "README.md"], "additions": 12}"#)
            .expect("write");
        let changes = fetch_change_set(&FileChangeSetSource::new(&path), "local").expect("fetch");
        assert_eq!(changes.touched_paths, vec!["src/a.rs", "README.md"]);
        assert_eq!(changes.total_additions, 12);
    }

    #[test]
    fn missing_file_is_a_fetch_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let source = FileChangeSetSource::new(temp.path().join("missing.json"));
        assert!(matches!(
            fetch_change_set(&source, "local"),
            Err(CollaboratorError::ChangeSet {
                what: "changed paths",
                ..
            })
        ));
    }
}
