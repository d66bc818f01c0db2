//! Orchestration for a single policy gate run.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::core::pattern::GlobMatcher;
use crate::core::policy::{Ceiling, CeilingSource, Decision, effective_ceiling, evaluate};
use crate::io::changeset::{ChangeSetSource, fetch_change_set};
use crate::io::policy_store::load_policy;

/// Everything a caller needs to act on a gate verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateReport {
    pub change_id: String,
    pub touched_paths: usize,
    pub total_additions: u64,
    pub ceiling: Ceiling,
    pub decision: Decision,
}

/// Load the policy, fetch the change-set, and evaluate it.
///
/// The policy is loaded first so a broken policy never triggers a fetch.
/// Fetch failures surface as [`CollaboratorError`](crate::error::CollaboratorError).
#[instrument(skip(policy_path, source), fields(policy = %policy_path.display()))]
pub fn run_gate<S: ChangeSetSource + ?Sized>(
    change_id: &str,
    policy_path: &Path,
    override_max: Option<u64>,
    source: &S,
) -> Result<GateReport> {
    let policy = load_policy(policy_path)?;
    let changes = fetch_change_set(source, change_id)?;

    let ceiling = effective_ceiling(&policy, override_max);
    if ceiling.source == CeilingSource::Fallback {
        warn!(
            ceiling = ceiling.value,
            "no max_additions configured, using fallback ceiling"
        );
    }

    let decision = evaluate(&changes, &policy, override_max, &GlobMatcher);
    if let Some(rule) = decision.rule() {
        warn!(rule, "change rejected by policy");
    }

    Ok(GateReport {
        change_id: change_id.to_string(),
        touched_paths: changes.touched_paths.len(),
        total_additions: changes.total_additions,
        ceiling,
        decision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::io::changeset::FileChangeSetSource;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).expect("write");
        path
    }

    #[test]
    fn reports_decision_with_ceiling_source() {
        let temp = tempfile::tempdir().expect("tempdir");
        let policy = write(
            temp.path(),
            "policy.json",
            r#"{"allowlist": ["src/*"], "denylist": ["secrets/*"], "max_additions": 100}"#,
        );
        let changes = write(
            temp.path(),
            "changes.json",
            r#"{"paths": ["src/a.rs"], "additions": 101}"#,
        );

        let report =
            run_gate("42", &policy, None, &FileChangeSetSource::new(changes)).expect("gate");

        assert_eq!(
            report,
            GateReport {
                change_id: "42".to_string(),
                touched_paths: 1,
                total_additions: 101,
                ceiling: Ceiling {
                    value: 100,
                    source: CeilingSource::Policy
                },
                decision: Decision::TooLarge {
                    additions: 101,
                    ceiling: 100
                },
            }
        );
    }

    #[test]
    fn broken_policy_fails_before_fetch() {
        let temp = tempfile::tempdir().expect("tempdir");
        let policy = write(temp.path(), "policy.json", "not json");
        let source = FileChangeSetSource::new(temp.path().join("missing.json"));

        let err = run_gate("42", &policy, None, &source).unwrap_err();
        assert!(err.downcast_ref::<CollaboratorError>().is_none());
    }

    #[test]
    fn fetch_failure_is_a_collaborator_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let policy = write(temp.path(), "policy.json", r#"{"allowlist": ["*"]}"#);
        let source = FileChangeSetSource::new(temp.path().join("missing.json"));

        let err = run_gate("42", &policy, None, &source).unwrap_err();
        assert!(err.downcast_ref::<CollaboratorError>().is_some());
    }
}
