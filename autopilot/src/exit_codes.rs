//! Stable exit codes for the `autopilot` and `policy-gate` binaries.

use crate::core::policy::Decision;
use crate::core::progression::ProgressionError;
use crate::error::CollaboratorError;

/// Command succeeded (advanced, held, all tasks complete, or change accepted).
pub const OK: i32 = 0;
/// Usage error, unreadable or invalid input files, or any other failure.
pub const INVALID: i32 = 1;
/// `policy-gate`: a touched path matched a denylist pattern.
pub const DENIED: i32 = 2;
/// `policy-gate`: a touched path matched no allowlist pattern.
pub const NOT_ALLOWLISTED: i32 = 3;
/// `policy-gate`: total additions exceed the effective ceiling.
pub const TOO_LARGE: i32 = 4;
/// A collaborator could not produce an answer (health step or change-set fetch).
pub const FETCH_FAILED: i32 = 5;
/// `autopilot`: progression state names a task missing from the playbook.
pub const CONFIG_DRIFT: i32 = 6;

/// Map a gate decision to its exit code.
pub fn for_decision(decision: &Decision) -> i32 {
    match decision {
        Decision::Accepted => OK,
        Decision::Denied { .. } => DENIED,
        Decision::NotAllowlisted { .. } => NOT_ALLOWLISTED,
        Decision::TooLarge { .. } => TOO_LARGE,
    }
}

/// Map a failed command to its exit code by inspecting the error chain.
pub fn for_error(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if cause.downcast_ref::<ProgressionError>().is_some() {
            return CONFIG_DRIFT;
        }
        if cause.downcast_ref::<CollaboratorError>().is_some() {
            return FETCH_FAILED;
        }
    }
    INVALID
}
