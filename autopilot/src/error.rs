//! Errors raised when a collaborator cannot produce an answer.
//!
//! These are kept apart from "the collaborator answered no": a health step
//! that could not be spawned is not an unhealthy snapshot, and a change-set
//! that could not be fetched is neither accepted nor rejected.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// A health step could not be run at all.
    #[error("health step `{step}` could not run: {detail}")]
    HealthCheck { step: String, detail: String },

    /// Change-set data could not be fetched or parsed.
    #[error("could not fetch {what} for change {change_id}: {detail}")]
    ChangeSet {
        what: &'static str,
        change_id: String,
        detail: String,
    },
}
