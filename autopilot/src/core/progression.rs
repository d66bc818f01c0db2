//! Task progression state machine.
//!
//! A tick either advances to the task after `current_task`, holds because the
//! snapshot is unhealthy, or reports that the playbook is finished. The
//! decision is a pure function of `(catalog, state, healthy)`; persisting the
//! returned state is the caller's job.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::catalog::{Catalog, Task};

/// Persisted progression record (`.autopilot/state.json`).
///
/// `current_task: None` is the "no task handed out yet" sentinel. Keys other
/// than `current_task` are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub current_task: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProgressionState {
    /// Copy of this state with `current_task` set to `id`.
    pub fn with_current(&self, id: &str) -> Self {
        Self {
            current_task: Some(id.to_string()),
            extra: self.extra.clone(),
        }
    }
}

/// State and catalog disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
    #[error("progression state names task '{id}' which is not in the playbook")]
    UnknownTask { id: String },
}

/// The task a healthy tick would hand out next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate<'a> {
    Next(&'a Task),
    AllComplete,
}

/// Outcome of a tick decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickDecision {
    /// Hand out `task`; `state` is the record to persist before anything else.
    Advance { task: Task, state: ProgressionState },
    /// Snapshot unhealthy; state must stay as it is.
    Hold { candidate: String },
    /// The current task is the last one.
    AllComplete,
}

/// Pick the task after `state.current_task` in catalog order.
pub fn select_candidate<'a>(
    catalog: &'a Catalog,
    state: &ProgressionState,
) -> Result<Candidate<'a>, ProgressionError> {
    let next_index = match state.current_task.as_deref() {
        None => 0,
        Some(id) => {
            let index = catalog
                .position(id)
                .ok_or_else(|| ProgressionError::UnknownTask { id: id.to_string() })?;
            index + 1
        }
    };
    Ok(match catalog.get(next_index) {
        Some(task) => Candidate::Next(task),
        None => Candidate::AllComplete,
    })
}

/// Decide whether to advance, hold, or stop.
///
/// Completion and drift are reported regardless of `healthy`; health only
/// matters once there is a candidate to hand out.
pub fn decide(
    catalog: &Catalog,
    state: &ProgressionState,
    healthy: bool,
) -> Result<TickDecision, ProgressionError> {
    let task = match select_candidate(catalog, state)? {
        Candidate::AllComplete => return Ok(TickDecision::AllComplete),
        Candidate::Next(task) => task,
    };
    if !healthy {
        return Ok(TickDecision::Hold {
            candidate: task.id.clone(),
        });
    }
    Ok(TickDecision::Advance {
        task: task.clone(),
        state: state.with_current(&task.id),
    })
}
