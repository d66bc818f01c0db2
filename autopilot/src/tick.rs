//! Orchestration for a single progression tick.
//!
//! Ordering matters: the advanced state is written (atomically) before the
//! handoff artifact, and both exist on disk before anything is published. A
//! crash at any point therefore either leaves the state untouched or leaves a
//! persisted state that was never published. The next tick notices the
//! latter and publishes the current task again before it may advance.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::catalog::Task;
use crate::core::catalog::Catalog;
use crate::core::progression::{
    Candidate, ProgressionError, TickDecision, decide, select_candidate,
};
use crate::io::handoff::write_handoff;
use crate::io::health::HealthCheck;
use crate::io::init::{AutopilotPaths, NEXT_TASK_FILE, STATE_FILE};
use crate::io::playbook::load_catalog;
use crate::io::publish::Publisher;
use crate::io::state_store::{load_state, write_state};

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// `task` is now current; state, artifact, and commit were produced.
    Advanced(Task),
    /// An earlier advance to `task` was persisted but never published; it
    /// was published again and nothing advanced.
    Reemitted(Task),
    /// Snapshot unhealthy; `candidate` was not handed out.
    Held { candidate: String },
    /// The current task is the last one in the playbook.
    AllComplete,
}

/// Snapshot of progression for `autopilot status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub current: Option<String>,
    /// `None` once the playbook is finished.
    pub next: Option<String>,
    pub total: usize,
}

/// Commit message for the commit recording an advance to `task_id`.
pub fn commit_message(task_id: &str) -> String {
    format!("autopilot: NEXT_TASK -> {task_id}")
}

/// Files every advance publishes, relative to the repository root.
const PUBLISHED_FILES: [&str; 2] = [STATE_FILE, NEXT_TASK_FILE];

/// Run one tick against the repository at `root`.
///
/// If the current task was persisted but its publish never completed, it is
/// published again and the tick ends there. Otherwise the health oracle is
/// only consulted when there is a task to hand out.
/// A state that names an unknown task fails with
/// [`ProgressionError`] before
/// any health check, write, or publish.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn run_tick<H: HealthCheck, P: Publisher>(
    root: &Path,
    health: &H,
    publisher: &P,
) -> Result<TickOutcome> {
    let paths = AutopilotPaths::new(root);
    let catalog = load_catalog(&paths.playbook_path)?;
    let state = load_state(&paths.state_path)?;
    let files = PUBLISHED_FILES.map(Path::new);

    let candidate = select_candidate(&catalog, &state)?;
    if let Some(current) = state.current_task.as_deref()
        && !publisher
            .is_published(&files)
            .context("check previous publish")?
    {
        let task = current_task(&catalog, current)?.clone();
        warn!(task = %task.id, "previous advance was not published, publishing it again");
        write_handoff(&paths.next_task_path, &task)?;
        publisher
            .publish(&files, &commit_message(&task.id))
            .with_context(|| format!("republish {}", task.id))?;
        return Ok(TickOutcome::Reemitted(task));
    }

    if candidate == Candidate::AllComplete {
        info!(current = ?state.current_task, "all tasks complete");
        return Ok(TickOutcome::AllComplete);
    }

    let healthy = health.is_healthy().context("run health check")?;

    match decide(&catalog, &state, healthy)? {
        TickDecision::AllComplete => Ok(TickOutcome::AllComplete),
        TickDecision::Hold { candidate } => {
            warn!(candidate = %candidate, "snapshot not healthy, not advancing");
            Ok(TickOutcome::Held { candidate })
        }
        TickDecision::Advance { task, state: next } => {
            write_state(&paths.state_path, &next)?;
            info!(task = %task.id, "progression state advanced");
            write_handoff(&paths.next_task_path, &task)?;
            publisher
                .publish(&files, &commit_message(&task.id))
                .with_context(|| format!("publish advance to {}", task.id))?;
            Ok(TickOutcome::Advanced(task))
        }
    }
}

fn current_task<'a>(catalog: &'a Catalog, id: &str) -> Result<&'a Task, ProgressionError> {
    catalog
        .position(id)
        .and_then(|index| catalog.get(index))
        .ok_or_else(|| ProgressionError::UnknownTask { id: id.to_string() })
}

/// Report current and next task without consulting health.
pub fn inspect(root: &Path) -> Result<StatusReport> {
    let paths = AutopilotPaths::new(root);
    let catalog = load_catalog(&paths.playbook_path)?;
    let state = load_state(&paths.state_path)?;
    let next = match select_candidate(&catalog, &state)? {
        Candidate::Next(task) => Some(task.id.clone()),
        Candidate::AllComplete => None,
    };
    Ok(StatusReport {
        current: state.current_task,
        next,
        total: catalog.len(),
    })
}
