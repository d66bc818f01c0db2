//! Progression state storage (`.autopilot/state.json`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::progression::ProgressionState;

/// Load progression state from disk.
///
/// The file must exist; it is created by `autopilot init` or by hand.
pub fn load_state(path: &Path) -> Result<ProgressionState> {
    debug!(path = %path.display(), "loading progression state");
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read progression state {}", path.display()))?;
    let state: ProgressionState = serde_json::from_str(&contents)
        .with_context(|| format!("parse progression state {}", path.display()))?;
    debug!(current_task = ?state.current_task, "progression state loaded");
    Ok(state)
}

/// Atomically write progression state to disk (temp file + rename).
///
/// The rename is the durability point: once this returns, later steps may
/// assume the new `current_task` is what a retry will read.
pub fn write_state(path: &Path, state: &ProgressionState) -> Result<()> {
    debug!(path = %path.display(), current_task = ?state.current_task, "writing progression state");
    let mut buf = serde_json::to_string_pretty(state).context("serialize progression state")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace state {}", path.display()))?;
    Ok(())
}
