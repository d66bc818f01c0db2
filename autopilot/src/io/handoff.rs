//! Task handoff artifact (`NEXT_TASK.md`).
//!
//! The artifact is a pure function of the task, so writing it again for the
//! same task produces identical bytes.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::catalog::Task;

const NEXT_TASK_TEMPLATE: &str = include_str!("templates/next_task.md");

/// Render the handoff document for `task`.
pub fn render_handoff(task: &Task) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("next_task", NEXT_TASK_TEMPLATE)
        .context("load next_task template")?;
    let template = env.get_template("next_task")?;
    let mut rendered = template
        .render(context! {
            task => task,
            prompt => task.prompt.trim(),
        })
        .with_context(|| format!("render handoff for task {}", task.id))?;
    rendered.push('\n');
    Ok(rendered)
}

/// Render and write the handoff document for `task` to `path`.
pub fn write_handoff(path: &Path, task: &Task) -> Result<()> {
    let rendered = render_handoff(task)?;
    debug!(path = %path.display(), task = %task.id, bytes = rendered.len(), "writing handoff");
    fs::write(path, rendered).with_context(|| format!("write handoff {}", path.display()))
}
