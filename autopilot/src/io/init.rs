//! Well-known paths and `.autopilot/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::config::{AutopilotConfig, write_config};
use super::state_store::write_state;
use crate::core::progression::ProgressionState;

/// State file, relative to the repository root.
pub const STATE_FILE: &str = ".autopilot/state.json";
/// Playbook, relative to the repository root.
pub const PLAYBOOK_FILE: &str = ".autopilot/playbook.yaml";
/// Config, relative to the repository root.
pub const CONFIG_FILE: &str = ".autopilot/config.toml";
/// Rendered handoff artifact, relative to the repository root.
pub const NEXT_TASK_FILE: &str = "NEXT_TASK.md";

const HEALTH_LOG_FILE: &str = ".autopilot/health.log";

const AUTOPILOT_GITIGNORE: &str = "health.log\n*.tmp\n";

const PLAYBOOK_PLACEHOLDER: &str = r#"# Ordered task list. Tasks are handed out one at a time, in this order,
# each only after the previous one leaves the repository healthy.
tasks:
  - id: bootstrap
    title: Bootstrap the project
    prompt: |
      Describe the first change here.
"#;

/// All canonical autopilot paths for a repository root.
#[derive(Debug, Clone)]
pub struct AutopilotPaths {
    pub root: PathBuf,
    pub autopilot_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub state_path: PathBuf,
    pub playbook_path: PathBuf,
    pub config_path: PathBuf,
    pub health_log_path: PathBuf,
    pub next_task_path: PathBuf,
}

impl AutopilotPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let autopilot_dir = root.join(".autopilot");
        Self {
            root: root.clone(),
            autopilot_dir: autopilot_dir.clone(),
            gitignore_path: autopilot_dir.join(".gitignore"),
            state_path: root.join(STATE_FILE),
            playbook_path: root.join(PLAYBOOK_FILE),
            config_path: root.join(CONFIG_FILE),
            health_log_path: root.join(HEALTH_LOG_FILE),
            next_task_path: root.join(NEXT_TASK_FILE),
        }
    }
}

/// Options for `init_autopilot`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing autopilot-owned files.
    pub force: bool,
}

/// Create `.autopilot/` scaffolding in `root` with the sentinel state.
///
/// Fails if `.autopilot/` already exists unless `options.force` is set.
pub fn init_autopilot(root: &Path, options: &InitOptions) -> Result<AutopilotPaths> {
    let paths = AutopilotPaths::new(root);
    if paths.autopilot_dir.exists() && !paths.autopilot_dir.is_dir() {
        return Err(anyhow!(
            "autopilot init: .autopilot exists but is not a directory"
        ));
    }
    if paths.autopilot_dir.exists() && !options.force {
        return Err(anyhow!(
            "autopilot init: .autopilot already exists (use --force to overwrite)"
        ));
    }

    fs::create_dir_all(&paths.autopilot_dir)
        .with_context(|| format!("create directory {}", paths.autopilot_dir.display()))?;
    write_file(&paths.gitignore_path, AUTOPILOT_GITIGNORE)?;
    write_file(&paths.playbook_path, PLAYBOOK_PLACEHOLDER)?;
    write_config(&paths.config_path, &AutopilotConfig::default())?;
    write_state(&paths.state_path, &ProgressionState::default())?;

    Ok(paths)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
