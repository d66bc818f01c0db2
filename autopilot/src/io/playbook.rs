//! Playbook loading (`.autopilot/playbook.yaml`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::catalog::{Catalog, Task};

/// On-disk playbook shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playbook {
    pub tasks: Vec<Task>,
}

/// Load and validate the task catalog.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read playbook {}", path.display()))?;
    let playbook: Playbook = serde_yaml::from_str(&contents)
        .with_context(|| format!("parse playbook {}", path.display()))?;
    let catalog = Catalog::new(playbook.tasks)
        .with_context(|| format!("validate playbook {}", path.display()))?;
    debug!(path = %path.display(), tasks = catalog.len(), "playbook loaded");
    Ok(catalog)
}

/// Write a playbook as YAML.
pub fn write_playbook(path: &Path, playbook: &Playbook) -> Result<()> {
    let buf = serde_yaml::to_string(playbook).context("serialize playbook yaml")?;
    fs::write(path, buf).with_context(|| format!("write playbook {}", path.display()))
}
