//! Autopilot configuration stored under `.autopilot/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use super::health::HealthStep;

/// Autopilot configuration (TOML).
///
/// Intended to be edited by humans. Missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Remote the tick pushes to.
    pub remote: String,

    /// Branch pushed to when neither `--branch` nor `GITHUB_REF_NAME` is set.
    pub default_branch: String,

    /// Push after committing the advanced state.
    pub push: bool,

    pub health: HealthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HealthConfig {
    /// Wall-clock budget per health step in seconds.
    pub timeout_secs: u64,

    /// Truncate each step's captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Steps to run instead of the built-in Rust/npm detection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<HealthStep>>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30 * 60,
            output_limit_bytes: 100_000,
            steps: None,
        }
    }
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            default_branch: "main".to_string(),
            push: true,
            health: HealthConfig::default(),
        }
    }
}

impl AutopilotConfig {
    pub fn validate(&self) -> Result<()> {
        if self.remote.trim().is_empty() {
            return Err(anyhow!("remote must be non-empty"));
        }
        if self.default_branch.trim().is_empty() {
            return Err(anyhow!("default_branch must be non-empty"));
        }
        if self.health.timeout_secs == 0 {
            return Err(anyhow!("health.timeout_secs must be > 0"));
        }
        if self.health.output_limit_bytes == 0 {
            return Err(anyhow!("health.output_limit_bytes must be > 0"));
        }
        for step in self.health.steps.iter().flatten() {
            if step.command.is_empty() || step.command[0].trim().is_empty() {
                return Err(anyhow!(
                    "health step '{}': command must be a non-empty array",
                    step.name
                ));
            }
        }
        Ok(())
    }

    /// Steps the health check runs: configured ones, or the built-in set.
    pub fn health_steps(&self) -> Vec<HealthStep> {
        self.health
            .steps
            .clone()
            .unwrap_or_else(HealthStep::defaults)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AutopilotConfig::default()`.
pub fn load_config(path: &Path) -> Result<AutopilotConfig> {
    if !path.exists() {
        let cfg = AutopilotConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AutopilotConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AutopilotConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AutopilotConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "default_branch = \"trunk\"\n\n[[health.steps]]\nname = \"ci\"\ncommand = [\"just\", \"ci\"]\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.default_branch, "trunk");
        assert_eq!(cfg.remote, "origin");
        assert_eq!(cfg.health.timeout_secs, 30 * 60);
        let steps = cfg.health_steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].command, vec!["just".to_string(), "ci".to_string()]);
        assert_eq!(steps[0].requires, None);
    }

    #[test]
    fn rejects_empty_step_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[[health.steps]]\nname = \"noop\"\ncommand = []\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("non-empty array"));
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let mut cfg = AutopilotConfig::default();
        cfg.push = false;
        cfg.health.steps = Some(HealthStep::defaults());
        write_config(&path, &cfg).expect("write");
        assert_eq!(load_config(&path).expect("load"), cfg);
    }
}
