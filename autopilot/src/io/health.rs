//! Health oracle: is the current snapshot buildable and green?

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::config::AutopilotConfig;
use super::process::run_command_with_timeout;
use crate::error::CollaboratorError;

/// One command in the health check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStep {
    pub name: String,
    pub command: Vec<String>,
    /// Only run when this path (relative to the repo root) exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
}

impl HealthStep {
    fn new(name: &str, command: &[&str], requires: &str) -> Self {
        Self {
            name: name.to_string(),
            command: command.iter().map(|arg| arg.to_string()).collect(),
            requires: Some(requires.to_string()),
        }
    }

    /// Rust workspace checks when `Cargo.toml` exists, npm checks when
    /// `package.json` exists.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("toolchain", &["rustup", "show"], "Cargo.toml"),
            Self::new("fmt", &["cargo", "fmt", "--all", "--check"], "Cargo.toml"),
            Self::new(
                "clippy",
                &[
                    "cargo",
                    "clippy",
                    "--all-targets",
                    "--all-features",
                    "--",
                    "-D",
                    "warnings",
                ],
                "Cargo.toml",
            ),
            Self::new(
                "test",
                &["cargo", "test", "--workspace", "--all-features", "--quiet"],
                "Cargo.toml",
            ),
            Self::new("npm-ci", &["npm", "ci"], "package.json"),
            Self::new(
                "npm-build",
                &["npm", "run", "build", "--if-present"],
                "package.json",
            ),
            Self::new(
                "npm-test",
                &["npm", "test", "--silent", "--if-present"],
                "package.json",
            ),
        ]
    }
}

/// Boolean health oracle.
///
/// `Ok(false)` means the checks ran and something failed. `Err` means the
/// verdict could not be determined at all.
pub trait HealthCheck {
    fn is_healthy(&self) -> Result<bool>;
}

/// Runs health steps in order; the first failing step makes the snapshot
/// unhealthy and the remaining steps are skipped.
#[derive(Debug, Clone)]
pub struct CommandHealthCheck {
    pub workdir: PathBuf,
    pub steps: Vec<HealthStep>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
    pub log_path: PathBuf,
}

impl CommandHealthCheck {
    pub fn from_config(workdir: &Path, cfg: &AutopilotConfig, log_path: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
            steps: cfg.health_steps(),
            timeout: Duration::from_secs(cfg.health.timeout_secs),
            output_limit_bytes: cfg.health.output_limit_bytes,
            log_path: log_path.to_path_buf(),
        }
    }

    fn run_steps(&self, log: &mut String) -> Result<bool> {
        for step in &self.steps {
            if let Some(required) = &step.requires
                && !self.workdir.join(required).exists()
            {
                debug!(step = %step.name, required = %required, "skipping health step");
                let _ = writeln!(log, "=== {} (skipped: {required} missing) ===", step.name);
                continue;
            }

            let Some((program, args)) = step.command.split_first() else {
                return Err(CollaboratorError::HealthCheck {
                    step: step.name.clone(),
                    detail: "command is empty".to_string(),
                }
                .into());
            };
            let rendered = step.command.join(" ");
            info!(step = %step.name, "+ {rendered}");
            let mut cmd = Command::new(program);
            cmd.args(args).current_dir(&self.workdir);
            let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
                .map_err(|err| CollaboratorError::HealthCheck {
                    step: step.name.clone(),
                    detail: format!("{err:#}"),
                })?;

            let _ = writeln!(log, "=== {} ({rendered}) ===", step.name);
            log.push_str(&output.stdout_lossy());
            log.push_str(&output.stderr_lossy());
            if output.truncated > 0 {
                let _ = writeln!(log, "[truncated {} bytes]", output.truncated);
            }

            if !output.succeeded() {
                warn!(
                    step = %step.name,
                    exit_code = ?output.status.code(),
                    timed_out = output.timed_out,
                    "health step failed"
                );
                let _ = writeln!(log, "=== {} failed ===", step.name);
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl HealthCheck for CommandHealthCheck {
    #[instrument(skip_all, fields(steps = self.steps.len()))]
    fn is_healthy(&self) -> Result<bool> {
        let mut log = String::new();
        let verdict = self.run_steps(&mut log);
        if let Err(err) = write_health_log(&self.log_path, &log) {
            warn!(error = %format!("{err:#}"), "could not write health log");
        }
        verdict
    }
}

fn write_health_log(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create health log dir {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write health log {}", path.display()))
}
