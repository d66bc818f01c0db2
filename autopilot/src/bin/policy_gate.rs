//! `policy-gate`: accept or reject a pull request's change-set.
//!
//! Exits `0` when the change complies, and with a distinct code per rule
//! otherwise (see `autopilot::exit_codes`).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use autopilot::exit_codes;
use autopilot::gate::{GateReport, run_gate};
use autopilot::io::changeset::{ChangeSetSource, FileChangeSetSource, GhChangeSetSource};
use autopilot::logging;

#[derive(Parser)]
#[command(
    name = "policy-gate",
    version,
    about = "Check a pull request's touched paths and size against a policy"
)]
struct Cli {
    /// Pull request number.
    change_id: u64,

    /// Policy document (JSON, or YAML by extension).
    policy: PathBuf,

    /// Override the policy's `max_additions`.
    #[arg(long, env = "POLICY_MAX_ADDITIONS")]
    max_additions: Option<u64>,

    /// Read paths and additions from a JSON file instead of the GitHub API.
    #[arg(long)]
    changes_file: Option<PathBuf>,

    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    logging::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                exit_codes::INVALID
            } else {
                exit_codes::OK
            };
            let _ = err.print();
            return exit_code(code);
        }
    };
    match run(&cli) {
        Ok(report) => exit_code(exit_codes::for_decision(&report.decision)),
        Err(err) => {
            eprintln!("policy-gate: {err:#}");
            exit_code(exit_codes::for_error(&err))
        }
    }
}

fn run(cli: &Cli) -> Result<GateReport> {
    let source: Box<dyn ChangeSetSource> = match &cli.changes_file {
        Some(path) => Box::new(FileChangeSetSource::new(path)),
        None => {
            let cwd = std::env::current_dir().context("resolve working directory")?;
            Box::new(GhChangeSetSource::new(cwd))
        }
    };
    let report = run_gate(
        &cli.change_id.to_string(),
        &cli.policy,
        cli.max_additions,
        source.as_ref(),
    )?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("serialize gate report")?;
        println!("{json}");
    } else {
        println!("{}", report.decision);
    }
    Ok(report)
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
