//! `autopilot`: advance the task playbook by one step when the repository is
//! healthy.
//!
//! Reads `.autopilot/playbook.yaml` and `.autopilot/state.json`, runs the
//! configured health steps, and on success records the next task in the state
//! file and `NEXT_TASK.md`, commits both, and pushes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use autopilot::exit_codes;
use autopilot::io::config::load_config;
use autopilot::io::git::Git;
use autopilot::io::health::CommandHealthCheck;
use autopilot::io::init::{AutopilotPaths, InitOptions, init_autopilot};
use autopilot::io::publish::GitPublisher;
use autopilot::logging;
use autopilot::tick::{TickOutcome, inspect, run_tick};

#[derive(Parser)]
#[command(
    name = "autopilot",
    version,
    about = "Advance the task playbook one step when the repository is healthy"
)]
struct Cli {
    /// Repository root containing `.autopilot/`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Branch to push to (defaults to `default_branch` from config).
    #[arg(long, env = "GITHUB_REF_NAME")]
    branch: Option<String>,

    /// Commit but do not push.
    #[arg(long)]
    no_push: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.autopilot/` with a sample playbook, default config, and empty state.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the current task and the one a healthy tick would hand out next.
    Status,
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
    match run(cli) {
        Ok(()) => exit_code(exit_codes::OK),
        Err(err) => {
            eprintln!("autopilot: {err:#}");
            exit_code(exit_codes::for_error(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Init { force }) => cmd_init(&cli.root, force),
        Some(Command::Status) => cmd_status(&cli.root),
        None => cmd_tick(&cli.root, cli.branch, cli.no_push),
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<()> {
    let paths = init_autopilot(root, &InitOptions { force })?;
    println!("autopilot: initialized {}", paths.autopilot_dir.display());
    Ok(())
}

fn cmd_status(root: &Path) -> Result<()> {
    let report = inspect(root)?;
    println!("current: {}", report.current.as_deref().unwrap_or("(none)"));
    match report.next {
        Some(next) => println!("next: {next}"),
        None => println!("next: (all {} tasks complete)", report.total),
    }
    Ok(())
}

fn cmd_tick(root: &Path, branch: Option<String>, no_push: bool) -> Result<()> {
    let paths = AutopilotPaths::new(root);
    let cfg = load_config(&paths.config_path)?;
    let branch = branch
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| cfg.default_branch.clone());
    let health = CommandHealthCheck::from_config(root, &cfg, &paths.health_log_path);
    let publisher = GitPublisher::new(
        Git::new(root),
        cfg.remote.clone(),
        branch,
        cfg.push && !no_push,
    );

    match run_tick(root, &health, &publisher)? {
        TickOutcome::Advanced(task) => {
            println!("autopilot: advanced to {} – {}", task.id, task.title);
        }
        TickOutcome::Reemitted(task) => {
            println!("autopilot: republished {} – {}", task.id, task.title);
        }
        TickOutcome::Held { candidate } => {
            println!("autopilot: CI not green; not advancing to {candidate}");
        }
        TickOutcome::AllComplete => println!("autopilot: all tasks complete"),
    }
    Ok(())
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
