//! Guarded autopilot for stepwise, task-driven code changes.
//!
//! Two independent decision engines live here:
//!
//! - **Task progression** ([`tick`]): advances through an ordered playbook one
//!   task per invocation, but only when the repository snapshot is healthy.
//! - **Policy gate** ([`gate`]): accepts or rejects a proposed change-set based
//!   on path allow/deny patterns and a size ceiling.
//!
//! The architecture keeps the runner's split:
//!
//! - **[`core`]**: Pure, deterministic decisions (candidate selection, advance
//!   or hold, policy evaluation, path matching). No I/O.
//! - **[`io`]**: Collaborators with side effects (state files, playbook, health
//!   commands, git, change-set fetching).
//!
//! [`tick`] and [`gate`] coordinate the two to implement the CLI entry points.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod gate;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tick;
