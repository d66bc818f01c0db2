//! I/O collaborators for the autopilot commands.

pub mod changeset;
pub mod config;
pub mod git;
pub mod handoff;
pub mod health;
pub mod init;
pub mod playbook;
pub mod policy_store;
pub mod process;
pub mod publish;
pub mod state_store;
