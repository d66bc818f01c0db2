//! Deterministic, pure decision logic.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod catalog;
pub mod pattern;
pub mod policy;
pub mod progression;
