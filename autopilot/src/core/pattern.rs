//! Path matching for policy patterns.
//!
//! # Dialect
//!
//! Patterns use the `glob` crate's syntax with [`MATCH_OPTIONS`], which
//! behaves like shell `fnmatch`:
//!
//! - `*` matches any run of characters, **including** `/` (`src/*` matches
//!   `src/a/b.rs`).
//! - `?` matches exactly one character; `[abc]`, `[a-z]` and `[!x]` are
//!   character classes.
//! - Any run of `*` is the same as a single `*`, wherever it appears:
//!   `**.md` matches `a/b.md`, and `**/*.rs` needs at least one `/`.
//! - Matching is case-sensitive and a leading `.` needs no literal match.
//! - A pattern without metacharacters matches only the identical path.

use std::borrow::Cow;

use glob::{MatchOptions, Pattern};
use thiserror::Error;

/// Options every policy pattern is matched with.
pub const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A pattern that the glob dialect cannot parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path pattern '{pattern}': {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

/// Pluggable path matching capability.
pub trait PathMatcher {
    fn matches(&self, path: &str, pattern: &str) -> bool;
}

/// [`PathMatcher`] backed by `glob::Pattern` with [`MATCH_OPTIONS`].
///
/// An unparsable pattern matches nothing; validate patterns up front with
/// [`validate_pattern`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobMatcher;

impl PathMatcher for GlobMatcher {
    fn matches(&self, path: &str, pattern: &str) -> bool {
        compile(pattern)
            .map(|compiled| compiled.matches_with(path, MATCH_OPTIONS))
            .unwrap_or(false)
    }
}

/// Check that `pattern` parses in the glob dialect.
pub fn validate_pattern(pattern: &str) -> Result<(), PatternError> {
    if pattern.is_empty() {
        return Err(PatternError {
            pattern: String::new(),
            message: "pattern is empty".to_string(),
        });
    }
    compile(pattern).map(|_| ()).map_err(|err| PatternError {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}

fn compile(pattern: &str) -> Result<Pattern, glob::PatternError> {
    Pattern::new(&collapse_stars(pattern))
}

/// Collapse each run of `*` into one `*`.
fn collapse_stars(pattern: &str) -> Cow<'_, str> {
    if !pattern.contains("**") {
        return Cow::Borrowed(pattern);
    }
    let mut collapsed = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        if ch == '*' && collapsed.ends_with('*') {
            continue;
        }
        collapsed.push(ch);
    }
    Cow::Owned(collapsed)
}
