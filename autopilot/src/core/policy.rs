//! Change-set policy evaluation.
//!
//! Rules run in a fixed order and the first failing rule decides:
//!
//! 1. denylist (absolute, wins over any allow match)
//! 2. allowlist (every path must match at least one pattern)
//! 3. size ceiling (inclusive)
//!
//! Within a failing rule every violation is collected so reports are
//! actionable without re-running the gate.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::pattern::{PathMatcher, PatternError, validate_pattern};

/// Ceiling used when neither an override nor the policy sets one.
pub const FALLBACK_MAX_ADDITIONS: u64 = 20_000;

/// Allow/deny rules and size ceiling for change-sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub allowlist: Vec<String>,
    #[serde(default)]
    pub denylist: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_additions: Option<u64>,
}

impl PolicyDocument {
    /// Reject patterns the matcher cannot parse.
    pub fn validate(&self) -> Result<(), PatternError> {
        for pattern in self.denylist.iter().chain(&self.allowlist) {
            validate_pattern(pattern)?;
        }
        Ok(())
    }
}

/// Paths touched by a proposed change and the lines it adds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub touched_paths: Vec<String>,
    pub total_additions: u64,
}

/// A touched path that matched a deny pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenyHit {
    pub path: String,
    pub pattern: String,
}

/// Where the effective ceiling came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CeilingSource {
    Override,
    Policy,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ceiling {
    pub value: u64,
    pub source: CeilingSource,
}

/// Resolve the size ceiling: override, then policy, then the fallback.
pub fn effective_ceiling(policy: &PolicyDocument, override_max: Option<u64>) -> Ceiling {
    match (override_max, policy.max_additions) {
        (Some(value), _) => Ceiling {
            value,
            source: CeilingSource::Override,
        },
        (None, Some(value)) => Ceiling {
            value,
            source: CeilingSource::Policy,
        },
        (None, None) => Ceiling {
            value: FALLBACK_MAX_ADDITIONS,
            source: CeilingSource::Fallback,
        },
    }
}

/// Gate verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    Accepted,
    /// Hits in input path order, then deny pattern order.
    Denied { hits: Vec<DenyHit> },
    /// Offending paths in input order; the first is the primary offender.
    NotAllowlisted { paths: Vec<String> },
    TooLarge { additions: u64, ceiling: u64 },
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Name of the rule that rejected the change, if any.
    pub fn rule(&self) -> Option<&'static str> {
        match self {
            Self::Accepted => None,
            Self::Denied { .. } => Some("denylist"),
            Self::NotAllowlisted { .. } => Some("allowlist"),
            Self::TooLarge { .. } => Some("max_additions"),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "policy OK"),
            Self::Denied { hits } => {
                write!(f, "denied paths touched:")?;
                for hit in hits {
                    write!(f, " {} (matches '{}')", hit.path, hit.pattern)?;
                }
                Ok(())
            }
            Self::NotAllowlisted { paths } => {
                write!(f, "path not allowlisted: {}", paths.join(", "))
            }
            Self::TooLarge { additions, ceiling } => {
                write!(f, "diff too large: {additions} > {ceiling}")
            }
        }
    }
}

/// Evaluate `changeset` against `policy`.
pub fn evaluate<M: PathMatcher>(
    changeset: &ChangeSet,
    policy: &PolicyDocument,
    override_max: Option<u64>,
    matcher: &M,
) -> Decision {
    let hits: Vec<DenyHit> = changeset
        .touched_paths
        .iter()
        .flat_map(|path| {
            policy
                .denylist
                .iter()
                .filter(move |pattern| matcher.matches(path, pattern))
                .map(move |pattern| DenyHit {
                    path: path.clone(),
                    pattern: pattern.clone(),
                })
        })
        .collect();
    if !hits.is_empty() {
        return Decision::Denied { hits };
    }

    let unlisted: Vec<String> = changeset
        .touched_paths
        .iter()
        .filter(|path| {
            !policy
                .allowlist
                .iter()
                .any(|pattern| matcher.matches(path, pattern))
        })
        .cloned()
        .collect();
    if !unlisted.is_empty() {
        return Decision::NotAllowlisted { paths: unlisted };
    }

    let ceiling = effective_ceiling(policy, override_max).value;
    if changeset.total_additions > ceiling {
        return Decision::TooLarge {
            additions: changeset.total_additions,
            ceiling,
        };
    }

    Decision::Accepted
}
