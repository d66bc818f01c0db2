//! Ordered task catalog (the playbook).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single playbook entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub prompt: String,
}

/// Violations of catalog invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("playbook has no tasks")]
    Empty,
    #[error("task #{index} has an empty id")]
    EmptyId { index: usize },
    #[error("duplicate task id '{id}'")]
    DuplicateId { id: String },
}

/// Validated, ordered list of tasks.
///
/// Order is the only valid progression order. Ids are non-empty and unique,
/// so `position` is unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    tasks: Vec<Task>,
}

impl Catalog {
    pub fn new(tasks: Vec<Task>) -> Result<Self, CatalogError> {
        if tasks.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for (index, task) in tasks.iter().enumerate() {
            if task.id.trim().is_empty() {
                return Err(CatalogError::EmptyId { index });
            }
            if !seen.insert(task.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    id: task.id.clone(),
                });
            }
        }
        Ok(Self { tasks })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Index of the task with `id`, if present.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::task;

    #[test]
    fn rejects_empty_catalog() {
        assert_eq!(Catalog::new(Vec::new()), Err(CatalogError::Empty));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Catalog::new(vec![task("a"), task("b"), task("a")]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateId {
                id: "a".to_string()
            }
        );
    }

    #[test]
    fn rejects_blank_ids() {
        let err = Catalog::new(vec![task("a"), task("  ")]).unwrap_err();
        assert_eq!(err, CatalogError::EmptyId { index: 1 });
    }

    #[test]
    fn position_follows_catalog_order() {
        let catalog = Catalog::new(vec![task("a"), task("b"), task("c")]).expect("catalog");
        assert_eq!(catalog.position("c"), Some(2));
        assert_eq!(catalog.position("missing"), None);
    }
}
