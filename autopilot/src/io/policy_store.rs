//! Policy document loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::policy::PolicyDocument;

/// Load a policy document and validate its patterns.
///
/// `.yaml`/`.yml` files are parsed as YAML; anything else as JSON.
pub fn load_policy(path: &Path) -> Result<PolicyDocument> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read policy {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    let policy: PolicyDocument = if is_yaml {
        serde_yaml::from_str(&contents).with_context(|| format!("parse policy {}", path.display()))?
    } else {
        serde_json::from_str(&contents).with_context(|| format!("parse policy {}", path.display()))?
    };
    policy
        .validate()
        .with_context(|| format!("validate policy {}", path.display()))?;
    debug!(
        path = %path.display(),
        allow = policy.allowlist.len(),
        deny = policy.denylist.len(),
        max_additions = ?policy.max_additions,
        "policy loaded"
    );
    Ok(policy)
}
