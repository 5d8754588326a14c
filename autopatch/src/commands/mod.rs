// autopatch/src/commands/mod.rs
//! Command implementations for the autopatch CLI.

use anyhow::{Context, Result};
use autopatch_core::PolicyConfig;
use std::path::Path;

pub mod patch;
pub mod triage;

/// Loads the policy configuration, falling back to the built-in defaults
/// when no file is given.
pub(crate) fn load_policy(config: Option<&Path>) -> Result<PolicyConfig> {
    match config {
        Some(path) => PolicyConfig::load_from_file(path)
            .with_context(|| format!("Failed to load policy from {}", path.display())),
        None => Ok(PolicyConfig::default()),
    }
}
