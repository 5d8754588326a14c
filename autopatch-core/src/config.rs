//! Policy configuration for `autopatch-core`.
//!
//! This module defines the tunable knobs of the pipeline: scanner
//! reliability rankings, the trusted-tool list, the default branch name,
//! and the two external-command timeout classes. It handles
//! deserialization of YAML configuration and provides utilities for
//! loading and validating these configs. Every field has a default that
//! matches the built-in policy, so a missing file or an empty document is
//! a valid configuration.

use crate::errors::AutopatchError;
use crate::merge::ScannerRankings;
use crate::triage::TriagePolicy;
use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

fn default_rankings() -> HashMap<String, u32> {
    [
        ("pip-audit", 10),
        ("npm-audit", 9),
        ("osv-scanner", 8),
        ("safety", 7),
        ("bandit", 6),
        ("semgrep", 5),
        ("dependency-check", 4),
        ("PSScriptAnalyzer", 3),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_trusted_tools() -> Vec<String> {
    TriagePolicy::default().trusted_tools
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_git_timeout_secs() -> u64 {
    30
}

fn default_network_timeout_secs() -> u64 {
    120
}

/// Top-level policy configuration, loadable from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Scanner reliability ranking; higher outranks lower.
    pub scanner_rankings: HashMap<String, u32>,
    /// Scanners whose reports earn a confidence bonus during triage.
    pub trusted_tools: Vec<String>,
    /// Branch pull requests are opened against.
    pub default_branch: String,
    /// Timeout for local git plumbing commands, in seconds.
    pub git_timeout_secs: u64,
    /// Timeout for network operations (push, PR creation), in seconds.
    pub network_timeout_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            scanner_rankings: default_rankings(),
            trusted_tools: default_trusted_tools(),
            default_branch: default_branch(),
            git_timeout_secs: default_git_timeout_secs(),
            network_timeout_secs: default_network_timeout_secs(),
        }
    }
}

impl PolicyConfig {
    /// Loads policy configuration from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading policy configuration from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file {}", path.display()))?;
        let config: PolicyConfig = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse policy file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AutopatchError> {
        if self.default_branch.trim().is_empty() {
            return Err(AutopatchError::PolicyError(
                "default_branch must not be empty".to_string(),
            ));
        }
        if self.git_timeout_secs == 0 || self.network_timeout_secs == 0 {
            return Err(AutopatchError::PolicyError(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.trusted_tools.iter().any(|t| t.trim().is_empty()) {
            return Err(AutopatchError::PolicyError(
                "trusted_tools must not contain empty names".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rankings(&self) -> ScannerRankings {
        ScannerRankings::new(self.scanner_rankings.clone())
    }

    pub fn triage_policy(&self) -> TriagePolicy {
        TriagePolicy {
            trusted_tools: self.trusted_tools.clone(),
        }
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }
}
