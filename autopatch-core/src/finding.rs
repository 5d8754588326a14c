//! Core data model for scanner findings.
//!
//! This module defines the interchange representation of a single scanner
//! observation (`RawFinding`) and the merged, per-vulnerability record
//! produced by reconciliation (`CanonicalFinding`), along with the severity
//! and ecosystem vocabularies shared by every stage of the pipeline.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Normalized severity of a finding.
///
/// Scanners disagree on spelling (`HIGH`, `high`, `moderate`, `info`); all
/// inputs are folded into these four levels at deserialization time.
/// Anything unrecognized or missing becomes [`Severity::Medium`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }

    /// Folds a raw scanner severity string into a normalized level.
    ///
    /// `moderate` and `info` come from npm audit and OSV feeds respectively;
    /// everything else unrecognized defaults to `Medium`.
    pub fn from_scanner(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" | "moderate" => Severity::Medium,
            "low" | "info" => Severity::Low,
            _ => Severity::Medium,
        }
    }

    /// True for the two levels that warrant expedited handling.
    pub const fn is_elevated(self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Medium
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Severity::from_scanner(s))
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Severity::from_scanner(&raw))
    }
}

/// The ecosystem a finding belongs to, which determines how (and whether)
/// it can be patched mechanically.
///
/// Dependency ecosystems carry their own manifest-rewrite behavior in the
/// remediation module; rule-based findings (static-analysis output keyed by
/// a rule id rather than a package) are never auto-fixable and keep their
/// original type tag for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ecosystem {
    Python,
    Npm,
    Jvm,
    Rule(String),
}

impl Ecosystem {
    /// The interchange tag, e.g. `python_dependency`.
    pub fn tag(&self) -> &str {
        match self {
            Ecosystem::Python => "python_dependency",
            Ecosystem::Npm => "npm_dependency",
            Ecosystem::Jvm => "jvm_dependency",
            Ecosystem::Rule(tag) => tag,
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "python_dependency" => Ecosystem::Python,
            "npm_dependency" => Ecosystem::Npm,
            "jvm_dependency" => Ecosystem::Jvm,
            other => Ecosystem::Rule(other.to_string()),
        }
    }

    /// True for ecosystems whose findings name an upgradable package.
    pub fn is_dependency(&self) -> bool {
        !matches!(self, Ecosystem::Rule(_))
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for Ecosystem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for Ecosystem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Err(de::Error::custom("finding `type` must not be empty"));
        }
        Ok(Ecosystem::from_tag(&raw))
    }
}

fn default_vuln_id() -> String {
    "N/A".to_string()
}

/// One observation from one scanner, immutable once deserialized.
///
/// Field names follow the scanner-adapter interchange format: `repo`,
/// `type`, `package`, `version`, `cve`, `severity`, `advisory`, `fixed_in`,
/// `tool`, `file`. `package` holds the package name for dependency findings
/// and the rule id for rule-based findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFinding {
    pub repo: String,
    #[serde(rename = "type")]
    pub ecosystem: Ecosystem,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_vuln_id")]
    pub cve: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub advisory: String,
    #[serde(default)]
    pub fixed_in: Vec<String>,
    pub tool: String,
    #[serde(default)]
    pub file: Option<String>,
}

/// A findings batch as the scanner aggregator emits it: an object wrapping
/// the findings array alongside scan metadata we do not consume.
#[derive(Debug, Deserialize)]
struct FindingsBatch {
    #[serde(default)]
    findings: Vec<RawFinding>,
}

impl RawFinding {
    /// Package name or rule id, empty when the scanner supplied neither.
    pub fn subject(&self) -> &str {
        self.package.as_deref().unwrap_or("")
    }

    /// Parses a findings batch from JSON text.
    ///
    /// Accepts both a bare array of findings and the aggregator's wrapper
    /// object with a `findings` key.
    pub fn parse_batch(text: &str) -> Result<Vec<RawFinding>, crate::errors::AutopatchError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if value.is_array() {
            Ok(serde_json::from_value(value)?)
        } else {
            let batch: FindingsBatch = serde_json::from_value(value)?;
            Ok(batch.findings)
        }
    }
}

/// The merged record representing one real-world vulnerability after
/// reconciliation. Produced once per scan batch and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFinding {
    pub repo: String,
    #[serde(rename = "type")]
    pub ecosystem: Ecosystem,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_vuln_id")]
    pub cve: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub advisory: String,
    /// Union of every fixed-version set reported across the group.
    #[serde(default)]
    pub fixed_in: Vec<String>,
    /// Scanner whose report won the reliability comparison.
    pub tool: String,
    #[serde(default)]
    pub file: Option<String>,
    /// Every scanner that reported this fingerprint, first-seen order.
    pub detected_by: Vec<String>,
}

impl CanonicalFinding {
    /// Seeds a canonical record from the first member of a fingerprint group.
    pub fn from_raw(raw: RawFinding) -> Self {
        let detected_by = vec![raw.tool.clone()];
        Self {
            repo: raw.repo,
            ecosystem: raw.ecosystem,
            package: raw.package,
            version: raw.version,
            cve: raw.cve,
            severity: raw.severity,
            advisory: raw.advisory,
            fixed_in: raw.fixed_in,
            tool: raw.tool,
            file: raw.file,
            detected_by,
        }
    }

    pub fn subject(&self) -> &str {
        self.package.as_deref().unwrap_or("")
    }

    /// Identity hash shared with the raw representation.
    pub fn fingerprint(&self) -> crate::fingerprint::Fingerprint {
        crate::fingerprint::fingerprint_parts(
            &self.repo,
            self.subject(),
            &self.cve,
            self.file.as_deref().unwrap_or(""),
        )
    }

    /// First entry of the merged fixed-version set, if any.
    pub fn preferred_fix_version(&self) -> Option<&str> {
        self.fixed_in
            .iter()
            .map(String::as_str)
            .find(|v| !v.trim().is_empty())
    }
}

impl From<RawFinding> for CanonicalFinding {
    fn from(raw: RawFinding) -> Self {
        CanonicalFinding::from_raw(raw)
    }
}
