// autopatch-core/src/triage.rs
//! Risk triage: severity bucketing, auto-fix confidence, and auto-merge
//! safety verdicts for canonical findings.
//!
//! Everything here is pure and deterministic. A finding is mechanically
//! fixable only when it names an upgradable dependency with a known fixed
//! version; the confidence score then weighs how far the version jump is,
//! whether the reporting scanner is trusted, and how severe the issue is.
//! Only high-confidence fixes, and among those only elevated severities or
//! pure patch bumps, are judged safe to merge without human review.

use crate::finding::{CanonicalFinding, Severity};
use crate::metadata::{findings_metadata, FindingsMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence floor below which a fix is never auto-merged.
pub const AUTO_MERGE_CONFIDENCE_FLOOR: u8 = 7;

/// Classification of the jump between the installed and the fixed version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionDelta {
    /// Major and minor components match; only the patch level moves.
    Patch,
    /// Major component matches; the minor level moves.
    Minor,
    /// Anything else, including versions that cannot be parsed.
    Major,
}

/// Parses the leading numeric components of a version string.
///
/// Pre-release and build suffixes per segment are tolerated (`1.2.3-rc1`
/// reads as `1.2.3`). Returns `None` when fewer than `needed` segments are
/// present or a segment is not numeric.
fn numeric_components(version: &str, needed: usize) -> Option<Vec<u64>> {
    let version = version.trim();
    if version.is_empty() {
        return None;
    }
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() < needed {
        return None;
    }
    parts
        .iter()
        .take(needed)
        .map(|part| {
            part.split(['-', '+'])
                .next()
                .and_then(|p| p.parse::<u64>().ok())
        })
        .collect()
}

/// True when the update only moves the patch component.
///
/// Malformed inputs never raise; they simply classify as not-a-patch.
pub fn is_patch_update(current: &str, fixed: &str) -> bool {
    match (numeric_components(current, 3), numeric_components(fixed, 3)) {
        (Some(cur), Some(fix)) => cur[0] == fix[0] && cur[1] == fix[1],
        _ => false,
    }
}

/// True when the update stays within the same major version.
pub fn is_minor_update(current: &str, fixed: &str) -> bool {
    match (numeric_components(current, 2), numeric_components(fixed, 2)) {
        (Some(cur), Some(fix)) => cur[0] == fix[0],
        _ => false,
    }
}

pub fn classify_update(current: &str, fixed: &str) -> VersionDelta {
    if is_patch_update(current, fixed) {
        VersionDelta::Patch
    } else if is_minor_update(current, fixed) {
        VersionDelta::Minor
    } else {
        VersionDelta::Major
    }
}

/// Tunable triage policy. The trusted-tool list mirrors the first-party
/// scanners the fleet runs itself; substitute it in tests or deployments
/// that trust a different set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriagePolicy {
    pub trusted_tools: Vec<String>,
}

impl TriagePolicy {
    pub fn is_trusted(&self, tool: &str) -> bool {
        self.trusted_tools.iter().any(|t| t == tool)
    }
}

impl Default for TriagePolicy {
    fn default() -> Self {
        Self {
            trusted_tools: vec![
                "pip-audit".to_string(),
                "safety".to_string(),
                "npm-audit".to_string(),
            ],
        }
    }
}

/// A canonical finding the triage engine judged mechanically fixable,
/// together with its verdicts. Consumed only by the remediation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoFixCandidate {
    #[serde(flatten)]
    pub finding: CanonicalFinding,
    /// 0-10, clamped.
    pub fix_confidence: u8,
    pub auto_merge_safe: bool,
}

/// Findings partitioned by severity. Every finding lands in exactly one
/// bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriagedBuckets {
    pub critical: Vec<CanonicalFinding>,
    pub high: Vec<CanonicalFinding>,
    pub medium: Vec<CanonicalFinding>,
    pub low: Vec<CanonicalFinding>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageSummary {
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub auto_fixable_count: usize,
    pub auto_merge_safe_count: usize,
}

/// The triage result object handed to downstream reporting and to the
/// remediation pipeline, serialized as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageReport {
    pub analysis_time: DateTime<Utc>,
    pub total_findings: usize,
    pub triaged: TriagedBuckets,
    pub auto_fixes: Vec<AutoFixCandidate>,
    pub summary: TriageSummary,
    pub recommendations: Vec<String>,
    /// Aggregate batch metadata for downstream reporting.
    #[serde(default)]
    pub metadata: FindingsMetadata,
}

/// Buckets findings, scores fixable ones, and derives the summary.
#[derive(Debug, Clone, Default)]
pub struct TriageEngine {
    policy: TriagePolicy,
}

impl TriageEngine {
    pub fn new(policy: TriagePolicy) -> Self {
        Self { policy }
    }

    pub fn triage(&self, findings: Vec<CanonicalFinding>) -> TriageReport {
        let total_findings = findings.len();
        let metadata = findings_metadata(&findings);
        let mut triaged = TriagedBuckets::default();
        let mut auto_fixes = Vec::new();

        for finding in findings {
            if self.is_auto_fixable(&finding) {
                let fix_confidence = self.fix_confidence(&finding);
                let auto_merge_safe = self.is_safe_to_auto_merge(&finding, fix_confidence);
                auto_fixes.push(AutoFixCandidate {
                    finding: finding.clone(),
                    fix_confidence,
                    auto_merge_safe,
                });
            }

            match finding.severity {
                Severity::Critical => triaged.critical.push(finding),
                Severity::High => triaged.high.push(finding),
                Severity::Medium => triaged.medium.push(finding),
                Severity::Low => triaged.low.push(finding),
            }
        }

        let summary = TriageSummary {
            critical_count: triaged.critical.len(),
            high_count: triaged.high.len(),
            medium_count: triaged.medium.len(),
            low_count: triaged.low.len(),
            auto_fixable_count: auto_fixes.len(),
            auto_merge_safe_count: auto_fixes.iter().filter(|f| f.auto_merge_safe).count(),
        };

        TriageReport {
            analysis_time: Utc::now(),
            total_findings,
            triaged,
            auto_fixes,
            summary,
            recommendations: recommendations(&summary),
            metadata,
        }
    }

    /// Dependency findings with a known fixed version can be bumped
    /// mechanically; rule-based findings never can.
    fn is_auto_fixable(&self, finding: &CanonicalFinding) -> bool {
        finding.ecosystem.is_dependency() && finding.preferred_fix_version().is_some()
    }

    fn fix_confidence(&self, finding: &CanonicalFinding) -> u8 {
        let mut confidence: i32 = 5;

        let current = finding.version.as_deref().unwrap_or("");
        let fixed = finding.preferred_fix_version().unwrap_or("");
        confidence += match classify_update(current, fixed) {
            VersionDelta::Patch => 3,
            VersionDelta::Minor => 1,
            VersionDelta::Major => -2,
        };

        if self.policy.is_trusted(&finding.tool) {
            confidence += 2;
        }
        if finding.severity.is_elevated() {
            confidence += 1;
        }

        confidence.clamp(0, 10) as u8
    }

    fn is_safe_to_auto_merge(&self, finding: &CanonicalFinding, confidence: u8) -> bool {
        if confidence < AUTO_MERGE_CONFIDENCE_FLOOR {
            return false;
        }
        if finding.severity.is_elevated() {
            return true;
        }
        let current = finding.version.as_deref().unwrap_or("");
        let fixed = finding.preferred_fix_version().unwrap_or("");
        is_patch_update(current, fixed)
    }
}

/// Action recommendations derived purely from the summary counts.
pub fn recommendations(summary: &TriageSummary) -> Vec<String> {
    let mut recs = Vec::new();

    if summary.critical_count > 0 {
        recs.push(format!(
            "URGENT: {} CRITICAL vulnerabilities found. Immediate action required.",
            summary.critical_count
        ));
    }
    if summary.high_count > 0 {
        recs.push(format!(
            "{} HIGH severity issues. Address within 24 hours.",
            summary.high_count
        ));
    }
    if summary.auto_merge_safe_count > 0 {
        recs.push(format!(
            "{} fixes can be safely auto-merged.",
            summary.auto_merge_safe_count
        ));
    }
    if summary.auto_fixable_count > summary.auto_merge_safe_count {
        recs.push(format!(
            "{} fixes available but require manual review.",
            summary.auto_fixable_count - summary.auto_merge_safe_count
        ));
    }

    recs
}
