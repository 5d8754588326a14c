// autopatch-core/src/metadata.rs
//! Aggregate metadata over a batch of canonical findings, attached to the
//! triage output for downstream reporting and notification plumbing.

use crate::finding::CanonicalFinding;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MOST_COMMON_CVE_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingsMetadata {
    pub total_count: usize,
    pub by_severity: HashMap<String, usize>,
    pub by_type: HashMap<String, usize>,
    pub by_repo: HashMap<String, usize>,
    pub scanners_used: Vec<String>,
    /// Up to ten (cve, occurrence-count) pairs, most frequent first.
    pub most_common_cves: Vec<(String, usize)>,
}

/// Derives reporting metadata from a finding batch. Pure and
/// order-independent apart from the first-seen ordering of `scanners_used`.
pub fn findings_metadata(findings: &[CanonicalFinding]) -> FindingsMetadata {
    let mut by_severity: HashMap<String, usize> = HashMap::new();
    let mut by_type: HashMap<String, usize> = HashMap::new();
    let mut by_repo: HashMap<String, usize> = HashMap::new();
    let mut scanners_used: Vec<String> = Vec::new();
    let mut cve_counts: HashMap<String, usize> = HashMap::new();

    for finding in findings {
        *by_severity
            .entry(finding.severity.as_str().to_string())
            .or_insert(0) += 1;
        *by_type.entry(finding.ecosystem.tag().to_string()).or_insert(0) += 1;
        *by_repo.entry(finding.repo.clone()).or_insert(0) += 1;

        for scanner in &finding.detected_by {
            if !scanners_used.contains(scanner) {
                scanners_used.push(scanner.clone());
            }
        }

        if !finding.cve.is_empty() && finding.cve != "N/A" {
            *cve_counts.entry(finding.cve.clone()).or_insert(0) += 1;
        }
    }

    let mut most_common_cves: Vec<(String, usize)> = cve_counts.into_iter().collect();
    most_common_cves.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    most_common_cves.truncate(MOST_COMMON_CVE_LIMIT);

    FindingsMetadata {
        total_count: findings.len(),
        by_severity,
        by_type,
        by_repo,
        scanners_used,
        most_common_cves,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Ecosystem, Severity};

    fn canonical(repo: &str, cve: &str, severity: Severity, tools: &[&str]) -> CanonicalFinding {
        CanonicalFinding {
            repo: repo.to_string(),
            ecosystem: Ecosystem::Python,
            package: Some("requests".to_string()),
            version: None,
            cve: cve.to_string(),
            severity,
            advisory: String::new(),
            fixed_in: vec![],
            tool: tools[0].to_string(),
            file: None,
            detected_by: tools.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn counts_and_scanner_set() {
        let findings = vec![
            canonical("app1", "CVE-1", Severity::High, &["pip-audit", "safety"]),
            canonical("app1", "CVE-1", Severity::High, &["pip-audit"]),
            canonical("app2", "CVE-2", Severity::Low, &["safety"]),
        ];
        let meta = findings_metadata(&findings);
        assert_eq!(meta.total_count, 3);
        assert_eq!(meta.by_severity["HIGH"], 2);
        assert_eq!(meta.by_repo["app1"], 2);
        assert_eq!(meta.scanners_used, vec!["pip-audit", "safety"]);
        assert_eq!(meta.most_common_cves[0], ("CVE-1".to_string(), 2));
    }

    #[test]
    fn na_cves_are_not_counted() {
        let findings = vec![canonical("app1", "N/A", Severity::Medium, &["semgrep"])];
        let meta = findings_metadata(&findings);
        assert!(meta.most_common_cves.is_empty());
    }
}
