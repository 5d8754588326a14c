// autopatch-core/src/merge.rs
//! Reconciliation of overlapping scanner reports.
//!
//! Multiple scanners (pip-audit, safety, npm audit, osv-scanner, ...) can
//! report the same vulnerability. The [`Merger`] groups raw findings by
//! [`fingerprint`](crate::fingerprint::fingerprint) in first-seen order and
//! collapses each group into a single [`CanonicalFinding`], preferring
//! attributed data (`tool`, `advisory`) from the most reliable scanner while
//! unioning the fixed-version sets and recording every scanner that saw the
//! issue.
//!
//! Merging is pure and idempotent: re-merging an already merged set yields
//! the same canonical records and zero additional duplicates.

use crate::finding::CanonicalFinding;
use crate::fingerprint::{fingerprint_parts, Fingerprint};
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// Reliability ranking for scanners; higher outranks lower, unknown tools
/// rank 0. Injected into the [`Merger`] at construction time so tests and
/// deployments can substitute their own ordering.
#[derive(Debug, Clone)]
pub struct ScannerRankings {
    ranks: HashMap<String, u32>,
}

impl ScannerRankings {
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            ranks: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn rank(&self, tool: &str) -> u32 {
        self.ranks.get(tool).copied().unwrap_or(0)
    }
}

impl Default for ScannerRankings {
    fn default() -> Self {
        Self::new([
            ("pip-audit", 10),
            ("npm-audit", 9),
            ("osv-scanner", 8),
            ("safety", 7),
            ("bandit", 6),
            ("semgrep", 5),
            ("dependency-check", 4),
            ("PSScriptAnalyzer", 3),
        ])
    }
}

/// Output of one merge pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    /// One record per distinct fingerprint, in first-seen order.
    pub canonical: Vec<CanonicalFinding>,
    /// Group members beyond the first, summed across all groups.
    pub duplicates: usize,
}

/// Groups findings by fingerprint and reconciles each group.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    rankings: ScannerRankings,
}

impl Merger {
    pub fn new(rankings: ScannerRankings) -> Self {
        Self { rankings }
    }

    /// Merges a batch of findings into canonical records.
    ///
    /// Accepts raw findings as well as already-canonical records (the latter
    /// pass through unchanged when their fingerprint is unique, which is what
    /// makes the operation idempotent).
    pub fn merge<I, F>(&self, findings: I) -> MergeResult
    where
        I: IntoIterator<Item = F>,
        F: Into<CanonicalFinding>,
    {
        let mut order: Vec<Fingerprint> = Vec::new();
        let mut groups: HashMap<Fingerprint, (CanonicalFinding, u32)> = HashMap::new();
        let mut duplicates = 0usize;

        for finding in findings {
            let finding: CanonicalFinding = finding.into();
            let key = fingerprint_parts(
                &finding.repo,
                finding.subject(),
                &finding.cve,
                finding.file.as_deref().unwrap_or(""),
            );

            match groups.get_mut(&key) {
                None => {
                    let rank = self.rankings.rank(&finding.tool);
                    order.push(key.clone());
                    groups.insert(key, (finding, rank));
                }
                Some((existing, existing_rank)) => {
                    duplicates += 1;
                    debug!(
                        "duplicate report of {} in {} from {} (already seen via {})",
                        existing.cve, existing.repo, finding.tool, existing.tool
                    );

                    // A strictly more reliable scanner wins the attributed
                    // fields; ties keep the first-seen member.
                    let rank = self.rankings.rank(&finding.tool);
                    if rank > *existing_rank {
                        existing.tool = finding.tool.clone();
                        existing.advisory = finding.advisory.clone();
                        *existing_rank = rank;
                    }

                    // Fixed versions are unioned regardless of rank.
                    if !existing.fixed_in.is_empty() || !finding.fixed_in.is_empty() {
                        let union: BTreeSet<String> = existing
                            .fixed_in
                            .drain(..)
                            .chain(finding.fixed_in.iter().cloned())
                            .collect();
                        existing.fixed_in = union.into_iter().collect();
                    }

                    for scanner in &finding.detected_by {
                        if !existing.detected_by.contains(scanner) {
                            existing.detected_by.push(scanner.clone());
                        }
                    }
                }
            }
        }

        let canonical = order
            .into_iter()
            .filter_map(|key| groups.remove(&key))
            .map(|(finding, _)| finding)
            .collect();

        MergeResult {
            canonical,
            duplicates,
        }
    }
}
