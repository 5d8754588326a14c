// autopatch-core/src/remediation/pipeline.rs
//! The per-candidate remediation state machine and the batch runner.
//!
//! One attempt walks `Init -> BranchCreated -> Patched -> Committed ->
//! Pushed -> PrCreated -> (AutoMergeRequested) -> Done`. Two guards can
//! short-circuit to a skipped outcome: a remote branch that already exists
//! for the same fix (idempotence across reprocessing), and a patch that
//! produced no working-tree changes (the manifest already satisfied the
//! fixed version). Any failure after branch creation rolls the working copy
//! back to the default branch and force-deletes the feature branch before
//! the failure is reported, because the working copy is a shared mutable
//! resource reused by the next candidate.

use super::manifest::apply_dependency_fix;
use super::{
    branch_name, PipelineState, PullRequestSpec, RemediationOutcome, RemediationRecord, RepoHost,
};
use crate::triage::AutoFixCandidate;
use log::{info, warn};
use std::fmt;
use std::path::Path;

/// Drives remediation attempts against working copies under a common
/// repository directory.
pub struct RemediationPipeline<'a> {
    host: &'a dyn RepoHost,
    default_branch: String,
}

impl<'a> RemediationPipeline<'a> {
    pub fn new(host: &'a dyn RepoHost, default_branch: impl Into<String>) -> Self {
        Self {
            host,
            default_branch: default_branch.into(),
        }
    }

    /// Processes every candidate in order, one working copy per repository
    /// under `repos_dir`. Candidates for the same repository are handled
    /// strictly sequentially in the order triage emitted them; one
    /// candidate's failure never prevents the next from being attempted.
    pub fn run(&self, repos_dir: &Path, candidates: &[AutoFixCandidate]) -> Vec<RemediationRecord> {
        let mut records = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let workdir = repos_dir.join(&candidate.finding.repo);
            records.push(self.remediate(&workdir, candidate));
        }
        records
    }

    /// Runs the state machine for a single candidate and reports its
    /// terminal outcome. Never panics past the candidate; every failure
    /// path ends in a `Failed` record carrying the state it occurred in.
    pub fn remediate(&self, workdir: &Path, candidate: &AutoFixCandidate) -> RemediationRecord {
        let finding = &candidate.finding;
        let package = if finding.subject().is_empty() {
            "unknown"
        } else {
            finding.subject()
        };
        let branch = branch_name(package, &finding.cve);
        info!(
            "remediating {} in {} ({}) on branch {}",
            package, finding.repo, finding.cve, branch
        );

        let record = |outcome: RemediationOutcome| RemediationRecord {
            package: package.to_string(),
            repo: finding.repo.clone(),
            outcome,
        };
        let failed = |state: PipelineState, reason: &dyn fmt::Display| {
            warn!(
                "remediation of {} in {} failed in state {}: {}",
                package,
                finding.repo,
                state.as_str(),
                reason
            );
            record(RemediationOutcome::Failed {
                failure_state: state,
                failure_reason: reason.to_string(),
            })
        };

        // Init -> BranchCreated, guarded by the in-flight check.
        match self.host.remote_branch_exists(workdir, &branch) {
            Ok(true) => {
                info!("branch {branch} already exists on the remote, skipping");
                return record(RemediationOutcome::Skipped {
                    reason: "already in flight".to_string(),
                });
            }
            Ok(false) => {}
            Err(e) => return failed(PipelineState::Init, &e),
        }
        if let Err(e) = self.host.create_branch(workdir, &branch) {
            return failed(PipelineState::Init, &e);
        }

        // BranchCreated -> Patched
        let fixed_version = finding.preferred_fix_version().unwrap_or("");
        if let Err(e) = apply_dependency_fix(workdir, &finding.ecosystem, package, fixed_version) {
            self.rollback(workdir, &branch, false);
            return failed(PipelineState::BranchCreated, &e);
        }

        // Patched -> Committed, guarded by the no-change check.
        match self.host.has_changes(workdir) {
            Ok(false) => {
                info!("manifests already satisfy {fixed_version}, skipping");
                self.rollback(workdir, &branch, false);
                return record(RemediationOutcome::Skipped {
                    reason: "no changes needed".to_string(),
                });
            }
            Ok(true) => {}
            Err(e) => {
                self.rollback(workdir, &branch, false);
                return failed(PipelineState::Patched, &e);
            }
        }
        if let Err(e) = self
            .host
            .commit_all(workdir, &commit_message(candidate, package, fixed_version))
        {
            self.rollback(workdir, &branch, false);
            return failed(PipelineState::Patched, &e);
        }

        // Committed -> Pushed
        if let Err(e) = self.host.push_branch(workdir, &branch) {
            self.rollback(workdir, &branch, false);
            return failed(PipelineState::Committed, &e);
        }

        // Pushed -> PrCreated
        let spec = PullRequestSpec {
            branch: branch.clone(),
            base: self.default_branch.clone(),
            title: format!("security: fix {} in {}", finding.cve, package),
            body: pull_request_body(candidate, package, fixed_version),
        };
        let pr = match self.host.open_pull_request(workdir, &spec) {
            Ok(pr) => pr,
            Err(e) => {
                self.rollback(workdir, &branch, true);
                return failed(PipelineState::Pushed, &e);
            }
        };
        info!("opened {}", pr.url);

        // PrCreated -> AutoMergeRequested -> Done. Denied auto-merge does
        // not revert the PR; it remains valid for manual merge.
        if candidate.auto_merge_safe {
            match self.host.enable_auto_merge(workdir, &pr) {
                Ok(()) => info!("auto-merge enabled for {} (merges after CI passes)", pr.url),
                Err(e) => warn!("could not enable auto-merge for {}: {e}", pr.url),
            }
        }

        // Leave the working copy on the default branch for the next
        // candidate. The PR is already open, so this too is a soft spot.
        if let Err(e) = self.host.checkout(workdir, &self.default_branch) {
            warn!(
                "could not return {} to {}: {e}",
                workdir.display(),
                self.default_branch
            );
        }

        record(RemediationOutcome::PrCreated { pr_reference: pr })
    }

    /// Compensating action for any failure after branch creation: restore
    /// the default branch, then force-delete the feature branch locally
    /// and, where one was pushed, on the remote. Best effort; a rollback
    /// step that itself fails is logged and must not mask the original
    /// failure.
    fn rollback(&self, workdir: &Path, branch: &str, delete_remote: bool) {
        if let Err(e) = self.host.checkout(workdir, &self.default_branch) {
            warn!("rollback: could not check out {}: {e}", self.default_branch);
        }
        if let Err(e) = self.host.delete_local_branch(workdir, branch) {
            warn!("rollback: could not delete local branch {branch}: {e}");
        }
        if delete_remote {
            if let Err(e) = self.host.delete_remote_branch(workdir, branch) {
                warn!("rollback: could not delete remote branch {branch}: {e}");
            }
        }
    }
}

fn commit_message(candidate: &AutoFixCandidate, package: &str, fixed_version: &str) -> String {
    let finding = &candidate.finding;
    let advisory = if finding.advisory.is_empty() {
        "Security vulnerability detected."
    } else {
        finding.advisory.as_str()
    };
    format!(
        "security: update {package} to fix {cve}\n\
         \n\
         Severity: {severity}\n\
         Current version: {current}\n\
         Fixed version: {fixed}\n\
         \n\
         {advisory}\n\
         \n\
         Automatically generated by autopatch\n\
         Auto-merge safe: {safe}\n",
        cve = finding.cve,
        severity = finding.severity,
        current = finding.version.as_deref().unwrap_or("unknown"),
        fixed = fixed_version,
        safe = candidate.auto_merge_safe,
    )
}

fn pull_request_body(candidate: &AutoFixCandidate, package: &str, fixed_version: &str) -> String {
    let finding = &candidate.finding;
    let current = finding.version.as_deref().unwrap_or("unknown");
    let advisory = if finding.advisory.is_empty() {
        "No advisory available."
    } else {
        finding.advisory.as_str()
    };
    let merge_status = if candidate.auto_merge_safe {
        "Safe to auto-merge: patch/security update with high confidence."
    } else {
        "Manual review required before merging."
    };
    format!(
        "## Security Update\n\
         \n\
         **CVE**: {cve}\n\
         **Severity**: {severity}\n\
         **Package**: `{package}`\n\
         **Current Version**: {current}\n\
         **Fixed Version**: {fixed_version}\n\
         \n\
         ### Advisory\n\
         \n\
         {advisory}\n\
         \n\
         ### Changes\n\
         \n\
         - Updated `{package}` from `{current}` to `{fixed_version}`\n\
         \n\
         ### Auto-Merge Status\n\
         \n\
         {merge_status}\n\
         \n\
         Fix confidence: {confidence}/10\n",
        cve = finding.cve,
        severity = finding.severity,
        confidence = candidate.fix_confidence,
    )
}
