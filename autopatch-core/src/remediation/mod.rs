// autopatch-core/src/remediation/mod.rs
//! The automated remediation pipeline.
//!
//! For every auto-fix candidate the pipeline drives a small state machine
//! against the target repository's working copy: create an isolated branch,
//! apply the ecosystem-specific dependency bump, commit, push, open a pull
//! request, and optionally request auto-merge. Every external call is
//! modeled as an explicit success/typed-failure value so the transition
//! table is total, and any failure between patching and PR creation rolls
//! the working copy back to the default branch before the outcome is
//! reported.
//!
//! The seam to the outside world is the [`RepoHost`] trait; the production
//! implementation in [`git`] shells out to the `git` and `gh` command-line
//! tools with per-call-class timeouts.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub mod git;
pub mod manifest;
pub mod pipeline;

pub use git::GitCli;
pub use pipeline::RemediationPipeline;

/// Branch names are truncated to this many characters.
pub const MAX_BRANCH_LEN: usize = 100;

/// Deterministic feature-branch name for one candidate.
///
/// Slashes anywhere in the formatted name (including the `security/`
/// prefix) are folded to dashes, so the result is always a single-level
/// ref that doubles as the pipeline's in-flight marker.
pub fn branch_name(package: &str, vuln_id: &str) -> String {
    format!("security/auto-patch-{package}-{vuln_id}")
        .replace('/', "-")
        .chars()
        .take(MAX_BRANCH_LEN)
        .collect()
}

/// States of the per-candidate pipeline, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    BranchCreated,
    Patched,
    Committed,
    Pushed,
    PrCreated,
    AutoMergeRequested,
    Done,
    Failed,
}

impl PipelineState {
    pub const fn as_str(self) -> &'static str {
        match self {
            PipelineState::Init => "init",
            PipelineState::BranchCreated => "branch_created",
            PipelineState::Patched => "patched",
            PipelineState::Committed => "committed",
            PipelineState::Pushed => "pushed",
            PipelineState::PrCreated => "pr_created",
            PipelineState::AutoMergeRequested => "auto_merge_requested",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }
}

/// Reference to an opened pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: String,
    pub url: String,
}

/// Everything the host needs to open a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSpec {
    pub branch: String,
    pub base: String,
    pub title: String,
    pub body: String,
}

/// Typed failure from an external version-control or PR-host command.
///
/// A timeout is treated identically to a command failure by the pipeline;
/// both trigger the same rollback path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("failed to spawn {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with status {exit_code}: {stderr}")]
    CommandFailed {
        program: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("unexpected output from {program}: {message}")]
    UnexpectedOutput { program: String, message: String },
}

/// Typed failure applying an ecosystem-specific dependency bump.
///
/// These are expected per-candidate outcomes (stale manifests, ecosystems
/// nobody automated yet), not exceptional conditions.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("no fixed version available for {package}")]
    MissingFixedVersion { package: String },

    #[error("could not find {package} in any dependency manifest")]
    PackageNotFound { package: String },

    #[error("dependency updates are not automated for {ecosystem}")]
    UnsupportedEcosystem { ecosystem: String },

    #[error("package name {package} cannot be matched against manifests")]
    InvalidPackageName { package: String },

    #[error("failed to parse {path}: {source}")]
    ManifestParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Seam between the pipeline and the repository host.
///
/// Every method takes the working copy as an explicit parameter; nothing
/// here mutates process-wide state such as the current directory.
pub trait RepoHost {
    /// Whether `branch` already exists on the remote. Used as the
    /// idempotence guard before any write happens.
    fn remote_branch_exists(&self, workdir: &Path, branch: &str) -> Result<bool, HostError>;

    /// Creates `branch` off the currently checked-out branch and switches
    /// the working copy to it.
    fn create_branch(&self, workdir: &Path, branch: &str) -> Result<(), HostError>;

    fn checkout(&self, workdir: &Path, branch: &str) -> Result<(), HostError>;

    fn delete_local_branch(&self, workdir: &Path, branch: &str) -> Result<(), HostError>;

    fn delete_remote_branch(&self, workdir: &Path, branch: &str) -> Result<(), HostError>;

    /// Whether the working tree has uncommitted changes.
    fn has_changes(&self, workdir: &Path) -> Result<bool, HostError>;

    /// Stages everything and commits with `message`.
    fn commit_all(&self, workdir: &Path, message: &str) -> Result<(), HostError>;

    fn push_branch(&self, workdir: &Path, branch: &str) -> Result<(), HostError>;

    fn open_pull_request(
        &self,
        workdir: &Path,
        spec: &PullRequestSpec,
    ) -> Result<PullRequestRef, HostError>;

    /// Requests merge-on-green-CI for an opened pull request. Failures here
    /// are soft: the PR stays valid for manual merge.
    fn enable_auto_merge(&self, workdir: &Path, pr: &PullRequestRef) -> Result<(), HostError>;
}

/// Terminal outcome of one remediation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RemediationOutcome {
    PrCreated { pr_reference: PullRequestRef },
    Skipped { reason: String },
    Failed {
        failure_state: PipelineState,
        failure_reason: String,
    },
}

/// One per-candidate record, serialized for downstream reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationRecord {
    pub package: String,
    pub repo: String,
    #[serde(flatten)]
    pub outcome: RemediationOutcome,
}
