// autopatch-core/src/lib.rs
//! # AutoPatch Core Library
//!
//! `autopatch-core` provides the fundamental, host-independent logic for
//! reconciling vulnerability findings from multiple scanners and for driving
//! automated remediation. It defines the core data structures for findings,
//! implements the deduplication and risk-triage engines, and runs the
//! patch-pull-request state machine against an externally supplied
//! working copy.
//!
//! The reconciliation and triage stages are pure and stateless; only the
//! remediation pipeline carries side effects, and those are funneled through
//! a single seam (the [`RepoHost`] trait) so every external call is an
//! explicit success-or-typed-failure value.
//!
//! ## Modules
//!
//! * `finding`: Defines `RawFinding`, `CanonicalFinding`, and the severity
//!   and ecosystem vocabularies.
//! * `fingerprint`: Derives the stable identity that collapses duplicate
//!   reports of the same vulnerability.
//! * `merge`: Reconciles fingerprint groups into canonical findings using
//!   injectable scanner-reliability rankings.
//! * `triage`: Buckets findings by severity and scores auto-fix confidence
//!   and auto-merge safety.
//! * `metadata`: Aggregate batch metadata for downstream reporting.
//! * `remediation`: The branch/patch/commit/push/PR state machine, its
//!   `git`/`gh` backend, and the ecosystem manifest patchers.
//! * `config`: YAML policy configuration (rankings, trusted tools,
//!   timeouts).
//! * `errors`: Library error types for the pure stages.
//!
//! ## Usage Example
//!
//! ```rust
//! use autopatch_core::{Merger, TriageEngine, RawFinding};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let batch: Vec<RawFinding> = serde_json::from_str(
//!         r#"[{
//!             "repo": "app1",
//!             "type": "python_dependency",
//!             "package": "requests",
//!             "version": "2.28.0",
//!             "cve": "CVE-2023-32681",
//!             "severity": "HIGH",
//!             "advisory": "Proxy-Authorization header leak.",
//!             "fixed_in": ["2.31.0"],
//!             "tool": "pip-audit",
//!             "file": "requirements.txt"
//!         }]"#,
//!     )?;
//!
//!     let merged = Merger::default().merge(batch);
//!     let report = TriageEngine::default().triage(merged.canonical);
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Errors in the pure stages indicate violated preconditions and abort the
//! batch. Remediation failures are expected steady-state outcomes: each is
//! isolated to its candidate and reported as a typed, per-candidate record.
//!
//! ---
//! License: MIT OR Apache-2.0

pub mod config;
pub mod errors;
pub mod finding;
pub mod fingerprint;
pub mod merge;
pub mod metadata;
pub mod remediation;
pub mod triage;

/// Re-exports the finding data model.
pub use finding::{CanonicalFinding, Ecosystem, RawFinding, Severity};

/// Re-exports the fingerprint engine.
pub use fingerprint::{fingerprint, fingerprint_parts, Fingerprint};

/// Re-exports the reconciliation merger and its injectable rankings.
pub use merge::{MergeResult, Merger, ScannerRankings};

/// Re-exports the risk triage engine and its result types.
pub use triage::{
    classify_update, is_minor_update, is_patch_update, recommendations, AutoFixCandidate,
    TriageEngine, TriagePolicy, TriageReport, TriageSummary, TriagedBuckets, VersionDelta,
};

/// Re-exports batch metadata derivation.
pub use metadata::{findings_metadata, FindingsMetadata};

/// Re-exports the remediation pipeline and its host seam.
pub use remediation::{
    branch_name, GitCli, HostError, PatchError, PipelineState, PullRequestRef, PullRequestSpec,
    RemediationOutcome, RemediationPipeline, RemediationRecord, RepoHost,
};

/// Re-exports the policy configuration.
pub use config::PolicyConfig;

/// Re-exports the library error type for the pure stages.
pub use errors::AutopatchError;
