// autopatch-core/tests/remediation_rollback_tests.rs
//! Failure-injection matrix for the remediation state machine.
//!
//! A scripted host stands in for git/gh and records every operation, so
//! each test can assert both the terminal outcome and the invariant that
//! matters: after any failure the working copy is back on the default
//! branch with no feature branch left behind, locally or remotely.

use autopatch_core::finding::{CanonicalFinding, Ecosystem, Severity};
use autopatch_core::remediation::{
    HostError, PipelineState, PullRequestRef, PullRequestSpec, RemediationOutcome,
    RemediationPipeline, RepoHost,
};
use autopatch_core::triage::AutoFixCandidate;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[derive(Default)]
struct ScriptedHost {
    fail_op: Option<&'static str>,
    remote_branch_preexists: bool,
    tree_is_clean: bool,
    ops: RefCell<Vec<String>>,
    current_branch: RefCell<String>,
    local_branches: RefCell<BTreeSet<String>>,
    remote_branches: RefCell<BTreeSet<String>>,
}

impl ScriptedHost {
    fn new() -> Self {
        let host = Self::default();
        *host.current_branch.borrow_mut() = "main".to_string();
        host
    }

    fn failing_at(op: &'static str) -> Self {
        let mut host = Self::new();
        host.fail_op = Some(op);
        host
    }

    fn record(&self, op: &str) -> Result<(), HostError> {
        self.ops.borrow_mut().push(op.to_string());
        if self.fail_op == Some(op) {
            return Err(HostError::CommandFailed {
                program: "git".to_string(),
                exit_code: 1,
                stderr: format!("scripted failure in {op}"),
            });
        }
        Ok(())
    }

    fn assert_clean(&self) {
        assert_eq!(*self.current_branch.borrow(), "main");
        assert!(
            self.local_branches.borrow().is_empty(),
            "local feature branch left behind"
        );
        assert!(
            self.remote_branches.borrow().is_empty(),
            "remote feature branch left behind"
        );
    }
}

impl RepoHost for ScriptedHost {
    fn remote_branch_exists(&self, _workdir: &Path, _branch: &str) -> Result<bool, HostError> {
        self.record("remote_branch_exists")?;
        Ok(self.remote_branch_preexists)
    }

    fn create_branch(&self, _workdir: &Path, branch: &str) -> Result<(), HostError> {
        self.record("create_branch")?;
        self.local_branches.borrow_mut().insert(branch.to_string());
        *self.current_branch.borrow_mut() = branch.to_string();
        Ok(())
    }

    fn checkout(&self, _workdir: &Path, branch: &str) -> Result<(), HostError> {
        self.record("checkout")?;
        *self.current_branch.borrow_mut() = branch.to_string();
        Ok(())
    }

    fn delete_local_branch(&self, _workdir: &Path, branch: &str) -> Result<(), HostError> {
        self.record("delete_local_branch")?;
        self.local_branches.borrow_mut().remove(branch);
        Ok(())
    }

    fn delete_remote_branch(&self, _workdir: &Path, branch: &str) -> Result<(), HostError> {
        self.record("delete_remote_branch")?;
        self.remote_branches.borrow_mut().remove(branch);
        Ok(())
    }

    fn has_changes(&self, _workdir: &Path) -> Result<bool, HostError> {
        self.record("has_changes")?;
        Ok(!self.tree_is_clean)
    }

    fn commit_all(&self, _workdir: &Path, _message: &str) -> Result<(), HostError> {
        self.record("commit_all")
    }

    fn push_branch(&self, _workdir: &Path, branch: &str) -> Result<(), HostError> {
        self.record("push_branch")?;
        self.remote_branches.borrow_mut().insert(branch.to_string());
        Ok(())
    }

    fn open_pull_request(
        &self,
        _workdir: &Path,
        _spec: &PullRequestSpec,
    ) -> Result<PullRequestRef, HostError> {
        self.record("open_pull_request")?;
        Ok(PullRequestRef {
            number: "42".to_string(),
            url: "https://github.com/acme/app1/pull/42".to_string(),
        })
    }

    fn enable_auto_merge(&self, _workdir: &Path, _pr: &PullRequestRef) -> Result<(), HostError> {
        self.record("enable_auto_merge")
    }
}

fn candidate(repo: &str, auto_merge_safe: bool) -> AutoFixCandidate {
    AutoFixCandidate {
        finding: CanonicalFinding {
            repo: repo.to_string(),
            ecosystem: Ecosystem::Python,
            package: Some("requests".to_string()),
            version: Some("2.28.0".to_string()),
            cve: "CVE-2024-1".to_string(),
            severity: Severity::High,
            advisory: "Advisory text.".to_string(),
            fixed_in: vec!["2.28.2".to_string()],
            tool: "pip-audit".to_string(),
            file: Some("requirements.txt".to_string()),
            detected_by: vec!["pip-audit".to_string()],
        },
        fix_confidence: 10,
        auto_merge_safe,
    }
}

/// A working copy whose requirements manifest pins the vulnerable version.
fn patchable_workdir() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("requirements.txt"), "requests==2.28.0\n").expect("seed manifest");
    dir
}

#[test_log::test]
fn successful_attempt_opens_pr_and_returns_to_default_branch() {
    let host = ScriptedHost::new();
    let dir = patchable_workdir();
    let pipeline = RemediationPipeline::new(&host, "main");

    let record = pipeline.remediate(dir.path(), &candidate("app1", true));

    match &record.outcome {
        RemediationOutcome::PrCreated { pr_reference } => {
            assert_eq!(pr_reference.number, "42");
        }
        other => panic!("expected pr_created, got {other:?}"),
    }
    assert_eq!(*host.current_branch.borrow(), "main");
    let ops = host.ops.borrow();
    assert_eq!(
        *ops,
        vec![
            "remote_branch_exists",
            "create_branch",
            "has_changes",
            "commit_all",
            "push_branch",
            "open_pull_request",
            "enable_auto_merge",
            "checkout",
        ]
    );
}

#[test_log::test]
fn unsafe_candidate_never_requests_auto_merge() {
    let host = ScriptedHost::new();
    let dir = patchable_workdir();
    let pipeline = RemediationPipeline::new(&host, "main");

    let record = pipeline.remediate(dir.path(), &candidate("app1", false));

    assert!(matches!(record.outcome, RemediationOutcome::PrCreated { .. }));
    assert!(!host.ops.borrow().iter().any(|op| op == "enable_auto_merge"));
}

#[test_log::test]
fn preexisting_remote_branch_skips_without_writes() {
    let mut host = ScriptedHost::new();
    host.remote_branch_preexists = true;
    let dir = patchable_workdir();
    let pipeline = RemediationPipeline::new(&host, "main");

    let record = pipeline.remediate(dir.path(), &candidate("app1", true));

    assert_eq!(
        record.outcome,
        RemediationOutcome::Skipped {
            reason: "already in flight".to_string()
        }
    );
    // The existence probe must be the only operation, and the manifest must
    // be untouched.
    assert_eq!(*host.ops.borrow(), vec!["remote_branch_exists"]);
    let manifest = fs::read_to_string(dir.path().join("requirements.txt")).unwrap();
    assert_eq!(manifest, "requests==2.28.0\n");
}

#[test_log::test]
fn clean_tree_after_patch_skips_and_rolls_back_the_branch() {
    let mut host = ScriptedHost::new();
    host.tree_is_clean = true;
    let dir = patchable_workdir();
    let pipeline = RemediationPipeline::new(&host, "main");

    let record = pipeline.remediate(dir.path(), &candidate("app1", true));

    assert_eq!(
        record.outcome,
        RemediationOutcome::Skipped {
            reason: "no changes needed".to_string()
        }
    );
    host.assert_clean();
}

#[test_log::test]
fn patch_failure_rolls_back_and_reports_branch_created() {
    let host = ScriptedHost::new();
    // No manifest in the working copy: the patch step cannot find the
    // package and must fail.
    let dir = TempDir::new().unwrap();
    let pipeline = RemediationPipeline::new(&host, "main");

    let record = pipeline.remediate(dir.path(), &candidate("app1", true));

    match &record.outcome {
        RemediationOutcome::Failed {
            failure_state,
            failure_reason,
        } => {
            assert_eq!(*failure_state, PipelineState::BranchCreated);
            assert!(failure_reason.contains("requests"));
        }
        other => panic!("expected failed, got {other:?}"),
    }
    host.assert_clean();
}

#[test_log::test]
fn commit_failure_rolls_back_and_reports_patched() {
    let host = ScriptedHost::failing_at("commit_all");
    let dir = patchable_workdir();
    let pipeline = RemediationPipeline::new(&host, "main");

    let record = pipeline.remediate(dir.path(), &candidate("app1", true));

    match &record.outcome {
        RemediationOutcome::Failed { failure_state, .. } => {
            assert_eq!(*failure_state, PipelineState::Patched);
        }
        other => panic!("expected failed, got {other:?}"),
    }
    host.assert_clean();
}

#[test_log::test]
fn push_failure_rolls_back_and_reports_committed() {
    let host = ScriptedHost::failing_at("push_branch");
    let dir = patchable_workdir();
    let pipeline = RemediationPipeline::new(&host, "main");

    let record = pipeline.remediate(dir.path(), &candidate("app1", true));

    match &record.outcome {
        RemediationOutcome::Failed { failure_state, .. } => {
            assert_eq!(*failure_state, PipelineState::Committed);
        }
        other => panic!("expected failed, got {other:?}"),
    }
    host.assert_clean();
}

#[test_log::test]
fn pr_failure_rolls_back_including_the_pushed_remote_branch() {
    let host = ScriptedHost::failing_at("open_pull_request");
    let dir = patchable_workdir();
    let pipeline = RemediationPipeline::new(&host, "main");

    let record = pipeline.remediate(dir.path(), &candidate("app1", true));

    match &record.outcome {
        RemediationOutcome::Failed { failure_state, .. } => {
            assert_eq!(*failure_state, PipelineState::Pushed);
        }
        other => panic!("expected failed, got {other:?}"),
    }
    host.assert_clean();
    assert!(host
        .ops
        .borrow()
        .iter()
        .any(|op| op == "delete_remote_branch"));
}

#[test_log::test]
fn denied_auto_merge_is_soft_and_keeps_the_pr() {
    let host = ScriptedHost::failing_at("enable_auto_merge");
    let dir = patchable_workdir();
    let pipeline = RemediationPipeline::new(&host, "main");

    let record = pipeline.remediate(dir.path(), &candidate("app1", true));

    assert!(matches!(record.outcome, RemediationOutcome::PrCreated { .. }));
    assert_eq!(*host.current_branch.borrow(), "main");
}

#[test_log::test]
fn one_failure_does_not_stop_the_batch() {
    let host = ScriptedHost::new();
    let repos = TempDir::new().unwrap();
    // app1 has no manifest and will fail at the patch step; app2 is
    // patchable and must still be attempted.
    fs::create_dir(repos.path().join("app1")).unwrap();
    fs::create_dir(repos.path().join("app2")).unwrap();
    fs::write(
        repos.path().join("app2/requirements.txt"),
        "requests==2.28.0\n",
    )
    .unwrap();

    let pipeline = RemediationPipeline::new(&host, "main");
    let records = pipeline.run(
        repos.path(),
        &[candidate("app1", false), candidate("app2", false)],
    );

    assert_eq!(records.len(), 2);
    assert!(matches!(
        records[0].outcome,
        RemediationOutcome::Failed { .. }
    ));
    assert!(matches!(
        records[1].outcome,
        RemediationOutcome::PrCreated { .. }
    ));
    assert_eq!(records[1].repo, "app2");
}
