// autopatch-core/src/remediation/git.rs
//! Production [`RepoHost`] backed by the `git` and `gh` command-line tools.
//!
//! All invocations are blocking with an explicit timeout per call class:
//! short for local git plumbing, long for network operations (push, PR
//! creation). A timeout is reported as a [`HostError::Timeout`] and handled
//! by the pipeline exactly like a failed command. The working directory is
//! always passed explicitly; this module never changes the process-wide
//! current directory.

use super::{HostError, PullRequestRef, PullRequestSpec, RepoHost};
use log::debug;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

fn run_command(
    program: &str,
    args: &[&str],
    workdir: &Path,
    timeout: Duration,
) -> Result<CommandOutput, HostError> {
    debug!("running {} {:?} in {}", program, args, workdir.display());

    let mut child = Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| HostError::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    let status = match child.wait_timeout(timeout).map_err(|e| HostError::Spawn {
        program: program.to_string(),
        message: e.to_string(),
    })? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(HostError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }
    };

    let mut stdout = String::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_string(&mut stdout);
    }
    let mut stderr = String::new();
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_string(&mut stderr);
    }

    Ok(CommandOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}

/// Runs a command and converts a non-zero exit into a typed failure.
fn run_checked(
    program: &str,
    args: &[&str],
    workdir: &Path,
    timeout: Duration,
) -> Result<CommandOutput, HostError> {
    let output = run_command(program, args, workdir, timeout)?;
    if output.exit_code != 0 {
        return Err(HostError::CommandFailed {
            program: program.to_string(),
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output)
}

/// `git` + `gh` implementation of [`RepoHost`].
///
/// Expects both binaries on the execution path and a PR-host credential
/// (`GH_TOKEN`) in the process environment; `gh` picks the token up itself.
#[derive(Debug, Clone)]
pub struct GitCli {
    git_timeout: Duration,
    network_timeout: Duration,
}

impl GitCli {
    pub fn new(git_timeout: Duration, network_timeout: Duration) -> Self {
        Self {
            git_timeout,
            network_timeout,
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_secs(120))
    }
}

impl RepoHost for GitCli {
    fn remote_branch_exists(&self, workdir: &Path, branch: &str) -> Result<bool, HostError> {
        let output = run_checked("git", &["branch", "-r"], workdir, self.git_timeout)?;
        let suffix = format!("/{branch}");
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .any(|line| line == branch || line.ends_with(&suffix)))
    }

    fn create_branch(&self, workdir: &Path, branch: &str) -> Result<(), HostError> {
        run_checked("git", &["checkout", "-b", branch], workdir, self.git_timeout)?;
        Ok(())
    }

    fn checkout(&self, workdir: &Path, branch: &str) -> Result<(), HostError> {
        run_checked("git", &["checkout", branch], workdir, self.git_timeout)?;
        Ok(())
    }

    fn delete_local_branch(&self, workdir: &Path, branch: &str) -> Result<(), HostError> {
        run_checked("git", &["branch", "-D", branch], workdir, self.git_timeout)?;
        Ok(())
    }

    fn delete_remote_branch(&self, workdir: &Path, branch: &str) -> Result<(), HostError> {
        run_checked(
            "git",
            &["push", "origin", "--delete", branch],
            workdir,
            self.network_timeout,
        )?;
        Ok(())
    }

    fn has_changes(&self, workdir: &Path) -> Result<bool, HostError> {
        let output = run_checked("git", &["status", "--porcelain"], workdir, self.git_timeout)?;
        Ok(!output.stdout.trim().is_empty())
    }

    fn commit_all(&self, workdir: &Path, message: &str) -> Result<(), HostError> {
        run_checked("git", &["add", "."], workdir, self.git_timeout)?;
        run_checked(
            "git",
            &["commit", "-m", message],
            workdir,
            self.git_timeout,
        )?;
        Ok(())
    }

    fn push_branch(&self, workdir: &Path, branch: &str) -> Result<(), HostError> {
        run_checked(
            "git",
            &["push", "origin", branch],
            workdir,
            self.network_timeout,
        )?;
        Ok(())
    }

    fn open_pull_request(
        &self,
        workdir: &Path,
        spec: &PullRequestSpec,
    ) -> Result<PullRequestRef, HostError> {
        let output = run_checked(
            "gh",
            &[
                "pr",
                "create",
                "--base",
                &spec.base,
                "--head",
                &spec.branch,
                "--title",
                &spec.title,
                "--body",
                &spec.body,
                "--label",
                "security,automated",
                "--assignee",
                "@me",
            ],
            workdir,
            self.network_timeout,
        )?;

        // gh prints the PR URL as the last line of stdout.
        let url = output
            .stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| HostError::UnexpectedOutput {
                program: "gh".to_string(),
                message: "pr create produced no URL".to_string(),
            })?
            .to_string();
        let number = url
            .rsplit('/')
            .next()
            .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| HostError::UnexpectedOutput {
                program: "gh".to_string(),
                message: format!("could not extract PR number from {url}"),
            })?
            .to_string();

        Ok(PullRequestRef { number, url })
    }

    fn enable_auto_merge(&self, workdir: &Path, pr: &PullRequestRef) -> Result<(), HostError> {
        run_checked(
            "gh",
            &["pr", "merge", &pr.number, "--auto", "--squash"],
            workdir,
            self.network_timeout,
        )?;
        Ok(())
    }
}
