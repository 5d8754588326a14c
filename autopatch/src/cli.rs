// autopatch/src/cli.rs
//! This file defines the command-line interface (CLI) for the autopatch
//! application, including all available commands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "autopatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Reconcile vulnerability findings and open automated fix pull requests",
    long_about = "Autopatch aggregates vulnerability findings emitted by independent scanners, collapses duplicate reports into canonical findings, scores each finding's remediation risk, and drives an automated patch-pull-request pipeline for findings with a known fix.",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG for 'autopatch' crates to DEBUG)
    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands for the `autopatch` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merges duplicate findings and triages them by remediation risk.
    #[command(about = "Merges duplicate findings and triages them by remediation risk.")]
    Triage(TriageCommand),

    /// Opens patch pull requests for auto-fixable findings from a triage report.
    #[command(about = "Opens patch pull requests for auto-fixable findings from a triage report.")]
    Patch(PatchCommand),
}

/// Arguments for the `triage` command.
#[derive(Parser, Debug)]
pub struct TriageCommand {
    /// Findings batch to analyze (JSON; either a bare array or an object
    /// with a `findings` key, as the scanner aggregator emits it).
    #[arg(value_name = "FINDINGS", help = "Input findings JSON file.")]
    pub findings_file: PathBuf,

    /// Where to write the triage report.
    #[arg(long, short = 'o', value_name = "FILE", default_value = "triage.json", help = "Output triage report file.")]
    pub output: PathBuf,

    /// Path to a custom policy configuration file (YAML).
    #[arg(long = "config", value_name = "FILE", help = "Path to a custom policy configuration file (YAML).")]
    pub config: Option<PathBuf>,

    /// Print the triage report as JSON to stdout as well.
    #[arg(long = "json-stdout", help = "Print the triage report as JSON to stdout.")]
    pub json_stdout: bool,
}

/// Arguments for the `patch` command.
#[derive(Parser, Debug)]
pub struct PatchCommand {
    /// Triage report produced by the `triage` command.
    #[arg(value_name = "TRIAGE", help = "Input triage report JSON file.")]
    pub triage_file: PathBuf,

    /// Directory containing one checked-out working copy per repository.
    #[arg(long = "repos-dir", value_name = "DIR", default_value = "repos", help = "Directory of per-repository working copies.")]
    pub repos_dir: PathBuf,

    /// Only open pull requests for fixes judged safe to auto-merge.
    #[arg(long = "auto-merge-safe-only", help = "Only process candidates judged safe to auto-merge.")]
    pub auto_merge_safe_only: bool,

    /// Where to write per-candidate outcome records (stdout if omitted).
    #[arg(long, short = 'o', value_name = "FILE", help = "Output outcomes JSON file (stdout if omitted).")]
    pub output: Option<PathBuf>,

    /// Path to a custom policy configuration file (YAML).
    #[arg(long = "config", value_name = "FILE", help = "Path to a custom policy configuration file (YAML).")]
    pub config: Option<PathBuf>,

    /// Pull-request-host access token, normally taken from the environment.
    #[arg(long = "gh-token", env = "GH_TOKEN", hide_env_values = true, help = "PR-host access token (defaults to $GH_TOKEN).")]
    pub gh_token: Option<String>,
}
