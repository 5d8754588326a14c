// autopatch/src/commands/patch.rs
//! Patch command implementation: triage report in, one pull request (or a
//! typed skip/failure record) per auto-fix candidate out.

use crate::cli::PatchCommand;
use crate::ui;
use anyhow::{bail, Context, Result};
use autopatch_core::{GitCli, RemediationPipeline, TriageReport};
use log::info;
use std::fs;

pub fn run(cmd: PatchCommand, quiet: bool) -> Result<()> {
    let token = cmd.gh_token.as_deref().map(str::trim).unwrap_or("");
    if token.is_empty() {
        bail!("GH_TOKEN is not set; export it (or pass --gh-token) so pull requests can be opened");
    }
    // `gh` reads the credential from the environment; make sure a token
    // passed via --gh-token is visible to the child processes too.
    std::env::set_var("GH_TOKEN", token);

    let text = fs::read_to_string(&cmd.triage_file)
        .with_context(|| format!("Failed to read triage file {}", cmd.triage_file.display()))?;
    let report: TriageReport =
        serde_json::from_str(&text).context("Triage file has an unexpected shape")?;

    let mut candidates = report.auto_fixes;
    if cmd.auto_merge_safe_only {
        candidates.retain(|c| c.auto_merge_safe);
    }
    info!("creating {} patch pull requests", candidates.len());

    let policy = super::load_policy(cmd.config.as_deref())?;
    let host = GitCli::new(policy.git_timeout(), policy.network_timeout());
    let pipeline = RemediationPipeline::new(&host, policy.default_branch.clone());
    let records = pipeline.run(&cmd.repos_dir, &candidates);

    if !quiet {
        for record in &records {
            ui::print_outcome_line(record);
        }
    }

    let json =
        serde_json::to_string_pretty(&records).context("Failed to serialize outcome records")?;
    match &cmd.output {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("Failed to write outcomes to {}", path.display()))?;
            info!("outcomes written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
