// autopatch/src/commands/triage.rs
//! Triage command implementation: findings batch in, triage report out.

use crate::cli::TriageCommand;
use crate::ui;
use anyhow::{Context, Result};
use autopatch_core::{Merger, RawFinding, TriageEngine};
use log::{debug, info};
use std::fs;

pub fn run(cmd: TriageCommand, quiet: bool) -> Result<()> {
    let text = fs::read_to_string(&cmd.findings_file).with_context(|| {
        format!("Failed to read findings file {}", cmd.findings_file.display())
    })?;
    let findings = RawFinding::parse_batch(&text)
        .with_context(|| format!("Findings file {} is not valid JSON", cmd.findings_file.display()))?;
    info!("loaded {} raw findings", findings.len());

    let policy = super::load_policy(cmd.config.as_deref())?;
    let merged = Merger::new(policy.rankings()).merge(findings);
    if merged.duplicates > 0 {
        info!(
            "suppressed {} duplicate reports across scanners",
            merged.duplicates
        );
    }
    debug!(
        "{} canonical findings after reconciliation",
        merged.canonical.len()
    );

    let report = TriageEngine::new(policy.triage_policy()).triage(merged.canonical);

    let json =
        serde_json::to_string_pretty(&report).context("Failed to serialize triage report")?;
    fs::write(&cmd.output, &json)
        .with_context(|| format!("Failed to write triage report to {}", cmd.output.display()))?;
    info!("triage report written to {}", cmd.output.display());

    if cmd.json_stdout {
        println!("{json}");
    }
    if !quiet {
        ui::print_triage_summary(&report);
        ui::print_recommendations(&report.recommendations);
    }

    Ok(())
}
