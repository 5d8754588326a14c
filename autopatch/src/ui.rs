// autopatch/src/ui.rs
//! Human-facing rendering of triage summaries and remediation outcomes.
//!
//! Everything here writes to stderr so stdout stays reserved for the JSON
//! interchange payloads. Color is only applied when stderr is a terminal.

use autopatch_core::{RemediationOutcome, RemediationRecord, TriageReport};
use comfy_table::{presets, Cell, Table};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

fn color_enabled() -> bool {
    std::io::stderr().is_terminal()
}

/// Prints the severity breakdown and fix counts as a table.
pub fn print_triage_summary(report: &TriageReport) {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_BORDERS_ONLY);
    table.set_header(vec!["Severity", "Count"]);
    table.add_row(vec![
        Cell::new("CRITICAL"),
        Cell::new(report.summary.critical_count),
    ]);
    table.add_row(vec![Cell::new("HIGH"), Cell::new(report.summary.high_count)]);
    table.add_row(vec![
        Cell::new("MEDIUM"),
        Cell::new(report.summary.medium_count),
    ]);
    table.add_row(vec![Cell::new("LOW"), Cell::new(report.summary.low_count)]);

    eprintln!("{table}");
    eprintln!(
        "Total findings: {}   Auto-fixable: {}   Safe to auto-merge: {}",
        report.total_findings,
        report.summary.auto_fixable_count,
        report.summary.auto_merge_safe_count
    );
}

pub fn print_recommendations(recommendations: &[String]) {
    if recommendations.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("Recommendations:");
    for rec in recommendations {
        if color_enabled() && rec.starts_with("URGENT") {
            eprintln!("  {}", rec.red().bold());
        } else {
            eprintln!("  {rec}");
        }
    }
}

/// One line per remediation attempt.
pub fn print_outcome_line(record: &RemediationRecord) {
    let subject = format!("{}: {}", record.repo, record.package);
    match &record.outcome {
        RemediationOutcome::PrCreated { pr_reference } => {
            if color_enabled() {
                eprintln!("  {} {subject} -> {}", "ok".green(), pr_reference.url);
            } else {
                eprintln!("  ok {subject} -> {}", pr_reference.url);
            }
        }
        RemediationOutcome::Skipped { reason } => {
            eprintln!("  skipped {subject} ({reason})");
        }
        RemediationOutcome::Failed {
            failure_state,
            failure_reason,
        } => {
            if color_enabled() {
                eprintln!(
                    "  {} {subject} in state {}: {failure_reason}",
                    "failed".red(),
                    failure_state.as_str()
                );
            } else {
                eprintln!(
                    "  failed {subject} in state {}: {failure_reason}",
                    failure_state.as_str()
                );
            }
        }
    }
}
