//! Validate command - surface data quality issues without computing settle-up

use super::read_group;
use clap::Args;
use serde::Serialize;
use splitc::ledger::{reduce, Warning};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// JSON ledger file for the group ("-" for stdin)
    #[arg(short, long)]
    group: PathBuf,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    #[serde(rename = "type")]
    issue_type: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ValidationOutput<'a> {
    group: &'a str,
    issue_count: usize,
    issues: &'a [ValidationIssue],
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let group = read_group(&self.group)?;
        let report = reduce(&group);

        let issues: Vec<ValidationIssue> = group
            .warnings()
            .iter()
            .chain(&report.warnings)
            .map(issue)
            .collect();

        if self.json {
            let output = ValidationOutput {
                group: &group.name,
                issue_count: issues.len(),
                issues: &issues,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(&group.name, &issues);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }
}

fn issue(warning: &Warning) -> ValidationIssue {
    let message = match warning {
        Warning::IntegrityImbalance { .. } => {
            format!("{} - expense or settlement records are inconsistent", warning)
        }
        Warning::ExactSplitMismatch { .. } => {
            format!("{} - exact shares are not corrected to the total", warning)
        }
    };
    ValidationIssue {
        issue_type: warning.kind(),
        message,
    }
}

fn print_text(group: &str, issues: &[ValidationIssue]) {
    println!();
    println!("VALIDATION RESULTS ({})", group);
    println!();

    if issues.is_empty() {
        println!("\u{2713} No issues found.");
        return;
    }

    println!("\u{26A0} {} issue(s) found:", issues.len());
    println!();
    for (i, issue) in issues.iter().enumerate() {
        println!("  {}. [{}] {}", i + 1, issue.issue_type, issue.message);
    }
    println!();
}
