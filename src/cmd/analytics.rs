//! Analytics command - spending by category, month and payer

use super::read_groups;
use chrono::NaiveDate;
use clap::Args;
use splitc::ledger::{analyze, SpendBucket, SpendingReport};
use splitc::money::display_amount;
use std::path::PathBuf;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

#[derive(Args, Debug)]
pub struct AnalyticsCommand {
    /// JSON ledger file(s); repeat to combine several groups
    #[arg(short, long, required = true)]
    group: Vec<PathBuf>,

    /// Only include expenses on or after this date (YYYY-MM-DD)
    #[arg(short, long)]
    since: Option<NaiveDate>,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

impl AnalyticsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let groups = read_groups(&self.group)?;
        let report = analyze(groups.iter().flat_map(|g| g.expenses()), self.since);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            self.print_report(&report);
        }
        Ok(())
    }

    fn print_report(&self, report: &SpendingReport) {
        let since = self
            .since
            .map_or("all time".to_string(), |d| format!("since {}", d.format("%Y-%m-%d")));

        println!();
        println!("SPENDING ({})", since);
        println!(
            "  Total: {} | Expenses: {} | Average: {} | Categories: {}",
            display_amount(report.stats.total_spent),
            report.stats.expense_count,
            display_amount(report.stats.average_expense),
            report.stats.category_count
        );

        print_buckets("BY CATEGORY", "Category", &report.categories);
        print_buckets("BY MONTH", "Month", &report.monthly);
        print_buckets("BY PAYER", "Paid by", &report.payers);
    }
}

fn print_buckets(title: &str, key_header: &str, buckets: &[SpendBucket]) {
    println!();
    println!("{}", title);
    if buckets.is_empty() {
        println!("  (no expenses)");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record([key_header, "Total", "Expenses"]);
    for bucket in buckets {
        builder.push_record([
            bucket.key.clone(),
            display_amount(bucket.total),
            bucket.count.to_string(),
        ]);
    }
    let table = builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}
