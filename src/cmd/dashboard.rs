//! Dashboard command - one member's position across their groups

use super::read_groups;
use clap::Args;
use splitc::ledger::{member_position, MemberPosition};
use splitc::money::{display_amount, display_signed};
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct DashboardCommand {
    /// Member to report on
    #[arg(short, long)]
    member: String,

    /// JSON ledger file(s) for the member's groups
    #[arg(short, long, required = true)]
    group: Vec<PathBuf>,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Tabled)]
struct GroupRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Paid")]
    paid: String,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "Settled out")]
    settlements_paid: String,
    #[tabled(rename = "Settled in")]
    settlements_received: String,
    #[tabled(rename = "Net")]
    net: String,
}

impl DashboardCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let groups = read_groups(&self.group)?;
        let unknown: Vec<&str> = groups
            .iter()
            .filter(|g| !g.members().is_empty() && !g.members().contains(&self.member))
            .map(|g| g.name.as_str())
            .collect();
        if !unknown.is_empty() {
            log::warn!(
                "{} is not a member of: {}",
                self.member,
                unknown.join(", ")
            );
        }

        let position = member_position(&groups, &self.member);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&position)?);
        } else {
            print_position(&position);
        }
        Ok(())
    }
}

fn print_position(position: &MemberPosition) {
    println!();
    println!("DASHBOARD ({})", position.member);
    println!();

    let rows: Vec<GroupRow> = position
        .groups
        .iter()
        .map(|g| GroupRow {
            group: g.group.clone(),
            paid: display_amount(g.summary.paid),
            share: display_amount(g.summary.share),
            settlements_paid: display_amount(g.summary.settlements_paid),
            settlements_received: display_amount(g.summary.settlements_received),
            net: display_signed(g.summary.net),
        })
        .collect();
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
    println!();

    println!("  You are owed: {}", display_amount(position.total_owed));
    println!("  You owe:      {}", display_amount(position.total_owing));
    println!("  Net:          {}", display_signed(position.net));
    println!();
}
