//! Split command - divide a single amount and show each participant's share

use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use splitc::ledger::{compute_split_named, ParticipantId, ShareAllocation, SplitError, SplitPolicy};
use splitc::money::{display_amount, round};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct SplitCommand {
    /// Total amount to split (e.g. 100.00)
    #[arg(short, long, allow_negative_numbers = true)]
    total: Decimal,

    /// Split policy: equal, exact, percentage or shares
    #[arg(short, long, default_value = "equal")]
    policy: String,

    /// Participants as NAME, or NAME=VALUE for exact, percentage and shares
    #[arg(required = true)]
    participants: Vec<String>,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Tabled)]
struct ShareRow {
    #[tabled(rename = "Participant")]
    participant: String,
    #[tabled(rename = "Share")]
    share: String,
}

#[derive(Debug, Serialize)]
struct SplitOutput<'a> {
    policy: SplitPolicy,
    total: Decimal,
    allocated: Decimal,
    shares: &'a ShareAllocation,
}

impl SplitCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        if self.total < Decimal::ZERO {
            anyhow::bail!("Total must not be negative: {}", self.total);
        }
        let total = round(self.total);
        let shares = self.shares(total)?;
        let policy: SplitPolicy = self.policy.parse()?;

        if self.json {
            let output = SplitOutput {
                policy,
                total,
                allocated: round(shares.total()),
                shares: &shares,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            self.print_table(policy, total, &shares);
        }
        Ok(())
    }

    fn shares(&self, total: Decimal) -> Result<ShareAllocation, SplitError> {
        compute_split_named(
            total,
            &self.policy,
            self.participants.iter().map(|p| parse_entry(p)),
        )
    }

    fn print_table(&self, policy: SplitPolicy, total: Decimal, shares: &ShareAllocation) {
        let mut rows: Vec<ShareRow> = shares
            .iter()
            .map(|(participant, share)| ShareRow {
                participant: participant.clone(),
                share: display_amount(share),
            })
            .collect();
        rows.push(ShareRow {
            participant: "TOTAL".to_string(),
            share: display_amount(shares.total()),
        });

        println!();
        println!("SPLIT ({}) of {}", policy, display_amount(total));
        println!();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);

        let allocated = shares.total();
        if allocated != total {
            println!();
            println!(
                "\u{26A0} Shares add up to {} but the total is {}",
                display_amount(allocated),
                display_amount(total)
            );
        }
    }
}

/// `alice=30.5` -> ("alice", Some("30.5")), `bob` -> ("bob", None)
fn parse_entry(raw: &str) -> (ParticipantId, Option<String>) {
    match raw.split_once('=') {
        Some((name, value)) => (name.trim().to_string(), Some(value.trim().to_string())),
        None => (raw.trim().to_string(), None),
    }
}
