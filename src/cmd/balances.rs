//! Balances command - net positions and who pays whom

use super::read_group;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use splitc::ledger::{reduce, BalanceReport, DebtEdge, Group};
use splitc::money::{display_amount, display_signed, round};
use std::io;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct BalancesCommand {
    /// JSON ledger file for the group ("-" for stdin)
    #[arg(short, long)]
    group: PathBuf,

    /// Output as JSON instead of formatted tables
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Output the settle-up list as CSV
    #[arg(long)]
    csv: bool,
}

#[derive(Debug, Tabled)]
struct NetRow {
    #[tabled(rename = "Member")]
    member: String,
    #[tabled(rename = "Net")]
    net: String,
    #[tabled(rename = "Status")]
    status: &'static str,
}

#[derive(Debug, Tabled)]
struct DebtRow {
    #[tabled(rename = "From")]
    debtor: String,
    #[tabled(rename = "To")]
    creditor: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

/// CSV record for the settle-up list
#[derive(Debug, Serialize)]
struct DebtRecord<'a> {
    debtor: &'a str,
    creditor: &'a str,
    amount: String,
}

#[derive(Debug, Serialize)]
struct BalancesOutput<'a> {
    group: &'a str,
    #[serde(flatten)]
    report: &'a BalanceReport,
}

impl BalancesCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let group = read_group(&self.group)?;
        let report = reduce(&group);

        if self.csv {
            write_csv(&report.debts, io::stdout())
        } else if self.json {
            let output = BalancesOutput {
                group: &group.name,
                report: &report,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        } else {
            print_report(&group, &report);
            Ok(())
        }
    }
}

fn print_report(group: &Group, report: &BalanceReport) {
    println!();
    println!("BALANCES ({})", group.name);
    println!();

    if report.net.is_empty() {
        println!("No expenses or settlements recorded");
        return;
    }

    let rows: Vec<NetRow> = report
        .net
        .iter()
        .map(|(member, net)| NetRow {
            member: member.clone(),
            net: display_signed(net),
            status: status(net),
        })
        .collect();
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
    println!();

    println!("SETTLE UP");
    if report.debts.is_empty() {
        println!("\u{2713} Everyone is settled up.");
    } else {
        let rows: Vec<DebtRow> = report
            .debts
            .iter()
            .map(|d| DebtRow {
                debtor: d.debtor.clone(),
                creditor: d.creditor.clone(),
                amount: display_amount(d.amount),
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    for warning in group.warnings().iter().chain(&report.warnings) {
        println!();
        println!("\u{26A0} [{}] {}", warning.kind(), warning);
    }
}

fn status(net: Decimal) -> &'static str {
    let rounded = round(net);
    if rounded > Decimal::ZERO {
        "is owed"
    } else if rounded < Decimal::ZERO {
        "owes"
    } else {
        "settled"
    }
}

fn write_csv<W: io::Write>(debts: &[DebtEdge], writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for debt in debts {
        wtr.serialize(DebtRecord {
            debtor: &debt.debtor,
            creditor: &debt.creditor,
            amount: display_amount(debt.amount),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
