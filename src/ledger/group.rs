//! Group ledger - the expense and settlement history of one group

use super::split::{compute_split, ParticipantId, ShareAllocation, SplitError, SplitInput};
use super::warnings::Warning;
use crate::money;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("duplicate expense id: {0}")]
    DuplicateExpenseId(String),
    #[error("duplicate settlement id: {0}")]
    DuplicateSettlementId(String),
    #[error("expense not found: {0}")]
    ExpenseNotFound(String),
    #[error("expense {id} has a negative amount: {amount}")]
    NegativeExpense { id: String, amount: Decimal },
    #[error("settlement {id} must have a positive amount, got {amount}")]
    NonPositiveSettlement { id: String, amount: Decimal },
    #[error("settlement {id} is paid by {member} to themselves")]
    SelfSettlement { id: String, member: ParticipantId },
    #[error("{record} references unknown member: {member}")]
    UnknownMember {
        record: String,
        member: ParticipantId,
    },
    #[error("invalid split for expense {id}: {source}")]
    Split {
        id: String,
        #[source]
        source: SplitError,
    },
    #[error("invalid datetime: {0}")]
    InvalidDatetime(String),
}

/// Input root for a group ledger JSON document
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LedgerInput {
    /// Display name of the group
    #[serde(default)]
    pub name: Option<String>,
    /// Group members. When empty, membership is taken from the records.
    #[serde(default)]
    pub members: Vec<ParticipantId>,
    #[serde(default)]
    pub expenses: Vec<ExpenseRecord>,
    #[serde(default)]
    pub settlements: Vec<SettlementRecord>,
}

/// Expense as supplied in the ledger file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExpenseRecord {
    /// Unique identifier for this expense
    pub id: String,
    /// Member who paid
    pub paid_by: ParticipantId,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Date of the purchase (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Total paid
    #[schemars(with = "f64")]
    pub amount: Decimal,
    /// How the total is divided among participants
    pub split: SplitInput,
}

/// Direct payment between two members
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SettlementRecord {
    /// Optional identifier; generated from the position when absent
    #[serde(default)]
    pub id: Option<String>,
    pub paid_by: ParticipantId,
    pub paid_to: ParticipantId,
    #[schemars(with = "f64")]
    pub amount: Decimal,
    /// When the payment was made (RFC3339 with offset; date-only assumes UTC)
    #[serde(deserialize_with = "deserialize_datetime")]
    #[schemars(with = "String")]
    pub settled_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expense {
    pub id: String,
    pub payer: ParticipantId,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    pub total: Decimal,
    /// The input the allocations were computed from
    pub split: SplitInput,
    pub allocations: ShareAllocation,
}

/// Changes to apply to an existing expense. Unset fields keep their value.
#[derive(Debug, Clone, Default)]
pub struct ExpenseRevision {
    pub total: Option<Decimal>,
    pub split: Option<SplitInput>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
}

impl Expense {
    pub fn new(
        id: impl Into<String>,
        payer: impl Into<ParticipantId>,
        total: Decimal,
        date: NaiveDate,
        split: SplitInput,
    ) -> Result<Self, LedgerError> {
        let id = id.into();
        let (total, allocations) = allocate(&id, total, &split)?;
        Ok(Expense {
            id,
            payer: payer.into(),
            description: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            date,
            total,
            split,
            allocations,
        })
    }

    pub fn with_details(mut self, description: Option<String>, category: Option<String>) -> Self {
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(category) = category.filter(|c| !c.trim().is_empty()) {
            self.category = category;
        }
        self
    }

    /// Apply an edit. Allocations are always recomputed from scratch; the
    /// previous shares are discarded rather than merged.
    pub fn revise(&mut self, revision: ExpenseRevision) -> Result<(), LedgerError> {
        let total = revision.total.unwrap_or(self.total);
        let split = revision.split.unwrap_or_else(|| self.split.clone());
        let (total, allocations) = allocate(&self.id, total, &split)?;

        self.total = total;
        self.split = split;
        self.allocations = allocations;
        if let Some(description) = revision.description {
            self.description = description;
        }
        if let Some(category) = revision.category {
            self.category = category;
        }
        if let Some(date) = revision.date {
            self.date = date;
        }
        log::debug!(
            "Expense {} revised: {} split {} way(s)",
            self.id,
            money::display_amount(self.total),
            self.allocations.len()
        );
        Ok(())
    }

    /// Exact splits are not corrected, so their shares can miss the total.
    pub fn allocation_mismatch(&self) -> Option<Warning> {
        let allocated = self.allocations.total();
        (allocated != self.total).then(|| Warning::ExactSplitMismatch {
            expense_id: self.id.clone(),
            allocated,
            total: self.total,
        })
    }
}

fn allocate(
    id: &str,
    total: Decimal,
    split: &SplitInput,
) -> Result<(Decimal, ShareAllocation), LedgerError> {
    if total < Decimal::ZERO {
        return Err(LedgerError::NegativeExpense {
            id: id.to_string(),
            amount: total,
        });
    }
    let total = money::round(total);
    let allocations = compute_split(total, split).map_err(|source| LedgerError::Split {
        id: id.to_string(),
        source,
    })?;
    Ok((total, allocations))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    pub id: String,
    pub payer: ParticipantId,
    pub payee: ParticipantId,
    pub amount: Decimal,
    pub settled_at: DateTime<FixedOffset>,
}

impl Settlement {
    pub fn new(
        id: impl Into<String>,
        payer: impl Into<ParticipantId>,
        payee: impl Into<ParticipantId>,
        amount: Decimal,
        settled_at: DateTime<FixedOffset>,
    ) -> Result<Self, LedgerError> {
        let id = id.into();
        let payer = payer.into();
        let payee = payee.into();
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveSettlement { id, amount });
        }
        if payer == payee {
            return Err(LedgerError::SelfSettlement { id, member: payer });
        }
        Ok(Settlement {
            id,
            payer,
            payee,
            amount: money::round(amount),
            settled_at,
        })
    }
}

/// One group's members, expenses and settlements
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub name: String,
    members: Vec<ParticipantId>,
    expenses: Vec<Expense>,
    settlements: Vec<Settlement>,
}

impl Group {
    pub fn new(name: impl Into<String>, members: Vec<ParticipantId>) -> Self {
        Group {
            name: name.into(),
            members,
            ..Default::default()
        }
    }

    pub fn from_input(input: LedgerInput) -> Result<Self, LedgerError> {
        let mut group = Group::new(input.name.unwrap_or_default(), input.members);

        for record in input.expenses {
            let expense = Expense::new(
                record.id,
                record.paid_by,
                record.amount,
                record.date,
                record.split,
            )?
            .with_details(record.description, record.category);
            group.add_expense(expense)?;
        }

        for record in input.settlements {
            let id = record
                .id
                .unwrap_or_else(|| format!("s{}", group.settlements.len() + 1));
            let settlement = Settlement::new(
                id,
                record.paid_by,
                record.paid_to,
                record.amount,
                record.settled_at,
            )?;
            group.record_settlement(settlement)?;
        }

        log::debug!(
            "Loaded group '{}': {} expense(s), {} settlement(s)",
            group.name,
            group.expenses.len(),
            group.settlements.len()
        );
        Ok(group)
    }

    /// Explicitly listed members (may be empty)
    pub fn members(&self) -> &[ParticipantId] {
        &self.members
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn settlements(&self) -> &[Settlement] {
        &self.settlements
    }

    pub fn add_expense(&mut self, expense: Expense) -> Result<(), LedgerError> {
        if self.expenses.iter().any(|e| e.id == expense.id) {
            return Err(LedgerError::DuplicateExpenseId(expense.id));
        }
        self.check_expense_members(&expense)?;
        if let Some(warning) = expense.allocation_mismatch() {
            log::warn!("{}", warning);
        }
        self.expenses.push(expense);
        Ok(())
    }

    pub fn record_settlement(&mut self, settlement: Settlement) -> Result<(), LedgerError> {
        if self.settlements.iter().any(|s| s.id == settlement.id) {
            return Err(LedgerError::DuplicateSettlementId(settlement.id));
        }
        let record = format!("settlement {}", settlement.id);
        self.check_member(&record, &settlement.payer)?;
        self.check_member(&record, &settlement.payee)?;
        self.settlements.push(settlement);
        Ok(())
    }

    pub fn revise_expense(&mut self, id: &str, revision: ExpenseRevision) -> Result<(), LedgerError> {
        let index = self
            .expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| LedgerError::ExpenseNotFound(id.to_string()))?;

        let mut revised = self.expenses[index].clone();
        revised.revise(revision)?;
        self.check_expense_members(&revised)?;
        self.expenses[index] = revised;
        Ok(())
    }

    /// Diagnostics for records that loaded but look wrong
    pub fn warnings(&self) -> Vec<Warning> {
        self.expenses
            .iter()
            .filter_map(Expense::allocation_mismatch)
            .collect()
    }

    fn check_expense_members(&self, expense: &Expense) -> Result<(), LedgerError> {
        let record = format!("expense {}", expense.id);
        self.check_member(&record, &expense.payer)?;
        for (participant, _) in expense.allocations.iter() {
            self.check_member(&record, participant)?;
        }
        Ok(())
    }

    fn check_member(&self, record: &str, member: &str) -> Result<(), LedgerError> {
        if self.members.is_empty() || self.members.iter().any(|m| m == member) {
            Ok(())
        } else {
            Err(LedgerError::UnknownMember {
                record: record.to_string(),
                member: member.to_string(),
            })
        }
    }
}

/// Read a group ledger from JSON
pub fn read_ledger_json<R: Read>(reader: R) -> anyhow::Result<Group> {
    let input: LedgerInput = serde_json::from_reader(reader)?;
    Ok(Group::from_input(input)?)
}

fn parse_datetime(s: &str) -> Result<DateTime<FixedOffset>, LedgerError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.and_utc().fixed_offset());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc().fixed_offset());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset());
    }
    Err(LedgerError::InvalidDatetime(s.to_string()))
}

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_datetime(&s).map_err(|err| serde::de::Error::custom(err.to_string()))
}
