//! Spending analytics - where the money went, by category, month and payer

use super::group::Expense;
use crate::money;
use chrono::NaiveDate;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Ranked lists (categories, payers) are cut to this many entries
pub const TOP_N: usize = 10;

/// Aggregate for one category, month or payer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpendBucket {
    pub key: String,
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpendingStats {
    pub total_spent: Decimal,
    pub expense_count: usize,
    pub average_expense: Decimal,
    pub category_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpendingReport {
    pub categories: Vec<SpendBucket>,
    pub monthly: Vec<SpendBucket>,
    pub payers: Vec<SpendBucket>,
    pub stats: SpendingStats,
}

pub fn analyze<'a, I>(expenses: I, since: Option<NaiveDate>) -> SpendingReport
where
    I: IntoIterator<Item = &'a Expense>,
{
    let expenses: Vec<&Expense> = expenses
        .into_iter()
        .filter(|e| since.map_or(true, |d| e.date >= d))
        .collect();

    let mut categories: IndexMap<&str, (Decimal, usize)> = IndexMap::new();
    let mut payers: IndexMap<&str, (Decimal, usize)> = IndexMap::new();
    let mut monthly: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();

    for expense in &expenses {
        accumulate(categories.entry(expense.category.as_str()).or_default(), expense);
        accumulate(payers.entry(expense.payer.as_str()).or_default(), expense);
        accumulate(
            monthly
                .entry(expense.date.format("%Y-%m").to_string())
                .or_default(),
            expense,
        );
    }

    let total_spent: Decimal = expenses.iter().map(|e| e.total).sum();
    let expense_count = expenses.len();
    let average_expense = if expense_count == 0 {
        Decimal::ZERO
    } else {
        money::round(total_spent / Decimal::from(expense_count))
    };

    let stats = SpendingStats {
        total_spent: money::round(total_spent),
        expense_count,
        average_expense,
        category_count: categories.len(),
    };

    SpendingReport {
        categories: ranked(categories),
        monthly: monthly
            .into_iter()
            .map(|(key, (total, count))| bucket(key, total, count))
            .collect(),
        payers: ranked(payers),
        stats,
    }
}

fn accumulate(slot: &mut (Decimal, usize), expense: &Expense) {
    slot.0 += expense.total;
    slot.1 += 1;
}

fn bucket(key: String, total: Decimal, count: usize) -> SpendBucket {
    SpendBucket {
        key,
        total: money::round(total),
        count,
    }
}

/// Highest total first; ties keep first-seen order
fn ranked(groups: IndexMap<&str, (Decimal, usize)>) -> Vec<SpendBucket> {
    let mut buckets: Vec<SpendBucket> = groups
        .into_iter()
        .map(|(key, (total, count))| bucket(key.to_string(), total, count))
        .collect();
    buckets.sort_by(|a, b| b.total.cmp(&a.total));
    buckets.truncate(TOP_N);
    buckets
}
