use crate::money::display_amount;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-fatal diagnostics raised while loading or reducing a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum Warning {
    /// Net balances across the group do not add up to zero.
    /// Points at bad upstream records; debts are still computed.
    IntegrityImbalance {
        #[schemars(with = "f64")]
        total: Decimal,
        #[schemars(with = "f64")]
        tolerance: Decimal,
    },
    /// Exact split amounts do not add up to the expense total.
    ExactSplitMismatch {
        expense_id: String,
        #[schemars(with = "f64")]
        allocated: Decimal,
        #[schemars(with = "f64")]
        total: Decimal,
    },
}

impl Warning {
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::IntegrityImbalance { .. } => "IntegrityImbalance",
            Warning::ExactSplitMismatch { .. } => "ExactSplitMismatch",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::IntegrityImbalance { total, tolerance } => write!(
                f,
                "net balances sum to {} (tolerance {})",
                display_amount(*total),
                display_amount(*tolerance)
            ),
            Warning::ExactSplitMismatch {
                expense_id,
                allocated,
                total,
            } => write!(
                f,
                "expense {} allocates {} of {}",
                expense_id,
                display_amount(*allocated),
                display_amount(*total)
            ),
        }
    }
}
