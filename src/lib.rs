//! Shared expense splitting and group settle-up.
//!
//! [`compute_split`] divides one expense among its participants and
//! [`compute_group_balances`] turns a group's history into who-pays-whom.

pub mod ledger;
pub mod money;

pub use ledger::{compute_group_balances, compute_split};
