pub mod analytics;
pub mod balance;
pub mod group;
pub mod split;
pub mod warnings;

// Flat public surface for domain types and functions.
pub use analytics::{analyze, SpendBucket, SpendingReport};
pub use balance::{
    compute_group_balances, member_position, reduce, BalanceReport, DebtEdge, MemberPosition,
    NetBalances,
};
pub use group::{
    read_ledger_json, Expense, ExpenseRevision, Group, LedgerError, LedgerInput, Settlement,
};
pub use split::{compute_split, compute_split_named, ParticipantId, ShareAllocation, SplitError, SplitInput, SplitPolicy};
pub use warnings::Warning;
