use tally_domain::{InvalidAmount, SplitError};
use thiserror::Error;

/// A raw expense row that cannot become an `ExpenseRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error(transparent)]
    InvalidAmount(#[from] InvalidAmount),
    #[error("unknown split type '{0}' (expected 'equal', 'percentage' or 'exact')")]
    UnknownSplitType(String),
    #[error("split value '{value}' for '{name}' is not a decimal")]
    InvalidSplitValue { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Split(#[from] SplitError),
}

/// A stored row excluded from the ledger, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expense {id} (row {index}): {error}")]
pub struct RowRejection {
    pub index: usize,
    pub id: u64,
    #[source]
    pub error: RowError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("expense store is unavailable: {0}")]
    Unavailable(String),
    #[error("expense store is malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettleError {
    #[error("settlement party name is blank")]
    BlankName,
    #[error("'{0}' cannot settle with themselves")]
    SamePerson(String),
    #[error(transparent)]
    InvalidAmount(#[from] InvalidAmount),
}

/// An expense that cannot be added, changed or removed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpenseError {
    #[error("expense description is blank")]
    BlankDescription,
    #[error("nothing to change on expense {0}")]
    EmptyUpdate(u64),
    #[error("expense {0} not found")]
    NotFound(u64),
    #[error(transparent)]
    Invalid(#[from] RowError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Rejected(#[from] RowRejection),
    #[error(transparent)]
    Settle(#[from] SettleError),
    #[error(transparent)]
    Expense(#[from] ExpenseError),
}
