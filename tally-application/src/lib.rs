#![warn(clippy::uninlined_format_args)]

pub mod error;
pub mod ledger_service;
pub mod model;
pub mod ports;

pub use error::{
    ExpenseError, IngestError, LedgerServiceError, RowError, RowRejection, SettleError, StoreError,
};
pub use ledger_service::LedgerService;
pub use model::{
    DashboardStats, ExpensePatch, ExpenseRow, LedgerConfig, LedgerSnapshot, NewExpense, RecordPolicy,
    SETTLEMENT_CATEGORY, SETTLEMENT_PREFIX, SplitType,
};
pub use ports::{ExpenseSink, ExpenseSource, SettlementStrategy};
