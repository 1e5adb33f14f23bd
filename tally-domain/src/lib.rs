#![warn(clippy::uninlined_format_args)]

pub mod context;
pub mod model;
pub mod services;

pub use context::{LedgerContext, RoundingMode, UnknownRoundingMode};
pub use model::{
    Amount, ExpenseRecord, InvalidAmount, Money, Person, PersonKey, PolicyMap, Settlement,
    SplitPolicy,
};
pub use services::{
    Aggregation, LedgerAggregator, RecordRejection, SettlementPlanner, SplitCalculator,
    SplitError,
};
