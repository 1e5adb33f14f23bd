#![warn(clippy::uninlined_format_args)]

pub mod ledger_presenter;
pub mod text_table;

pub use ledger_presenter::{
    ExpenseView, LedgerPresenter, PersonView, SettledView, SettlementView, SnapshotView, StatsView, to_json,
};
pub use text_table::{Alignment, TextTableBuilder};
