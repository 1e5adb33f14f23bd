pub mod ledger_aggregator;
pub mod name_normalizer;
pub mod settlement_planner;
pub mod split_calculator;

pub use ledger_aggregator::{Aggregation, BalanceAccumulator, LedgerAggregator, RecordRejection};
pub use name_normalizer::{NameRegistry, canonical_key, display_form};
pub use settlement_planner::SettlementPlanner;
pub use split_calculator::{
    Participant, Share, SplitCalculator, SplitError, resolve_participants,
};
