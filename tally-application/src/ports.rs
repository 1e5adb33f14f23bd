use tally_domain::{Person, Settlement, SettlementPlanner};

use crate::{
    error::StoreError,
    model::{ExpenseRow, NewExpense},
};

pub trait ExpenseSource: Send + Sync {
    /// Every stored expense in insertion order.
    fn list_expenses(&self) -> Result<Vec<ExpenseRow>, StoreError>;
}

pub trait ExpenseSink: Send + Sync {
    /// Stores `expense` under a fresh id and returns the stored row.
    fn append_expense(&self, expense: NewExpense) -> Result<ExpenseRow, StoreError>;

    /// Overwrites the expense stored under `id`, keeping its id and position.
    /// Returns `None` when no such expense exists.
    fn replace_expense(
        &self,
        id: u64,
        expense: NewExpense,
    ) -> Result<Option<ExpenseRow>, StoreError>;

    /// Removes the expense stored under `id` and returns it, or `None` when no
    /// such expense exists.
    fn delete_expense(&self, id: u64) -> Result<Option<ExpenseRow>, StoreError>;
}

pub trait SettlementStrategy: Send + Sync {
    fn plan(&self, people: &[Person]) -> Vec<Settlement>;
}

impl SettlementStrategy for SettlementPlanner {
    fn plan(&self, people: &[Person]) -> Vec<Settlement> {
        SettlementPlanner::plan(self, people)
    }
}
