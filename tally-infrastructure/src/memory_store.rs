use std::sync::RwLock;

use tally_application::{ExpenseRow, ExpenseSink, ExpenseSource, NewExpense, StoreError};

/// Expense rows held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryExpenseStore {
    rows: RwLock<Vec<ExpenseRow>>,
}

impl InMemoryExpenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<ExpenseRow>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("in-memory store lock is poisoned".to_owned())
}

impl ExpenseSource for InMemoryExpenseStore {
    fn list_expenses(&self) -> Result<Vec<ExpenseRow>, StoreError> {
        Ok(self.rows.read().map_err(poisoned)?.clone())
    }
}

impl ExpenseSink for InMemoryExpenseStore {
    fn append_expense(&self, expense: NewExpense) -> Result<ExpenseRow, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        let id = next_id(&rows);
        let row = expense.into_row(id);
        rows.push(row.clone());
        Ok(row)
    }

    fn replace_expense(
        &self,
        id: u64,
        expense: NewExpense,
    ) -> Result<Option<ExpenseRow>, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        Ok(replace_row(&mut rows, id, expense))
    }

    fn delete_expense(&self, id: u64) -> Result<Option<ExpenseRow>, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        Ok(remove_row(&mut rows, id))
    }
}

pub(crate) fn replace_row(
    rows: &mut [ExpenseRow],
    id: u64,
    expense: NewExpense,
) -> Option<ExpenseRow> {
    let slot = rows.iter_mut().find(|row| row.id == id)?;
    *slot = expense.into_row(id);
    Some(slot.clone())
}

pub(crate) fn remove_row(rows: &mut Vec<ExpenseRow>, id: u64) -> Option<ExpenseRow> {
    let index = rows.iter().position(|row| row.id == id)?;
    Some(rows.remove(index))
}

pub(crate) fn next_id(rows: &[ExpenseRow]) -> u64 {
    rows.iter().map(|row| row.id).max().map_or(1, |id| id + 1)
}
