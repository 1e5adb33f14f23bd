use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tally_application::{ExpenseRow, ExpenseSink, ExpenseSource, NewExpense, StoreError};

use crate::memory_store::{next_id, remove_row, replace_row};

/// A decimal written either as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum DecimalText {
    Number(serde_json::Number),
    Text(String),
}

impl DecimalText {
    fn into_string(self) -> String {
        match self {
            DecimalText::Number(number) => number.to_string(),
            DecimalText::Text(text) => text,
        }
    }
}

/// On-disk shape of one expense. Accepts both snake_case and camelCase keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredExpense {
    id: u64,
    amount: DecimalText,
    #[serde(default)]
    description: String,
    #[serde(alias = "paidBy")]
    paid_by: String,
    #[serde(default, alias = "splitWith")]
    split_with: Vec<String>,
    #[serde(default, alias = "splitType", skip_serializing_if = "Option::is_none")]
    split_type: Option<String>,
    #[serde(default, alias = "splitDetails", skip_serializing_if = "IndexMap::is_empty")]
    split_details: IndexMap<String, DecimalText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
}

impl From<StoredExpense> for ExpenseRow {
    fn from(stored: StoredExpense) -> Self {
        ExpenseRow {
            id: stored.id,
            amount: stored.amount.into_string(),
            description: stored.description,
            paid_by: stored.paid_by,
            split_with: stored.split_with,
            split_type: stored.split_type,
            split_details: stored
                .split_details
                .into_iter()
                .map(|(name, value)| (name, value.into_string()))
                .collect(),
            category: stored.category,
        }
    }
}

impl From<ExpenseRow> for StoredExpense {
    fn from(row: ExpenseRow) -> Self {
        StoredExpense {
            id: row.id,
            amount: DecimalText::Text(row.amount),
            description: row.description,
            paid_by: row.paid_by,
            split_with: row.split_with,
            split_type: row.split_type,
            split_details: row
                .split_details
                .into_iter()
                .map(|(name, value)| (name, DecimalText::Text(value)))
                .collect(),
            category: row.category,
        }
    }
}

/// Expense rows kept as a JSON array in a single file.
///
/// A missing file reads as an empty ledger. Every change rewrites the whole
/// file.
#[derive(Debug)]
pub struct JsonFileExpenseStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileExpenseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(&self) -> Result<Vec<ExpenseRow>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(
                    path = %self.path.display(),
                    "Expense file not found, starting empty"
                );
                return Ok(Vec::new());
            }
            Err(err) => return Err(self.io_error(&err)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let stored: Vec<StoredExpense> = serde_json::from_str(&content).map_err(|err| {
            StoreError::Malformed(format!("{}: {err}", self.path.display()))
        })?;
        Ok(stored.into_iter().map(ExpenseRow::from).collect())
    }

    fn write_rows(&self, rows: Vec<ExpenseRow>) -> Result<(), StoreError> {
        let stored: Vec<StoredExpense> = rows.into_iter().map(StoredExpense::from).collect();
        let mut content = serde_json::to_string_pretty(&stored).map_err(|err| {
            StoreError::Malformed(format!("{}: {err}", self.path.display()))
        })?;
        content.push('\n');
        fs::write(&self.path, content).map_err(|err| self.io_error(&err))
    }

    /// Reads, edits and rewrites the file under the write lock. The file is
    /// left untouched when `edit` returns `None`.
    fn modify<T>(
        &self,
        edit: impl FnOnce(&mut Vec<ExpenseRow>) -> Option<T>,
    ) -> Result<Option<T>, StoreError> {
        let _guard = self.lock()?;

        let mut rows = self.read_rows()?;
        let Some(outcome) = edit(&mut rows) else {
            return Ok(None);
        };
        self.write_rows(rows)?;
        Ok(Some(outcome))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("expense file lock is poisoned".to_owned()))
    }

    fn io_error(&self, err: &io::Error) -> StoreError {
        StoreError::Unavailable(format!("{}: {err}", self.path.display()))
    }
}

impl ExpenseSource for JsonFileExpenseStore {
    fn list_expenses(&self) -> Result<Vec<ExpenseRow>, StoreError> {
        self.read_rows()
    }
}

impl ExpenseSink for JsonFileExpenseStore {
    fn append_expense(&self, expense: NewExpense) -> Result<ExpenseRow, StoreError> {
        let _guard = self.lock()?;

        let mut rows = self.read_rows()?;
        let row = expense.into_row(next_id(&rows));
        rows.push(row.clone());
        self.write_rows(rows)?;

        tracing::debug!(id = row.id, path = %self.path.display(), "Expense appended");
        Ok(row)
    }

    fn replace_expense(
        &self,
        id: u64,
        expense: NewExpense,
    ) -> Result<Option<ExpenseRow>, StoreError> {
        let row = self.modify(|rows| replace_row(rows, id, expense))?;
        tracing::debug!(id, found = row.is_some(), path = %self.path.display(), "Expense replaced");
        Ok(row)
    }

    fn delete_expense(&self, id: u64) -> Result<Option<ExpenseRow>, StoreError> {
        let row = self.modify(|rows| remove_row(rows, id))?;
        tracing::debug!(id, found = row.is_some(), path = %self.path.display(), "Expense deleted");
        Ok(row)
    }
}
