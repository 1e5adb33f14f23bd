use fxhash::FxHashSet;
use tally_domain::{
    ExpenseRecord, LedgerAggregator, Money, Person, PersonKey, RecordRejection, Settlement,
    SplitCalculator, services::display_form,
};

use crate::{
    error::{ExpenseError, LedgerServiceError, RowError, RowRejection, SettleError},
    model::{
        DashboardStats, ExpensePatch, ExpenseRow, LedgerConfig, LedgerSnapshot, NewExpense,
        RecordPolicy,
    },
    ports::{ExpenseSink, ExpenseSource, SettlementStrategy},
};

/// Records accepted into the ledger plus the people derived from them.
struct Ledger {
    records: Vec<ExpenseRecord>,
    people: Vec<Person>,
    skipped: Vec<RowRejection>,
}

#[derive(Clone, Copy)]
pub struct LedgerService<'a> {
    source: &'a dyn ExpenseSource,
    sink: &'a dyn ExpenseSink,
    strategy: &'a dyn SettlementStrategy,
    config: LedgerConfig,
}

impl<'a> LedgerService<'a> {
    pub fn new(
        source: &'a dyn ExpenseSource,
        sink: &'a dyn ExpenseSink,
        strategy: &'a dyn SettlementStrategy,
        config: LedgerConfig,
    ) -> Self {
        Self {
            source,
            sink,
            strategy,
            config,
        }
    }

    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    pub fn balances(&self) -> Result<Vec<Person>, LedgerServiceError> {
        Ok(self.load()?.people)
    }

    pub fn settlements(&self) -> Result<Vec<Settlement>, LedgerServiceError> {
        let ledger = self.load()?;
        Ok(self.strategy.plan(&ledger.people))
    }

    pub fn stats(&self) -> Result<DashboardStats, LedgerServiceError> {
        Ok(self.snapshot()?.stats)
    }

    /// People, planned settlements and dashboard stats from one read of the
    /// store.
    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerServiceError> {
        let ledger = self.load()?;
        let settlements = self.strategy.plan(&ledger.people);
        let total_amount: Money = ledger
            .records
            .iter()
            .map(|record| record.amount.money())
            .sum();
        let stats = DashboardStats {
            total_expenses: ledger.records.len(),
            total_amount: self.config.context.round(total_amount),
            pending_settlements: settlements.len(),
        };

        Ok(LedgerSnapshot {
            people: ledger.people,
            settlements,
            stats,
            skipped: ledger.skipped,
        })
    }

    /// Records that `from` paid `to`, as an exact-split expense owed by `to`.
    pub fn settle(
        &self,
        from: &str,
        to: &str,
        amount: Money,
    ) -> Result<ExpenseRow, LedgerServiceError> {
        let from_key = PersonKey::from_name(from).ok_or(SettleError::BlankName)?;
        let to_key = PersonKey::from_name(to).ok_or(SettleError::BlankName)?;
        if from_key == to_key {
            return Err(SettleError::SamePerson(display_form(from)).into());
        }

        let settlement = Settlement {
            from: from.trim().to_owned(),
            to: to.trim().to_owned(),
            amount: self.config.context.round(amount),
        };
        ExpenseRecord::settlement_payment(&settlement).map_err(SettleError::from)?;

        let row = self
            .sink
            .append_expense(NewExpense::settlement(&settlement, self.config.context))?;
        tracing::info!(
            id = row.id,
            from = %settlement.from,
            to = %settlement.to,
            amount = %settlement.amount,
            "Settlement recorded"
        );
        Ok(row)
    }

    /// Stored settlement payments in insertion order.
    pub fn settled_transactions(&self) -> Result<Vec<ExpenseRow>, LedgerServiceError> {
        let rows = self.source.list_expenses()?;
        Ok(rows.into_iter().filter(ExpenseRow::is_settlement).collect())
    }

    /// Every stored expense, settlements included, in insertion order.
    pub fn expenses(&self) -> Result<Vec<ExpenseRow>, LedgerServiceError> {
        Ok(self.source.list_expenses()?)
    }

    /// Validates `expense` and stores it under a fresh id.
    pub fn add_expense(&self, expense: NewExpense) -> Result<ExpenseRow, LedgerServiceError> {
        self.validate(&expense)?;

        let row = self.sink.append_expense(expense)?;
        tracing::info!(
            id = row.id,
            amount = %row.amount,
            paid_by = %row.paid_by,
            "Expense recorded"
        );
        Ok(row)
    }

    /// Applies `patch` to the expense stored under `id`. The patched expense
    /// must pass the same checks as a new one.
    pub fn update_expense(
        &self,
        id: u64,
        patch: ExpensePatch,
    ) -> Result<ExpenseRow, LedgerServiceError> {
        if patch.is_empty() {
            return Err(ExpenseError::EmptyUpdate(id).into());
        }
        let stored = self
            .source
            .list_expenses()?
            .into_iter()
            .find(|row| row.id == id)
            .ok_or(ExpenseError::NotFound(id))?;

        let expense = patch.apply(&stored);
        self.validate(&expense)?;

        let row = self
            .sink
            .replace_expense(id, expense)?
            .ok_or(ExpenseError::NotFound(id))?;
        tracing::info!(id, "Expense updated");
        Ok(row)
    }

    pub fn delete_expense(&self, id: u64) -> Result<ExpenseRow, LedgerServiceError> {
        let row = self
            .sink
            .delete_expense(id)?
            .ok_or(ExpenseError::NotFound(id))?;
        tracing::info!(id, description = %row.description, "Expense deleted");
        Ok(row)
    }

    fn validate(&self, expense: &NewExpense) -> Result<(), ExpenseError> {
        if expense.description.trim().is_empty() {
            return Err(ExpenseError::BlankDescription);
        }
        let record = expense.to_record().map_err(RowError::from)?;
        SplitCalculator::new(self.config.context)
            .split(&record)
            .map_err(RowError::from)?;
        Ok(())
    }

    fn load(&self) -> Result<Ledger, LedgerServiceError> {
        let rows = self.source.list_expenses()?;
        self.fold_rows(&rows)
    }

    fn fold_rows(&self, rows: &[ExpenseRow]) -> Result<Ledger, LedgerServiceError> {
        let mut records = Vec::with_capacity(rows.len());
        // Row index of each ingested record.
        let mut origins = Vec::with_capacity(rows.len());
        let mut skipped = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            match row.to_record() {
                Ok(record) => {
                    records.push(record);
                    origins.push(index);
                }
                Err(error) => {
                    let rejection = RowRejection {
                        index,
                        id: row.id,
                        error: error.into(),
                    };
                    self.reject(rejection, &mut skipped)?;
                }
            }
        }

        let aggregator = LedgerAggregator::new(self.config.context);
        let people = match self.config.record_policy {
            RecordPolicy::Strict => aggregator.aggregate(&records).map_err(|rejection| {
                let rejection = row_rejection(rows, &origins, rejection);
                tracing::error!(error = %rejection, "Expense ledger cannot be aggregated");
                LedgerServiceError::from(rejection)
            })?,
            RecordPolicy::SkipInvalid => {
                let aggregation = aggregator.aggregate_skipping_invalid(&records);
                let rejected: FxHashSet<usize> = aggregation
                    .rejected
                    .iter()
                    .map(|rejection| rejection.index)
                    .collect();
                skipped.extend(
                    aggregation
                        .rejected
                        .into_iter()
                        .map(|rejection| row_rejection(rows, &origins, rejection)),
                );
                skipped.sort_by_key(|rejection| rejection.index);
                records = records
                    .into_iter()
                    .enumerate()
                    .filter(|(index, _)| !rejected.contains(index))
                    .map(|(_, record)| record)
                    .collect();
                aggregation.people
            }
        };

        tracing::debug!(
            row_count = rows.len(),
            accepted = records.len(),
            skipped = skipped.len(),
            "Expense rows folded"
        );
        Ok(Ledger {
            records,
            people,
            skipped,
        })
    }

    fn reject(
        &self,
        rejection: RowRejection,
        skipped: &mut Vec<RowRejection>,
    ) -> Result<(), LedgerServiceError> {
        match self.config.record_policy {
            RecordPolicy::Strict => {
                tracing::error!(error = %rejection, "Expense row cannot be ingested");
                Err(rejection.into())
            }
            RecordPolicy::SkipInvalid => {
                tracing::warn!(
                    index = rejection.index,
                    id = rejection.id,
                    error = %rejection.error,
                    "Skipping expense row that cannot be ingested"
                );
                skipped.push(rejection);
                Ok(())
            }
        }
    }
}

fn row_rejection(
    rows: &[ExpenseRow],
    origins: &[usize],
    rejection: RecordRejection,
) -> RowRejection {
    let index = origins[rejection.index];
    RowRejection {
        index,
        id: rows[index].id,
        error: RowError::Split(rejection.error),
    }
}
