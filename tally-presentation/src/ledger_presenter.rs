use std::borrow::Cow;

use indexmap::IndexMap;
use serde::Serialize;
use tally_application::{DashboardStats, ExpenseRow, LedgerSnapshot};
use tally_domain::{Money, Person, Settlement};

use crate::text_table::{Alignment, TextTableBuilder};

const NO_PEOPLE: &str = "No expenses recorded.";
const ALL_SETTLED: &str = "Everyone is settled up.";
const NO_SETTLED: &str = "No settlements recorded.";
const NO_EXPENSES: &str = "No expenses stored.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonView {
    pub name: String,
    pub total_paid: String,
    pub total_owed: String,
    pub balance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementView {
    pub from: String,
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsView {
    pub total_expenses: usize,
    pub total_amount: String,
    pub pending_settlements: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettledView {
    pub id: u64,
    pub description: String,
    pub from: String,
    pub to: String,
    pub amount: String,
}

/// A stored expense as written, amounts unformatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseView {
    pub id: u64,
    pub description: String,
    pub amount: String,
    pub paid_by: String,
    pub split_with: Vec<String>,
    pub split_type: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub split_details: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotView {
    pub people: Vec<PersonView>,
    pub settlements: Vec<SettlementView>,
    pub stats: StatsView,
}

/// Renders ledger results as plain-text tables or JSON documents. Money is
/// printed with a fixed number of decimal places.
#[derive(Debug, Clone, Copy)]
pub struct LedgerPresenter {
    scale: usize,
}

impl Default for LedgerPresenter {
    fn default() -> Self {
        Self { scale: 2 }
    }
}

impl LedgerPresenter {
    pub fn new(scale: u32) -> Self {
        Self {
            scale: scale as usize,
        }
    }

    pub fn money(&self, amount: Money) -> String {
        format!("{:.*}", self.scale, amount)
    }

    fn signed(&self, amount: Money) -> String {
        if amount.is_negative() {
            self.money(amount)
        } else {
            format!("+{}", self.money(amount))
        }
    }

    pub fn person_views(&self, people: &[Person]) -> Vec<PersonView> {
        people
            .iter()
            .map(|person| PersonView {
                name: person.name.clone(),
                total_paid: self.money(person.total_paid),
                total_owed: self.money(person.total_owed),
                balance: self.money(person.balance),
            })
            .collect()
    }

    pub fn settlement_views(&self, settlements: &[Settlement]) -> Vec<SettlementView> {
        settlements
            .iter()
            .map(|settlement| SettlementView {
                from: settlement.from.clone(),
                to: settlement.to.clone(),
                amount: self.money(settlement.amount),
            })
            .collect()
    }

    pub fn stats_view(&self, stats: &DashboardStats) -> StatsView {
        StatsView {
            total_expenses: stats.total_expenses,
            total_amount: self.money(stats.total_amount),
            pending_settlements: stats.pending_settlements,
        }
    }

    pub fn settled_views(&self, rows: &[ExpenseRow]) -> Vec<SettledView> {
        rows.iter()
            .map(|row| SettledView {
                id: row.id,
                description: row.description.clone(),
                from: row.paid_by.clone(),
                to: row.split_with.join(", "),
                amount: row.amount.clone(),
            })
            .collect()
    }

    pub fn expense_views(&self, rows: &[ExpenseRow]) -> Vec<ExpenseView> {
        rows.iter()
            .map(|row| ExpenseView {
                id: row.id,
                description: row.description.clone(),
                amount: row.amount.clone(),
                paid_by: row.paid_by.clone(),
                split_with: row.split_with.clone(),
                split_type: row
                    .split_type
                    .as_deref()
                    .map(str::trim)
                    .filter(|split| !split.is_empty())
                    .unwrap_or("equal")
                    .to_owned(),
                split_details: row.split_details.clone(),
                category: row.category.clone(),
            })
            .collect()
    }

    pub fn snapshot_view(&self, snapshot: &LedgerSnapshot) -> SnapshotView {
        SnapshotView {
            people: self.person_views(&snapshot.people),
            settlements: self.settlement_views(&snapshot.settlements),
            stats: self.stats_view(&snapshot.stats),
        }
    }

    pub fn balance_table(&self, people: &[Person]) -> String {
        if people.is_empty() {
            return format!("{NO_PEOPLE}\n");
        }

        let mut builder = TextTableBuilder::new()
            .alignments(&[
                Alignment::Left,
                Alignment::Right,
                Alignment::Right,
                Alignment::Right,
            ])
            .headers(&[
                Cow::Borrowed("Person"),
                Cow::Borrowed("Paid"),
                Cow::Borrowed("Owed"),
                Cow::Borrowed("Balance"),
            ]);

        for person in people {
            builder = builder.row([
                Cow::Borrowed(person.name.as_str()),
                Cow::Owned(self.money(person.total_paid)),
                Cow::Owned(self.money(person.total_owed)),
                Cow::Owned(self.signed(person.balance)),
            ]);
        }

        builder.build()
    }

    pub fn settlement_table(&self, settlements: &[Settlement]) -> String {
        if settlements.is_empty() {
            return format!("{ALL_SETTLED}\n");
        }

        let mut builder = TextTableBuilder::new()
            .alignments(&[Alignment::Left, Alignment::Left, Alignment::Right])
            .headers(&[
                Cow::Borrowed("From"),
                Cow::Borrowed("To"),
                Cow::Borrowed("Amount"),
            ]);

        for settlement in settlements {
            builder = builder.row([
                Cow::Borrowed(settlement.from.as_str()),
                Cow::Borrowed(settlement.to.as_str()),
                Cow::Owned(self.money(settlement.amount)),
            ]);
        }

        builder.build()
    }

    pub fn stats_table(&self, stats: &DashboardStats) -> String {
        TextTableBuilder::new()
            .alignments(&[Alignment::Left, Alignment::Right])
            .headers(&[Cow::Borrowed("Statistic"), Cow::Borrowed("Value")])
            .row([
                Cow::Borrowed("Expenses"),
                Cow::Owned(stats.total_expenses.to_string()),
            ])
            .row([
                Cow::Borrowed("Total amount"),
                Cow::Owned(self.money(stats.total_amount)),
            ])
            .row([
                Cow::Borrowed("Pending settlements"),
                Cow::Owned(stats.pending_settlements.to_string()),
            ])
            .build()
    }

    pub fn settled_table(&self, rows: &[ExpenseRow]) -> String {
        if rows.is_empty() {
            return format!("{NO_SETTLED}\n");
        }

        let views = self.settled_views(rows);
        let mut builder = TextTableBuilder::new()
            .alignments(&[
                Alignment::Right,
                Alignment::Left,
                Alignment::Left,
                Alignment::Right,
            ])
            .headers(&[
                Cow::Borrowed("Id"),
                Cow::Borrowed("From"),
                Cow::Borrowed("To"),
                Cow::Borrowed("Amount"),
            ]);

        for view in &views {
            builder = builder.row([
                Cow::Owned(view.id.to_string()),
                Cow::Borrowed(view.from.as_str()),
                Cow::Borrowed(view.to.as_str()),
                Cow::Borrowed(view.amount.as_str()),
            ]);
        }

        builder.build()
    }

    pub fn expense_table(&self, rows: &[ExpenseRow]) -> String {
        if rows.is_empty() {
            return format!("{NO_EXPENSES}\n");
        }

        let views = self.expense_views(rows);
        let mut builder = TextTableBuilder::new()
            .alignments(&[
                Alignment::Right,
                Alignment::Left,
                Alignment::Left,
                Alignment::Right,
                Alignment::Left,
                Alignment::Left,
            ])
            .headers(&[
                Cow::Borrowed("Id"),
                Cow::Borrowed("Description"),
                Cow::Borrowed("Paid by"),
                Cow::Borrowed("Amount"),
                Cow::Borrowed("Split"),
                Cow::Borrowed("With"),
            ]);

        for view in &views {
            builder = builder.row([
                Cow::Owned(view.id.to_string()),
                Cow::Borrowed(view.description.as_str()),
                Cow::Borrowed(view.paid_by.as_str()),
                Cow::Borrowed(view.amount.as_str()),
                Cow::Borrowed(view.split_type.as_str()),
                Cow::Owned(view.split_with.join(", ")),
            ]);
        }

        builder.build()
    }

    pub fn snapshot_text(&self, snapshot: &LedgerSnapshot) -> String {
        [
            self.balance_table(&snapshot.people),
            self.settlement_table(&snapshot.settlements),
            self.stats_table(&snapshot.stats),
        ]
        .join("\n")
    }
}

/// Pretty-printed JSON with a trailing newline.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}
