use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use rust_decimal::Decimal;
use tally_domain::{
    Amount, ExpenseRecord, LedgerContext, Money, Person, PolicyMap, Settlement, SplitPolicy,
};

use crate::error::{IngestError, RowRejection};

pub const SETTLEMENT_PREFIX: &str = "Settlement:";
pub const SETTLEMENT_CATEGORY: &str = "Other";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitType {
    Equal,
    Percentage,
    Exact,
}

impl SplitType {
    pub fn as_str(self) -> &'static str {
        match self {
            SplitType::Equal => "equal",
            SplitType::Percentage => "percentage",
            SplitType::Exact => "exact",
        }
    }
}

impl fmt::Display for SplitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitType {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" => Ok(SplitType::Equal),
            "percentage" => Ok(SplitType::Percentage),
            "exact" => Ok(SplitType::Exact),
            _ => Err(IngestError::UnknownSplitType(s.to_owned())),
        }
    }
}

/// An expense as it is stored: monetary values and split details are still
/// raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpenseRow {
    pub id: u64,
    pub amount: String,
    pub description: String,
    pub paid_by: String,
    pub split_with: Vec<String>,
    /// `None` or empty means an equal split.
    pub split_type: Option<String>,
    pub split_details: IndexMap<String, String>,
    pub category: Option<String>,
}

impl ExpenseRow {
    /// Validates the row into a record the ledger can fold.
    pub fn to_record(&self) -> Result<ExpenseRecord, IngestError> {
        ingest(
            &self.amount,
            &self.paid_by,
            &self.split_with,
            self.split_type.as_deref(),
            &self.split_details,
        )
    }

    pub fn split_type(&self) -> Result<SplitType, IngestError> {
        parse_split_type(self.split_type.as_deref())
    }

    pub fn is_settlement(&self) -> bool {
        self.description.starts_with(SETTLEMENT_PREFIX)
    }
}

fn ingest(
    amount: &str,
    paid_by: &str,
    split_with: &[String],
    split_type: Option<&str>,
    split_details: &IndexMap<String, String>,
) -> Result<ExpenseRecord, IngestError> {
    let amount = Amount::parse(amount)?;
    let split_policy = match parse_split_type(split_type)? {
        SplitType::Equal => SplitPolicy::Equal,
        SplitType::Percentage => SplitPolicy::Percentage(policy_map(split_details)?),
        SplitType::Exact => SplitPolicy::Exact(policy_map(split_details)?),
    };

    Ok(ExpenseRecord::new(
        amount,
        paid_by,
        split_with.iter().map(String::as_str),
        split_policy,
    ))
}

fn parse_split_type(raw: Option<&str>) -> Result<SplitType, IngestError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(SplitType::Equal),
        Some(raw) => raw.parse(),
    }
}

fn policy_map(details: &IndexMap<String, String>) -> Result<PolicyMap, IngestError> {
    details
        .iter()
        .map(|(name, value)| {
            Decimal::from_str(value.trim())
                .map(|value| (name.clone(), value))
                .map_err(|_| IngestError::InvalidSplitValue {
                    name: name.clone(),
                    value: value.clone(),
                })
        })
        .collect()
}

/// An expense waiting for the store to assign its id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewExpense {
    pub amount: String,
    pub description: String,
    pub paid_by: String,
    pub split_with: Vec<String>,
    pub split_type: Option<String>,
    pub split_details: IndexMap<String, String>,
    pub category: Option<String>,
}

impl NewExpense {
    /// Validates the expense the same way a stored row is validated.
    pub fn to_record(&self) -> Result<ExpenseRecord, IngestError> {
        ingest(
            &self.amount,
            &self.paid_by,
            &self.split_with,
            self.split_type.as_deref(),
            &self.split_details,
        )
    }

    /// The exact-split row recording that `settlement` was paid.
    pub fn settlement(settlement: &Settlement, context: LedgerContext) -> Self {
        let amount = format!(
            "{:.*}",
            context.scale as usize,
            context.round(settlement.amount)
        );
        Self {
            description: format!(
                "{SETTLEMENT_PREFIX} {} paid {}",
                settlement.from, settlement.to
            ),
            paid_by: settlement.from.clone(),
            split_with: vec![settlement.to.clone()],
            split_type: Some(SplitType::Exact.as_str().to_owned()),
            split_details: IndexMap::from_iter([(settlement.to.clone(), amount.clone())]),
            category: Some(SETTLEMENT_CATEGORY.to_owned()),
            amount,
        }
    }

    pub fn into_row(self, id: u64) -> ExpenseRow {
        ExpenseRow {
            id,
            amount: self.amount,
            description: self.description,
            paid_by: self.paid_by,
            split_with: self.split_with,
            split_type: self.split_type,
            split_details: self.split_details,
            category: self.category,
        }
    }
}

/// Fields to change on a stored expense; `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpensePatch {
    pub amount: Option<String>,
    pub description: Option<String>,
    pub paid_by: Option<String>,
    pub split_with: Option<Vec<String>>,
    pub split_type: Option<String>,
    pub split_details: Option<IndexMap<String, String>>,
    pub category: Option<String>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The expense that results from applying the patch to `row`.
    pub fn apply(self, row: &ExpenseRow) -> NewExpense {
        NewExpense {
            amount: self.amount.unwrap_or_else(|| row.amount.clone()),
            description: self.description.unwrap_or_else(|| row.description.clone()),
            paid_by: self.paid_by.unwrap_or_else(|| row.paid_by.clone()),
            split_with: self.split_with.unwrap_or_else(|| row.split_with.clone()),
            split_type: self.split_type.or_else(|| row.split_type.clone()),
            split_details: self
                .split_details
                .unwrap_or_else(|| row.split_details.clone()),
            category: self.category.or_else(|| row.category.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total_expenses: usize,
    pub total_amount: Money,
    pub pending_settlements: usize,
}

/// What happens to a row that cannot be ingested or split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordPolicy {
    /// The whole request fails with the first rejected row.
    #[default]
    Strict,
    /// Rejected rows are logged and left out of every total.
    SkipInvalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerConfig {
    pub context: LedgerContext,
    pub record_policy: RecordPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerSnapshot {
    pub people: Vec<Person>,
    pub settlements: Vec<Settlement>,
    pub stats: DashboardStats,
    /// Rows left out under `RecordPolicy::SkipInvalid`.
    pub skipped: Vec<RowRejection>,
}
