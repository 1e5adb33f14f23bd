use fxhash::FxHashMap;
use thiserror::Error;

use crate::{
    context::LedgerContext,
    model::{ExpenseRecord, Money, Person, PersonKey},
    services::{
        name_normalizer::NameRegistry,
        split_calculator::{Share, SplitCalculator, SplitError},
    },
};

/// A record that could not be folded into the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expense #{index}: {error}")]
pub struct RecordRejection {
    /// Position of the record in the aggregated slice.
    pub index: usize,
    #[source]
    pub error: SplitError,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Aggregation {
    pub people: Vec<Person>,
    pub rejected: Vec<RecordRejection>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Totals {
    paid: Money,
    owed: Money,
}

/// Running per-person totals keyed by canonical name.
#[derive(Debug, Default)]
pub struct BalanceAccumulator {
    names: NameRegistry,
    totals: FxHashMap<PersonKey, Totals>,
}

impl BalanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the payer and every participant with zeroed totals.
    pub fn register(&mut self, record: &ExpenseRecord) {
        for raw in std::iter::once(&record.payer).chain(&record.participants) {
            if let Some(key) = self.names.register(raw) {
                self.totals.entry(key).or_default();
            }
        }
    }

    /// Credits the payer with the amount and charges each share.
    pub fn apply(&mut self, record: &ExpenseRecord, shares: &[Share]) {
        if let Some(payer) = self.names.register(&record.payer) {
            self.totals.entry(payer).or_default().paid += record.amount.money();
        }
        for share in shares {
            self.totals.entry(share.key.clone()).or_default().owed += share.amount;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Finalizes balances in first-seen order, rounded at the context scale.
    pub fn into_people(self, context: LedgerContext) -> Vec<Person> {
        self.names
            .iter()
            .map(|(key, name)| {
                let totals = self.totals.get(key).copied().unwrap_or_default();
                Person {
                    name: name.to_owned(),
                    total_paid: context.round(totals.paid),
                    total_owed: context.round(totals.owed),
                    balance: context.round(totals.paid - totals.owed),
                }
            })
            .collect()
    }
}

/// Folds expense records into per-person paid / owed / balance totals.
#[derive(Clone, Copy, Debug, Default)]
pub struct LedgerAggregator {
    context: LedgerContext,
}

impl LedgerAggregator {
    pub fn new(context: LedgerContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> LedgerContext {
        self.context
    }

    /// Aggregates every record, failing on the first one that cannot be split.
    pub fn aggregate(&self, records: &[ExpenseRecord]) -> Result<Vec<Person>, RecordRejection> {
        let calculator = SplitCalculator::new(self.context);
        let splits = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                calculator
                    .split(record)
                    .map(|shares| (record, shares))
                    .map_err(|error| RecordRejection { index, error })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.fold(&splits))
    }

    /// Aggregates the records that can be split and reports the rest.
    ///
    /// People are registered only from accepted records, so a rejected record
    /// never introduces a zero-balance person.
    pub fn aggregate_skipping_invalid(&self, records: &[ExpenseRecord]) -> Aggregation {
        let calculator = SplitCalculator::new(self.context);
        let mut splits = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match calculator.split(record) {
                Ok(shares) => splits.push((record, shares)),
                Err(error) => {
                    tracing::warn!(index, error = %error, "Skipping expense that cannot be split");
                    rejected.push(RecordRejection { index, error });
                }
            }
        }

        Aggregation {
            people: self.fold(&splits),
            rejected,
        }
    }

    fn fold(&self, splits: &[(&ExpenseRecord, Vec<Share>)]) -> Vec<Person> {
        let mut accumulator = BalanceAccumulator::new();
        for (record, _) in splits {
            accumulator.register(record);
        }
        if accumulator.is_empty() {
            return Vec::new();
        }

        for (record, shares) in splits {
            accumulator.apply(record, shares);
        }

        let people = accumulator.into_people(self.context);
        tracing::debug!(
            record_count = splits.len(),
            person_count = people.len(),
            "Ledger aggregated"
        );
        people
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, PolicyMap, SplitPolicy};
    use rstest::{fixture, rstest};
    use rust_decimal::Decimal;

    #[fixture]
    fn aggregator() -> LedgerAggregator {
        LedgerAggregator::default()
    }

    fn equal(amount: &str, payer: &str, participants: &[&str]) -> ExpenseRecord {
        ExpenseRecord::equal(
            Amount::parse(amount).expect("valid amount"),
            payer,
            participants.iter().copied(),
        )
    }

    fn balances(people: &[Person]) -> Vec<(&str, Money)> {
        people
            .iter()
            .map(|person| (person.name.as_str(), person.balance))
            .collect()
    }

    #[rstest]
    fn equal_split_balances(aggregator: LedgerAggregator) {
        let people = aggregator
            .aggregate(&[equal("900", "A", &["A", "B", "C"])])
            .expect("aggregation should succeed");

        assert_eq!(
            people,
            vec![
                Person {
                    name: "A".to_owned(),
                    total_paid: Money::from_i64(900),
                    total_owed: Money::from_i64(300),
                    balance: Money::from_i64(600),
                },
                Person {
                    name: "B".to_owned(),
                    total_paid: Money::ZERO,
                    total_owed: Money::from_i64(300),
                    balance: Money::from_i64(-300),
                },
                Person {
                    name: "C".to_owned(),
                    total_paid: Money::ZERO,
                    total_owed: Money::from_i64(300),
                    balance: Money::from_i64(-300),
                },
            ]
        );
    }

    #[rstest]
    fn empty_input_yields_no_people(aggregator: LedgerAggregator) {
        assert_eq!(aggregator.aggregate(&[]), Ok(Vec::new()));
    }

    #[rstest]
    fn names_merge_across_spellings(aggregator: LedgerAggregator) {
        let people = aggregator
            .aggregate(&[
                equal("60", "sam", &["Kim"]),
                equal("40", " SAM ", &["kim "]),
            ])
            .expect("aggregation should succeed");

        assert_eq!(
            balances(&people),
            vec![("Sam", Money::from_i64(50)), ("Kim", Money::from_i64(-50))]
        );
    }

    #[rstest]
    fn output_keeps_first_seen_order(aggregator: LedgerAggregator) {
        let people = aggregator
            .aggregate(&[
                equal("30", "zoe", &["yan"]),
                equal("30", "adam", &["zoe", "bea"]),
            ])
            .expect("aggregation should succeed");

        let names: Vec<&str> = people.iter().map(|person| person.name.as_str()).collect();
        assert_eq!(names, vec!["Zoe", "Yan", "Adam", "Bea"]);
    }

    #[rstest]
    fn uneven_split_conserves_money(aggregator: LedgerAggregator) {
        let people = aggregator
            .aggregate(&[equal("100", "A", &["B", "C", "D", "E", "F", "G"])])
            .expect("aggregation should succeed");

        let paid: Money = people.iter().map(|person| person.total_paid).sum();
        let owed: Money = people.iter().map(|person| person.total_owed).sum();
        let balance: Money = people.iter().map(|person| person.balance).sum();
        assert_eq!(paid, owed);
        assert_eq!(balance, Money::ZERO);
    }

    #[rstest]
    fn percentage_scenario(aggregator: LedgerAggregator) {
        let record = ExpenseRecord::new(
            Amount::parse("1000").expect("valid amount"),
            "A",
            ["A", "B"],
            SplitPolicy::Percentage(PolicyMap::from_iter([
                ("A".to_owned(), Decimal::from(30)),
                ("B".to_owned(), Decimal::from(70)),
            ])),
        );

        let people = aggregator
            .aggregate(&[record])
            .expect("aggregation should succeed");

        assert_eq!(
            balances(&people),
            vec![("A", Money::from_i64(700)), ("B", Money::from_i64(-700))]
        );
    }

    #[rstest]
    fn totals_are_rounded_to_cents(aggregator: LedgerAggregator) {
        let record = ExpenseRecord::new(
            Amount::parse("10").expect("valid amount"),
            "A",
            ["B"],
            SplitPolicy::Exact(PolicyMap::from_iter([
                ("A".to_owned(), Decimal::new(3335, 3)),
                ("B".to_owned(), Decimal::new(6665, 3)),
            ])),
        );

        let people = aggregator
            .aggregate(&[record])
            .expect("aggregation should succeed");

        assert_eq!(people[0].total_owed, Money::new(334, 2));
        assert_eq!(people[0].balance, Money::new(667, 2));
        assert_eq!(people[1].total_owed, Money::new(667, 2));
        assert_eq!(people[1].balance, Money::new(-667, 2));
    }

    #[rstest]
    fn strict_aggregation_reports_failing_record(aggregator: LedgerAggregator) {
        let err = aggregator
            .aggregate(&[equal("10", "A", &["B"]), equal("10", " ", &[""])])
            .expect_err("second record is degenerate");

        assert_eq!(
            err,
            RecordRejection {
                index: 1,
                error: SplitError::DegenerateSplit,
            }
        );
    }

    #[rstest]
    fn lenient_aggregation_skips_failing_records(aggregator: LedgerAggregator) {
        let conflicting = ExpenseRecord::new(
            Amount::parse("10").expect("valid amount"),
            "Ghost",
            ["A"],
            SplitPolicy::Exact(PolicyMap::from_iter([
                ("a".to_owned(), Decimal::from(4)),
                ("A".to_owned(), Decimal::from(6)),
            ])),
        );

        let aggregation = aggregator.aggregate_skipping_invalid(&[
            equal("10", "A", &["B"]),
            conflicting,
            equal("10", "B", &["A"]),
        ]);

        assert_eq!(
            balances(&aggregation.people),
            vec![("A", Money::ZERO), ("B", Money::ZERO)]
        );
        assert_eq!(aggregation.rejected.len(), 1);
        assert_eq!(aggregation.rejected[0].index, 1);
        assert!(matches!(
            aggregation.rejected[0].error,
            SplitError::AmbiguousPolicyMapping { .. }
        ));
    }

    #[rstest]
    fn largest_amounts_accumulate_without_overflow(aggregator: LedgerAggregator) {
        let records: Vec<ExpenseRecord> = (0..1_000)
            .map(|_| equal("99999999.99", "A", &["B"]))
            .collect();

        let people = aggregator
            .aggregate(&records)
            .expect("aggregation should succeed");

        assert_eq!(people[0].total_paid, Money::new(9_999_999_999_000, 2));
        assert_eq!(
            balances(&people),
            vec![
                ("A", Money::new(4_999_999_999_000, 2)),
                ("B", Money::new(-4_999_999_999_000, 2)),
            ]
        );
    }
}
