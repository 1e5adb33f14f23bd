use fxhash::{FxHashMap, FxHashSet};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use std::{collections::hash_map::Entry, iter};
use thiserror::Error;

use crate::{
    context::LedgerContext,
    model::{Amount, ExpenseRecord, Money, PersonKey, PolicyMap, SplitPolicy},
    services::name_normalizer,
};

const MAX_SCALE: u32 = 28;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("expense has no participants after name normalization")]
    DegenerateSplit,
    #[error("expense payer name is blank")]
    MissingPayer,
    #[error(
        "split details for '{person}' conflict: '{first_raw}' = {first}, '{second_raw}' = {second}"
    )]
    AmbiguousPolicyMapping {
        person: String,
        first_raw: String,
        first: Decimal,
        second_raw: String,
        second: Decimal,
    },
    #[error("split shares add up to {actual} but the expense amount is {expected}")]
    PolicyTotalMismatch { expected: Money, actual: Money },
    #[error("split value {value} for '{raw}' is out of range (at most {max} either way)")]
    PolicyValueOutOfRange {
        raw: String,
        value: Decimal,
        max: Money,
    },
}

/// A resolved participant: its canonical key plus the first raw spelling seen
/// in the record (payer first, then the participant list).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant<'r> {
    pub key: PersonKey,
    pub raw: &'r str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    pub key: PersonKey,
    pub amount: Money,
}

/// Payer ∪ participants, normalized and de-duplicated in first-seen order.
/// Blank names are dropped.
pub fn resolve_participants(record: &ExpenseRecord) -> Vec<Participant<'_>> {
    let mut seen = FxHashSet::default();
    let mut resolved = Vec::with_capacity(record.participants.len() + 1);

    for raw in iter::once(record.payer.as_str()).chain(record.participants.iter().map(String::as_str))
    {
        let Some(key) = PersonKey::from_name(raw) else {
            continue;
        };
        if seen.insert(key.clone()) {
            resolved.push(Participant { key, raw });
        }
    }

    resolved
}

/// Computes each participant's owed share of one expense record.
///
/// Percentage and exact policy entries are matched to participants by
/// canonical key, so `"BOB"` in the policy map applies to participant
/// `"Bob"`. This is wider than a lookup by the participant's raw spelling,
/// which would give `"Bob"` nothing. Entries whose spellings collapse to one
/// key must agree, otherwise the split fails with
/// [`SplitError::AmbiguousPolicyMapping`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SplitCalculator {
    context: LedgerContext,
}

impl SplitCalculator {
    pub fn new(context: LedgerContext) -> Self {
        Self { context }
    }

    /// Resolves the record's participants and splits its amount among them.
    pub fn split(&self, record: &ExpenseRecord) -> Result<Vec<Share>, SplitError> {
        let participants = resolve_participants(record);
        self.shares(record, &participants)
    }

    /// Splits `record.amount` among `participants`.
    ///
    /// The returned shares always add up to the amount within the context
    /// tolerance: equal splits are exact by construction, policy splits are
    /// checked and rejected with [`SplitError::PolicyTotalMismatch`].
    pub fn shares(
        &self,
        record: &ExpenseRecord,
        participants: &[Participant<'_>],
    ) -> Result<Vec<Share>, SplitError> {
        if participants.is_empty() {
            return Err(SplitError::DegenerateSplit);
        }
        if PersonKey::from_name(&record.payer).is_none() {
            return Err(SplitError::MissingPayer);
        }

        let amount = record.amount.money();
        let shares = match &record.split_policy {
            SplitPolicy::Equal => {
                let each = amount.as_decimal() / Decimal::from(participants.len());
                self.apportion(
                    amount,
                    participants
                        .iter()
                        .map(|participant| (participant.key.clone(), each))
                        .collect(),
                )
            }
            SplitPolicy::Percentage(percentages) => {
                let lookup = PolicyLookup::build(percentages)?;
                self.apportion(
                    amount,
                    participants
                        .iter()
                        .map(|participant| {
                            let percent = lookup.value_for(&participant.key);
                            (
                                participant.key.clone(),
                                amount.as_decimal() * percent / Decimal::ONE_HUNDRED,
                            )
                        })
                        .collect(),
                )
            }
            SplitPolicy::Exact(amounts) => {
                let lookup = PolicyLookup::build(amounts)?;
                participants
                    .iter()
                    .map(|participant| Share {
                        key: participant.key.clone(),
                        amount: Money::from_decimal(lookup.value_for(&participant.key)),
                    })
                    .collect()
            }
        };

        self.ensure_total(amount, &shares)?;
        Ok(shares)
    }

    // Truncates every raw share to the atomic unit, then hands the units lost
    // to truncation back one each, largest remainder first. Earlier
    // participants win ties, so equal splits favour the payer.
    fn apportion(&self, amount: Money, raw: Vec<(PersonKey, Decimal)>) -> Vec<Share> {
        let scale = self
            .context
            .scale
            .max(amount.as_decimal().scale())
            .min(MAX_SCALE);
        let unit = Decimal::new(1, scale);

        let target = raw
            .iter()
            .map(|(_, value)| *value)
            .sum::<Decimal>()
            .round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
        let mut floors: Vec<Decimal> = raw
            .iter()
            .map(|(_, value)| value.round_dp_with_strategy(scale, RoundingStrategy::ToNegativeInfinity))
            .collect();
        let floor_total: Decimal = floors.iter().sum();
        let leftover_units = ((target - floor_total) / unit)
            .trunc()
            .to_usize()
            .unwrap_or(0);

        let mut order: Vec<usize> = (0..raw.len()).collect();
        order.sort_by(|&a, &b| (raw[b].1 - floors[b]).cmp(&(raw[a].1 - floors[a])));
        for &idx in order.iter().take(leftover_units) {
            floors[idx] += unit;
        }

        raw.into_iter()
            .zip(floors)
            .map(|((key, _), share)| Share {
                key,
                amount: Money::from_decimal(share),
            })
            .collect()
    }

    fn ensure_total(&self, expected: Money, shares: &[Share]) -> Result<(), SplitError> {
        let actual: Money = shares.iter().map(|share| share.amount).sum();
        if actual.within(expected, self.context.tolerance) {
            return Ok(());
        }

        tracing::error!(
            expected = %expected,
            actual = %actual,
            participant_count = shares.len(),
            "Split shares do not add up to the expense amount"
        );
        Err(SplitError::PolicyTotalMismatch { expected, actual })
    }
}

/// Policy values re-keyed by canonical person.
struct PolicyLookup<'m> {
    values: FxHashMap<PersonKey, (&'m str, Decimal)>,
}

impl<'m> PolicyLookup<'m> {
    fn build(policy: &'m PolicyMap) -> Result<Self, SplitError> {
        let max = Amount::max_money();
        let mut values: FxHashMap<PersonKey, (&'m str, Decimal)> = FxHashMap::default();

        for (raw, value) in policy {
            // Bounded like amounts so shares and their sum cannot overflow.
            if value.abs() > max.as_decimal() {
                return Err(SplitError::PolicyValueOutOfRange {
                    raw: raw.clone(),
                    value: *value,
                    max,
                });
            }
            let Some(key) = PersonKey::from_name(raw) else {
                continue;
            };
            match values.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert((raw.as_str(), *value));
                }
                Entry::Occupied(entry) => {
                    let (first_raw, first) = *entry.get();
                    if first != *value {
                        tracing::warn!(
                            person = %entry.key(),
                            first_raw,
                            first = %first,
                            second_raw = raw.as_str(),
                            second = %value,
                            "Conflicting split details for one person"
                        );
                        return Err(SplitError::AmbiguousPolicyMapping {
                            person: name_normalizer::display_form(first_raw),
                            first_raw: first_raw.to_owned(),
                            first,
                            second_raw: raw.clone(),
                            second: *value,
                        });
                    }
                }
            }
        }

        Ok(Self { values })
    }

    fn value_for(&self, key: &PersonKey) -> Decimal {
        self.values
            .get(key)
            .map(|(_, value)| *value)
            .unwrap_or(Decimal::ZERO)
    }
}
