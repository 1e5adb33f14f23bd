use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use indexmap::IndexMap;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::services::name_normalizer;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn zero() -> Self {
        Self::ZERO
    }

    /// `Money::new(12345, 2)` is 123.45.
    pub fn new(num: i64, scale: u32) -> Self {
        Self(Decimal::new(num, scale))
    }

    pub fn from_i64(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn round_dp_with_strategy(self, scale: u32, strategy: RoundingStrategy) -> Self {
        Self(self.0.round_dp_with_strategy(scale, strategy))
    }

    /// True when `self` and `other` differ by at most `tolerance`.
    pub fn within(self, other: Self, tolerance: Self) -> bool {
        (self - other).abs() <= tolerance
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidAmount {
    #[error("'{raw}' is not a positive amount")]
    NotPositive { raw: String },
    #[error("'{raw}' exceeds the largest accepted amount {max}")]
    TooLarge { raw: String, max: Money },
}

impl InvalidAmount {
    fn with_raw(self, raw: &str) -> Self {
        let raw = raw.to_owned();
        match self {
            InvalidAmount::NotPositive { .. } => InvalidAmount::NotPositive { raw },
            InvalidAmount::TooLarge { max, .. } => InvalidAmount::TooLarge { raw, max },
        }
    }
}

/// A strictly positive monetary amount, validated at the ingestion boundary.
///
/// Amounts are capped at [`Amount::max_money`] (99,999,999.99) so that ledger
/// totals stay far inside `Decimal`'s range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Money);

impl Amount {
    pub fn parse(raw: &str) -> Result<Self, InvalidAmount> {
        let value = Decimal::from_str(raw.trim()).map_err(|_| InvalidAmount::NotPositive {
            raw: raw.to_owned(),
        })?;
        Self::try_from(value).map_err(|err| err.with_raw(raw))
    }

    /// Eight integer digits and two decimals.
    pub fn max_money() -> Money {
        Money::new(9_999_999_999, 2)
    }

    pub fn money(self) -> Money {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = InvalidAmount;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        let max = Self::max_money();
        if value <= Decimal::ZERO {
            Err(InvalidAmount::NotPositive {
                raw: value.to_string(),
            })
        } else if value > max.as_decimal() {
            Err(InvalidAmount::TooLarge {
                raw: value.to_string(),
                max,
            })
        } else {
            Ok(Self(Money(value)))
        }
    }
}

impl TryFrom<Money> for Amount {
    type Error = InvalidAmount;

    fn try_from(value: Money) -> Result<Self, Self::Error> {
        Self::try_from(value.as_decimal())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Canonical identity of a person: the trimmed, lower-cased name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PersonKey(String);

impl PersonKey {
    /// Returns `None` for empty or all-whitespace names.
    pub fn from_name(name: &str) -> Option<Self> {
        let key = name_normalizer::canonical_key(name);
        if key.is_empty() { None } else { Some(Self(key)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Policy values keyed by the caller's raw participant names.
pub type PolicyMap = IndexMap<String, Decimal>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SplitPolicy {
    #[default]
    Equal,
    Percentage(PolicyMap),
    Exact(PolicyMap),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseRecord {
    pub amount: Amount,
    pub payer: String,
    /// The payer is always an implicit participant, listed here or not.
    pub participants: Vec<String>,
    pub split_policy: SplitPolicy,
}

impl ExpenseRecord {
    pub fn new<P, I, S>(amount: Amount, payer: P, participants: I, split_policy: SplitPolicy) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            amount,
            payer: payer.into(),
            participants: participants.into_iter().map(Into::into).collect(),
            split_policy,
        }
    }

    pub fn equal<P, I, S>(amount: Amount, payer: P, participants: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(amount, payer, participants, SplitPolicy::Equal)
    }

    /// The record that marks `settlement` as paid: `from` pays `to` the full
    /// amount, owed entirely by `to`.
    pub fn settlement_payment(settlement: &Settlement) -> Result<Self, InvalidAmount> {
        let amount = Amount::try_from(settlement.amount)?;
        let details = PolicyMap::from_iter([(settlement.to.clone(), amount.money().as_decimal())]);
        Ok(Self::new(
            amount,
            settlement.from.clone(),
            [settlement.to.clone()],
            SplitPolicy::Exact(details),
        ))
    }
}

/// Per-person totals derived from the full record collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub total_paid: Money,
    pub total_owed: Money,
    /// `total_paid - total_owed`; positive means the group owes this person.
    pub balance: Money,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub from: String,
    pub to: String,
    pub amount: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::integer("900", Money::from_i64(900))]
    #[case::cents("12.50", Money::new(1250, 2))]
    #[case::padded("  42.1 ", Money::new(421, 1))]
    fn parses_positive_amounts(#[case] raw: &str, #[case] expected: Money) {
        assert_eq!(Amount::parse(raw).map(Amount::money), Ok(expected));
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    #[case::zero("0")]
    #[case::negative("-5")]
    #[case::text("twelve")]
    #[case::trailing_garbage("12abc")]
    #[case::nan("NaN")]
    fn rejects_invalid_amounts(#[case] raw: &str) {
        assert_eq!(
            Amount::parse(raw),
            Err(InvalidAmount::NotPositive {
                raw: raw.to_owned()
            })
        );
    }

    #[rstest]
    #[case::just_over("100000000")]
    #[case::huge("50000000000000000000000000000")]
    fn rejects_amounts_beyond_the_cap(#[case] raw: &str) {
        assert_eq!(
            Amount::parse(raw),
            Err(InvalidAmount::TooLarge {
                raw: raw.to_owned(),
                max: Money::new(9_999_999_999, 2),
            })
        );
    }

    #[test]
    fn accepts_the_largest_amount() {
        let amount = Amount::parse("99999999.99").expect("at the cap");
        assert_eq!(amount.money(), Amount::max_money());
    }

    #[test]
    fn money_equality_ignores_scale() {
        assert_eq!(Money::from_i64(300), Money::new(30000, 2));
        assert!(Money::new(1001, 2).within(Money::from_i64(10), Money::new(1, 2)));
        assert!(!Money::new(1002, 2).within(Money::from_i64(10), Money::new(1, 2)));
    }

    #[test]
    fn person_key_rejects_blank_names() {
        assert_eq!(PersonKey::from_name(" \t "), None);
        assert_eq!(
            PersonKey::from_name("  Sam ").as_ref().map(PersonKey::as_str),
            Some("sam")
        );
    }

    #[test]
    fn settlement_payment_is_exact_split_owed_by_recipient() {
        let settlement = Settlement {
            from: "Bob".to_owned(),
            to: "Alice".to_owned(),
            amount: Money::from_i64(700),
        };

        let record = ExpenseRecord::settlement_payment(&settlement).expect("positive amount");

        assert_eq!(record.payer, "Bob");
        assert_eq!(record.participants, vec!["Alice".to_owned()]);
        assert_eq!(record.amount.money(), Money::from_i64(700));
        assert_eq!(
            record.split_policy,
            SplitPolicy::Exact(PolicyMap::from_iter([(
                "Alice".to_owned(),
                Decimal::from(700)
            )]))
        );
    }
}
