use std::str::FromStr;

use rust_decimal::RoundingStrategy;
use thiserror::Error;

use crate::model::Money;

/// Rounding mode applied when totals are reported at the ledger scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoundingMode {
    /// Round half away from zero (0.005 -> 0.01, -0.005 -> -0.01).
    #[default]
    HalfUp,
    /// Round half to even (banker's rounding).
    HalfEven,
}

impl RoundingMode {
    pub fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rounding mode '{0}' (expected 'half-up' or 'half-even')")]
pub struct UnknownRoundingMode(pub String);

impl FromStr for RoundingMode {
    type Err = UnknownRoundingMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "half-up" | "halfup" => Ok(RoundingMode::HalfUp),
            "half-even" | "halfeven" | "bankers" => Ok(RoundingMode::HalfEven),
            _ => Err(UnknownRoundingMode(s.to_owned())),
        }
    }
}

/// Context shared by the split calculator, the aggregator and the planner.
///
/// # Example
/// ```
/// use tally_domain::{LedgerContext, Money, RoundingMode};
///
/// let ctx = LedgerContext {
///     rounding_mode: RoundingMode::HalfEven,
///     ..LedgerContext::default()
/// };
/// assert_eq!(ctx.round(Money::new(1125, 3)), Money::new(112, 2));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerContext {
    /// Decimal places of the reported amounts (2 for cents).
    pub scale: u32,
    pub rounding_mode: RoundingMode,
    /// Balances and residues below this magnitude count as settled.
    pub tolerance: Money,
}

impl LedgerContext {
    /// Two decimal places, half away from zero, one-cent tolerance.
    pub fn cents() -> Self {
        Self {
            scale: 2,
            rounding_mode: RoundingMode::HalfUp,
            tolerance: Money::new(1, 2),
        }
    }

    pub fn round(self, amount: Money) -> Money {
        amount.round_dp_with_strategy(self.scale, self.rounding_mode.strategy())
    }
}

impl Default for LedgerContext {
    fn default() -> Self {
        Self::cents()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::half_up_midpoint(RoundingMode::HalfUp, Money::new(1125, 3), Money::new(113, 2))]
    #[case::half_up_negative(RoundingMode::HalfUp, Money::new(-1125, 3), Money::new(-113, 2))]
    #[case::half_even_midpoint(RoundingMode::HalfEven, Money::new(1125, 3), Money::new(112, 2))]
    #[case::half_even_odd(RoundingMode::HalfEven, Money::new(1135, 3), Money::new(114, 2))]
    #[case::already_rounded(RoundingMode::HalfUp, Money::from_i64(300), Money::from_i64(300))]
    fn rounds_to_cents(#[case] mode: RoundingMode, #[case] input: Money, #[case] expected: Money) {
        let context = LedgerContext {
            rounding_mode: mode,
            ..LedgerContext::cents()
        };
        assert_eq!(context.round(input), expected);
    }

    #[rstest]
    #[case("half-up", RoundingMode::HalfUp)]
    #[case("HALF_UP", RoundingMode::HalfUp)]
    #[case(" half-even ", RoundingMode::HalfEven)]
    #[case("bankers", RoundingMode::HalfEven)]
    fn parses_rounding_mode(#[case] raw: &str, #[case] expected: RoundingMode) {
        assert_eq!(raw.parse::<RoundingMode>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_rounding_mode() {
        assert_eq!(
            "ceiling".parse::<RoundingMode>(),
            Err(UnknownRoundingMode("ceiling".to_owned()))
        );
    }
}
