//! Display scaling of raw point balances.
//!
//! Balances are stored as whole experience points. A [`ScaleMethod`] maps
//! that raw count to the amount players read and type, and back:
//!
//! | Method | Scale | Rounding | Raw `1234` displays as |
//! |--------|-------|----------|------------------------|
//! | [`ScaleMethod::Points`] | 0 | half up | `1,234` |
//! | [`ScaleMethod::Levels`] | 2 | toward zero | `12.34` |

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// How raw points are scaled and rounded for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMethod {
    /// Whole points, rounded half up.
    #[default]
    Points,
    /// Points divided by 100, truncated to two decimal places.
    Levels,
}

/// Singular and plural currency unit names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyNames {
    /// Name used when the amount is exactly one.
    pub singular: String,
    /// Name used for every other amount.
    pub plural: String,
}

impl CurrencyNames {
    /// Create a pair of unit names.
    pub fn new(singular: &str, plural: &str) -> Self {
        Self {
            singular: singular.to_owned(),
            plural: plural.to_owned(),
        }
    }
}

impl ScaleMethod {
    /// Number of decimal places shown.
    pub const fn scale(self) -> u32 {
        match self {
            Self::Points => 0,
            Self::Levels => 2,
        }
    }

    /// Rounding applied when converting a display amount to raw points.
    pub const fn rounding(self) -> RoundingStrategy {
        match self {
            Self::Points => RoundingStrategy::MidpointAwayFromZero,
            Self::Levels => RoundingStrategy::ToZero,
        }
    }

    /// Unit names used when the configuration does not override them.
    pub fn default_names(self) -> CurrencyNames {
        match self {
            Self::Points => CurrencyNames::new("Point", "Points"),
            Self::Levels => CurrencyNames::new("Level", "Levels"),
        }
    }

    /// Raw points as a display amount with exactly [`scale`](Self::scale)
    /// decimal places.
    pub fn to_display(self, raw: u64) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(raw), self.scale())
    }

    /// Display amount to raw points, rounded per the method.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NegativeAmount`] for negative input and
    /// [`LedgerError::AmountOutOfRange`] if the result does not fit a `u64`.
    pub fn to_raw(self, display: Decimal) -> Result<u64, LedgerError> {
        if display.is_zero() {
            return Ok(0);
        }
        if display.is_sign_negative() {
            return Err(LedgerError::NegativeAmount { amount: display });
        }
        Decimal::from(10_u64.pow(self.scale()))
            .checked_mul(display)
            .map(|scaled| scaled.round_dp_with_strategy(0, self.rounding()))
            .and_then(|scaled| scaled.to_u64())
            .ok_or(LedgerError::AmountOutOfRange { amount: display })
    }

    /// Render a display amount with thousands separators and, if `names`
    /// is given, the unit name.
    ///
    /// The amount is first fixed to the method's decimal places. The
    /// singular name is used only when that fixed amount equals one.
    pub fn format(self, display: Decimal, names: Option<&CurrencyNames>) -> String {
        let mut fixed = display.round_dp_with_strategy(self.scale(), self.rounding());
        fixed.rescale(self.scale());

        let text = fixed.abs().to_string();
        let (whole, fraction) = match text.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (text.as_str(), None),
        };

        let mut out = String::with_capacity(text.len().saturating_add(16));
        if fixed.is_sign_negative() && !fixed.is_zero() {
            out.push('-');
        }
        out.push_str(&group_thousands(whole));
        if let Some(fraction) = fraction {
            out.push('.');
            out.push_str(fraction);
        }

        if let Some(names) = names {
            out.push(' ');
            if fixed == Decimal::ONE {
                out.push_str(&names.singular);
            } else {
                out.push_str(&names.plural);
            }
        }
        out
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.chars().count();
    let mut out = String::with_capacity(len.saturating_add(len / 3));
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len.saturating_sub(i)) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn points_display_is_the_raw_count() {
        assert_eq!(ScaleMethod::Points.to_display(1234), dec!(1234));
        assert_eq!(ScaleMethod::Points.to_display(0), Decimal::ZERO);
    }

    #[test]
    fn levels_display_divides_by_one_hundred() {
        assert_eq!(ScaleMethod::Levels.to_display(1234), dec!(12.34));
        assert_eq!(ScaleMethod::Levels.to_display(5).to_string(), "0.05");
        assert_eq!(ScaleMethod::Levels.to_display(100).to_string(), "1.00");
    }

    #[test]
    fn points_round_half_up() {
        assert_eq!(ScaleMethod::Points.to_raw(dec!(2.5)).unwrap(), 3);
        assert_eq!(ScaleMethod::Points.to_raw(dec!(2.49)).unwrap(), 2);
        assert_eq!(ScaleMethod::Points.to_raw(dec!(10)).unwrap(), 10);
    }

    #[test]
    fn levels_round_toward_zero() {
        assert_eq!(ScaleMethod::Levels.to_raw(dec!(12.349)).unwrap(), 1234);
        assert_eq!(ScaleMethod::Levels.to_raw(dec!(0.009)).unwrap(), 0);
        assert_eq!(ScaleMethod::Levels.to_raw(dec!(3)).unwrap(), 300);
    }

    #[test]
    fn negative_input_is_rejected() {
        for method in [ScaleMethod::Points, ScaleMethod::Levels] {
            assert!(matches!(
                method.to_raw(dec!(-1)),
                Err(LedgerError::NegativeAmount { .. })
            ));
        }
        assert_eq!(ScaleMethod::Points.to_raw(dec!(-0)).unwrap(), 0);
    }

    #[test]
    fn oversized_input_is_out_of_range() {
        let huge = Decimal::from(u64::MAX) * dec!(10);
        assert!(matches!(
            ScaleMethod::Points.to_raw(huge),
            Err(LedgerError::AmountOutOfRange { .. })
        ));
    }

    #[test]
    fn raw_roundtrips_through_display() {
        for raw in (0..5_000).chain([u64::from(u32::MAX), 10_000_000_007]) {
            for method in [ScaleMethod::Points, ScaleMethod::Levels] {
                assert_eq!(method.to_raw(method.to_display(raw)).unwrap(), raw);
            }
        }
    }

    #[test]
    fn format_groups_thousands() {
        assert_eq!(ScaleMethod::Points.format(dec!(1234567), None), "1,234,567");
        assert_eq!(ScaleMethod::Points.format(dec!(999), None), "999");
        assert_eq!(ScaleMethod::Points.format(dec!(1000), None), "1,000");
        assert_eq!(ScaleMethod::Levels.format(dec!(12345.6), None), "12,345.60");
        assert_eq!(ScaleMethod::Levels.format(dec!(0.129), None), "0.12");
    }

    #[test]
    fn format_picks_singular_only_for_exactly_one() {
        let points = ScaleMethod::Points.default_names();
        let levels = ScaleMethod::Levels.default_names();
        assert_eq!(ScaleMethod::Points.format(dec!(1), Some(&points)), "1 Point");
        assert_eq!(ScaleMethod::Points.format(dec!(2), Some(&points)), "2 Points");
        assert_eq!(ScaleMethod::Points.format(dec!(0), Some(&points)), "0 Points");
        assert_eq!(ScaleMethod::Levels.format(dec!(1), Some(&levels)), "1.00 Level");
        assert_eq!(ScaleMethod::Levels.format(dec!(1.01), Some(&levels)), "1.01 Levels");
    }

    #[test]
    fn format_keeps_sign_for_negative_amounts() {
        assert_eq!(ScaleMethod::Points.format(dec!(-1500), None), "-1,500");
    }

    #[test]
    fn deserializes_from_lowercase_name() {
        let method: ScaleMethod = serde_json::from_str("\"levels\"").unwrap();
        assert_eq!(method, ScaleMethod::Levels);
    }
}
