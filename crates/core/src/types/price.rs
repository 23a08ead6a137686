//! Vietnamese dong amounts and their display format.
//!
//! The backend stores every amount in whole dong. Amounts arrive as JSON
//! numbers or strings, so [`Money`] wraps a [`Decimal`] and rounds to whole
//! dong whenever a fractional value shows up (percentage discounts, bad
//! upstream data).

use core::fmt;
use core::ops::{Add, Sub};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Currency suffix used by the vi-VN locale.
pub const CURRENCY_SYMBOL: &str = "₫";

/// Errors that can occur when parsing a [`Money`] amount from user input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input string is empty.
    #[error("amount cannot be empty")]
    Empty,
    /// The input is not a number.
    #[error("amount must be a number")]
    NotANumber,
    /// The amount is negative.
    #[error("amount cannot be negative")]
    Negative,
}

/// An amount of Vietnamese dong.
///
/// ```
/// use sgshop_core::Money;
///
/// assert_eq!(Money::from_dong(1_250_000).display(), "1.250.000 ₫");
/// assert_eq!(Money::from_dong(0).display(), "0 ₫");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero dong.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal, rounding to whole dong.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Create an amount from whole dong.
    #[must_use]
    pub fn from_dong(dong: i64) -> Self {
        Self(Decimal::from(dong))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whole dong as an integer (saturating at the `i64` bounds).
    #[must_use]
    pub fn as_dong(&self) -> i64 {
        use rust_decimal::prelude::ToPrimitive;
        let rounded = self
            .0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Multiply a unit price by a quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Subtract, stopping at zero.
    #[must_use]
    pub fn saturating_sub(&self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }

    /// Parse user input such as `"150000"`, `"150.000"` or `"150,000 ₫"`.
    ///
    /// Group separators, spaces and the currency symbol are ignored; the
    /// result is rounded to whole dong.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not a number or negative.
    pub fn parse_input(input: &str) -> Result<Self, MoneyError> {
        let cleaned: String = input
            .trim()
            .trim_end_matches(CURRENCY_SYMBOL)
            .chars()
            .filter(|c| !matches!(c, '.' | ',' | ' ' | '_'))
            .collect();

        if cleaned.is_empty() {
            return Err(MoneyError::Empty);
        }

        let amount = Decimal::from_str(&cleaned).map_err(|_| MoneyError::NotANumber)?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }

        Ok(Self::new(amount))
    }

    /// Format for display with `.` thousands separators, e.g. `1.250.000 ₫`.
    #[must_use]
    pub fn display(&self) -> String {
        let dong = self.as_dong();
        let digits = dong.unsigned_abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);
        if dong < 0 {
            grouped.push('-');
        }
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        grouped.push(' ');
        grouped.push_str(CURRENCY_SYMBOL);
        grouped
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| acc + m)
    }
}

impl From<i64> for Money {
    fn from(dong: i64) -> Self {
        Self::from_dong(dong)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::from_dong(5).display(), "5 ₫");
        assert_eq!(Money::from_dong(999).display(), "999 ₫");
        assert_eq!(Money::from_dong(1_000).display(), "1.000 ₫");
        assert_eq!(Money::from_dong(25_000).display(), "25.000 ₫");
        assert_eq!(Money::from_dong(1_250_000).display(), "1.250.000 ₫");
        assert_eq!(Money::from_dong(-5_000).display(), "-5.000 ₫");
    }

    #[test]
    fn test_new_rounds_half_away_from_zero() {
        assert_eq!(Money::new(Decimal::new(15, 1)).as_dong(), 2);
        assert_eq!(Money::new(Decimal::new(14, 1)).as_dong(), 1);
    }

    #[test]
    fn test_parse_input_accepts_formatted_values() {
        assert_eq!(Money::parse_input("150000").unwrap(), Money::from_dong(150_000));
        assert_eq!(Money::parse_input("150.000").unwrap(), Money::from_dong(150_000));
        assert_eq!(Money::parse_input(" 1,200,000 ₫").unwrap(), Money::from_dong(1_200_000));
    }

    #[test]
    fn test_parse_input_rejects_bad_values() {
        assert_eq!(Money::parse_input("  "), Err(MoneyError::Empty));
        assert_eq!(Money::parse_input("abc"), Err(MoneyError::NotANumber));
        assert_eq!(Money::parse_input("-10"), Err(MoneyError::Negative));
    }

    #[test]
    fn test_saturating_sub_stops_at_zero() {
        let a = Money::from_dong(10_000);
        let b = Money::from_dong(25_000);
        assert_eq!(a.saturating_sub(b), Money::ZERO);
        assert_eq!(b.saturating_sub(a), Money::from_dong(15_000));
    }

    #[test]
    fn test_deserialize_from_number_or_string() {
        let from_number: Money = serde_json::from_str("120000").unwrap();
        let from_string: Money = serde_json::from_str("\"120000\"").unwrap();
        assert_eq!(from_number, from_string);
    }

    #[test]
    fn test_sum_and_times() {
        let total: Money = [Money::from_dong(1_000), Money::from_dong(2_500)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_dong(3_500));
        assert_eq!(Money::from_dong(12_000).times(3), Money::from_dong(36_000));
    }
}
