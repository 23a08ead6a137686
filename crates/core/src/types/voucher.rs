//! Voucher terms and discount math.
//!
//! The backend is the authority on what a voucher is worth when the order
//! is placed. These rules exist so the checkout page can preview the
//! discount and the back office can reject nonsense before it reaches the
//! API.

use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::price::Money;

/// How a voucher's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// A fixed amount of dong.
    #[default]
    Fixed,
    /// A percentage of the subtotal.
    Percentage,
}

impl DiscountKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "FIXED",
            Self::Percentage => "PERCENTAGE",
        }
    }
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiscountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIXED" => Ok(Self::Fixed),
            "PERCENTAGE" | "PERCENT" => Ok(Self::Percentage),
            _ => Err(format!("invalid discount type: {s}")),
        }
    }
}

/// Problems with voucher terms.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VoucherError {
    #[error("discount value must be greater than 0")]
    NonPositiveValue,
    #[error("percentage discount cannot exceed 100")]
    PercentageOver100,
    #[error("minimum order value cannot be negative")]
    NegativeMinimum,
    #[error("maximum discount must be greater than 0")]
    NonPositiveMaxDiscount,
    #[error("end date must be after start date")]
    InvalidWindow,
}

/// The monetary part of a voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoucherTerms {
    pub kind: DiscountKind,
    /// Dong for [`DiscountKind::Fixed`], percent for [`DiscountKind::Percentage`].
    pub value: Decimal,
    pub min_order_value: Money,
    pub max_discount: Option<Money>,
}

impl VoucherTerms {
    /// Check the terms are self-consistent.
    ///
    /// # Errors
    ///
    /// Returns the first rule the terms break.
    pub fn validate(&self) -> Result<(), VoucherError> {
        if self.value <= Decimal::ZERO {
            return Err(VoucherError::NonPositiveValue);
        }
        if self.kind == DiscountKind::Percentage && self.value > Decimal::ONE_HUNDRED {
            return Err(VoucherError::PercentageOver100);
        }
        if self.min_order_value.amount() < Decimal::ZERO {
            return Err(VoucherError::NegativeMinimum);
        }
        if self.max_discount.is_some_and(|m| !m.is_positive()) {
            return Err(VoucherError::NonPositiveMaxDiscount);
        }
        Ok(())
    }

    /// Whether the subtotal reaches the minimum order value.
    #[must_use]
    pub fn applies_to(&self, subtotal: Money) -> bool {
        subtotal >= self.min_order_value
    }

    /// Discount for an order subtotal. Never exceeds the subtotal.
    ///
    /// ```
    /// use rust_decimal::Decimal;
    /// use sgshop_core::{DiscountKind, Money, VoucherTerms};
    ///
    /// let terms = VoucherTerms {
    ///     kind: DiscountKind::Percentage,
    ///     value: Decimal::from(10),
    ///     min_order_value: Money::from_dong(100_000),
    ///     max_discount: Some(Money::from_dong(30_000)),
    /// };
    /// assert_eq!(terms.discount_for(Money::from_dong(250_000)), Money::from_dong(25_000));
    /// assert_eq!(terms.discount_for(Money::from_dong(900_000)), Money::from_dong(30_000));
    /// assert_eq!(terms.discount_for(Money::from_dong(99_000)), Money::ZERO);
    /// ```
    #[must_use]
    pub fn discount_for(&self, subtotal: Money) -> Money {
        if !self.applies_to(subtotal) || !subtotal.is_positive() {
            return Money::ZERO;
        }

        let raw = match self.kind {
            DiscountKind::Fixed => Money::new(self.value),
            DiscountKind::Percentage => {
                let pct = subtotal.amount() * self.value / Decimal::ONE_HUNDRED;
                let floored = pct.round_dp_with_strategy(0, RoundingStrategy::ToNegativeInfinity);
                let capped = Money::new(floored);
                self.max_discount.map_or(capped, |max| capped.min(max))
            }
        };

        raw.min(subtotal).max(Money::ZERO)
    }
}

/// The period during which a voucher can be redeemed, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoucherWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl VoucherWindow {
    /// # Errors
    ///
    /// Returns [`VoucherError::InvalidWindow`] unless `end` is after `start`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, VoucherError> {
        if end <= start {
            return Err(VoucherError::InvalidWindow);
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        self.start <= now && now <= self.end
    }
}

/// A voucher can be redeemed when it is switched on, has copies left and
/// `now` falls inside its window.
#[must_use]
pub fn is_usable(active: bool, quantity: i64, window: &VoucherWindow, now: NaiveDateTime) -> bool {
    active && quantity > 0 && window.contains(now)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed(value: i64, min: i64) -> VoucherTerms {
        VoucherTerms {
            kind: DiscountKind::Fixed,
            value: Decimal::from(value),
            min_order_value: Money::from_dong(min),
            max_discount: None,
        }
    }

    fn percent(value: i64, min: i64, max: Option<i64>) -> VoucherTerms {
        VoucherTerms {
            kind: DiscountKind::Percentage,
            value: Decimal::from(value),
            min_order_value: Money::from_dong(min),
            max_discount: max.map(Money::from_dong),
        }
    }

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_validate() {
        assert!(fixed(20_000, 0).validate().is_ok());
        assert!(percent(100, 0, None).validate().is_ok());
        assert_eq!(fixed(0, 0).validate(), Err(VoucherError::NonPositiveValue));
        assert_eq!(
            percent(101, 0, None).validate(),
            Err(VoucherError::PercentageOver100)
        );
        assert_eq!(fixed(10, -1).validate(), Err(VoucherError::NegativeMinimum));
        assert_eq!(
            percent(10, 0, Some(0)).validate(),
            Err(VoucherError::NonPositiveMaxDiscount)
        );
    }

    #[test]
    fn test_fixed_discount_is_capped_by_subtotal() {
        let terms = fixed(50_000, 0);
        assert_eq!(terms.discount_for(Money::from_dong(200_000)), Money::from_dong(50_000));
        assert_eq!(terms.discount_for(Money::from_dong(30_000)), Money::from_dong(30_000));
    }

    #[test]
    fn test_below_minimum_gets_nothing() {
        let terms = fixed(50_000, 300_000);
        assert_eq!(terms.discount_for(Money::from_dong(299_999)), Money::ZERO);
        assert_eq!(terms.discount_for(Money::from_dong(300_000)), Money::from_dong(50_000));
    }

    #[test]
    fn test_percentage_floors() {
        let terms = percent(15, 0, None);
        // 15% of 33_333 = 4_999.95
        assert_eq!(terms.discount_for(Money::from_dong(33_333)), Money::from_dong(4_999));
        assert_eq!(
            percent(100, 0, None).discount_for(Money::from_dong(80_000)),
            Money::from_dong(80_000)
        );
    }

    #[test]
    fn test_percentage_respects_max_discount() {
        let terms = percent(20, 0, Some(40_000));
        assert_eq!(terms.discount_for(Money::from_dong(100_000)), Money::from_dong(20_000));
        assert_eq!(terms.discount_for(Money::from_dong(1_000_000)), Money::from_dong(40_000));
    }

    #[test]
    fn test_window_and_usability() {
        let window = VoucherWindow::new(at(1), at(30)).unwrap();
        assert!(window.contains(at(1)));
        assert!(window.contains(at(30)));
        assert!(VoucherWindow::new(at(10), at(10)).is_err());

        assert!(is_usable(true, 5, &window, at(15)));
        assert!(!is_usable(false, 5, &window, at(15)));
        assert!(!is_usable(true, 0, &window, at(15)));
        let before_start = window.start - chrono::Duration::hours(1);
        assert!(!is_usable(true, 5, &window, before_start));
    }
}
