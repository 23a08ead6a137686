//! Revenue report shaping.
//!
//! The backend only returns months or days that had orders. Reports show
//! every month of the year or every day of the month, so missing points
//! are filled with zero.

use chrono::NaiveDate;

use crate::records::RevenuePoint;
use crate::types::Money;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("year {0} is out of range")]
    InvalidYear(i32),
}

/// A zero-filled series with its totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueReport {
    pub points: Vec<RevenuePoint>,
    pub total_revenue: Money,
    pub total_orders: i64,
    /// Highest-revenue point; the earliest wins a tie. `None` when nothing sold.
    pub best: Option<RevenuePoint>,
}

impl RevenueReport {
    fn from_points(points: Vec<RevenuePoint>) -> Self {
        let total_revenue = points.iter().map(|p| p.revenue).sum();
        let total_orders = points.iter().map(|p| p.orders).sum();
        let best = points
            .iter()
            .filter(|p| p.revenue.is_positive())
            .fold(None::<&RevenuePoint>, |best, p| match best {
                Some(b) if b.revenue >= p.revenue => Some(b),
                _ => Some(p),
            })
            .cloned();
        Self {
            points,
            total_revenue,
            total_orders,
            best,
        }
    }

    /// Largest revenue in the series, for scaling chart bars.
    #[must_use]
    pub fn peak(&self) -> Money {
        self.points
            .iter()
            .map(|p| p.revenue)
            .max()
            .unwrap_or(Money::ZERO)
    }

    /// Bar height for `point` as a whole percentage of the peak.
    #[must_use]
    pub fn bar_percent(&self, point: &RevenuePoint) -> u32 {
        use rust_decimal::prelude::ToPrimitive;

        let peak = self.peak();
        if !peak.is_positive() {
            return 0;
        }
        let pct = point.revenue.amount() * rust_decimal::Decimal::ONE_HUNDRED / peak.amount();
        pct.round().to_u32().unwrap_or(0).min(100)
    }
}

/// Twelve points labelled 1..=12.
#[must_use]
pub fn yearly(points: &[RevenuePoint]) -> RevenueReport {
    RevenueReport::from_points(fill(points, 12))
}

/// One point per day of `month`.
///
/// # Errors
///
/// Returns an error if the month or year is out of range.
pub fn monthly(year: i32, month: u32, points: &[RevenuePoint]) -> Result<RevenueReport, ReportError> {
    let days = days_in_month(year, month)?;
    Ok(RevenueReport::from_points(fill(points, days)))
}

/// Number of days in a calendar month.
///
/// # Errors
///
/// Returns an error if the month or year is out of range.
pub fn days_in_month(year: i32, month: u32) -> Result<u32, ReportError> {
    if !(1..=12).contains(&month) {
        return Err(ReportError::InvalidMonth(month));
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(ReportError::InvalidYear(year))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(ReportError::InvalidYear(year))?;
    u32::try_from(next.signed_duration_since(first).num_days()).map_err(|_| ReportError::InvalidYear(year))
}

/// Labels 1..=`len`, summing duplicates and ignoring out-of-range labels.
fn fill(points: &[RevenuePoint], len: u32) -> Vec<RevenuePoint> {
    (1..=len)
        .map(|label| {
            let matching = points.iter().filter(|p| p.label == label);
            RevenuePoint {
                label,
                revenue: matching.clone().map(|p| p.revenue).sum(),
                orders: matching.map(|p| p.orders).sum(),
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn point(label: u32, revenue: i64, orders: i64) -> RevenuePoint {
        RevenuePoint {
            label,
            revenue: Money::from_dong(revenue),
            orders,
        }
    }

    #[test]
    fn test_yearly_fills_missing_months() {
        let report = yearly(&[point(3, 500_000, 2), point(11, 1_200_000, 5), point(13, 9, 9)]);
        assert_eq!(report.points.len(), 12);
        assert_eq!(report.points[0], point(1, 0, 0));
        assert_eq!(report.points[2], point(3, 500_000, 2));
        assert_eq!(report.total_revenue, Money::from_dong(1_700_000));
        assert_eq!(report.total_orders, 7);
        assert_eq!(report.best.unwrap().label, 11);
    }

    #[test]
    fn test_monthly_length_follows_calendar() {
        assert_eq!(monthly(2024, 2, &[]).unwrap().points.len(), 29);
        assert_eq!(monthly(2023, 2, &[]).unwrap().points.len(), 28);
        assert_eq!(monthly(2024, 12, &[]).unwrap().points.len(), 31);
        assert_eq!(monthly(2024, 4, &[]).unwrap().points.len(), 30);
        assert_eq!(monthly(2024, 13, &[]), Err(ReportError::InvalidMonth(13)));
        assert_eq!(monthly(2024, 0, &[]), Err(ReportError::InvalidMonth(0)));
    }

    #[test]
    fn test_best_prefers_earliest_on_tie_and_none_when_empty() {
        let report = yearly(&[point(2, 100, 1), point(5, 100, 1)]);
        assert_eq!(report.best.unwrap().label, 2);
        assert!(yearly(&[]).best.is_none());
    }

    #[test]
    fn test_bar_percent() {
        let report = yearly(&[point(1, 50, 1), point(2, 200, 1)]);
        assert_eq!(report.bar_percent(&report.points[0]), 25);
        assert_eq!(report.bar_percent(&report.points[1]), 100);
        assert_eq!(report.bar_percent(&report.points[5]), 0);
        let empty = yearly(&[]);
        assert_eq!(empty.bar_percent(&empty.points[0]), 0);
    }
}
