//! Revenue reports (admin only).
//!
//! The backend returns only the months or days that had orders; the
//! report fills in the rest with zero so the chart has a bar for every
//! month of the year or day of the month.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Datelike;
use serde::Deserialize;
use tracing::instrument;

use sgshop_core::records::{RevenuePoint, TopProduct};
use sgshop_core::revenue::{self, ReportError};
use sgshop_core::{Flash, RevenueReport};

use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin};
use crate::state::AppState;

use super::degrade;

/// Rows in the best-sellers table.
const TOP_PRODUCTS_LIMIT: u32 = 10;

/// Oldest year offered in the year picker.
const FIRST_REPORT_YEAR: i32 = 2020;

// =============================================================================
// Views
// =============================================================================

/// Horizontal room per bar in the chart's SVG user units.
const BAR_SLOT: usize = 10;

/// One bar of a revenue chart.
#[derive(Debug, Clone)]
pub struct ChartBar {
    pub label: String,
    pub revenue: String,
    pub orders: i64,
    /// Height relative to the tallest bar, 0..=100.
    pub percent: u32,
    /// Left edge in SVG units.
    pub x: usize,
}

impl ChartBar {
    /// Top edge in SVG units; the chart is 100 units tall.
    #[must_use]
    pub const fn y(&self) -> u32 {
        100u32.saturating_sub(self.percent)
    }
}

/// A zero-filled series ready for the chart partial.
#[derive(Debug, Clone, Default)]
pub struct ChartView {
    pub bars: Vec<ChartBar>,
    pub total_revenue: String,
    pub total_orders: i64,
    /// e.g. `Tháng 3: 12.500.000 ₫`.
    pub best: Option<String>,
}

impl ChartView {
    /// `unit` prefixes each label, e.g. `T` for months.
    #[must_use]
    pub fn new(report: &RevenueReport, unit: &str, best_unit: &str) -> Self {
        Self {
            bars: report
                .points
                .iter()
                .enumerate()
                .map(|(i, p)| ChartBar {
                    label: format!("{unit}{}", p.label),
                    revenue: p.revenue.to_string(),
                    orders: p.orders,
                    percent: report.bar_percent(p),
                    x: i * BAR_SLOT + 1,
                })
                .collect(),
            total_revenue: report.total_revenue.to_string(),
            total_orders: report.total_orders,
            best: report
                .best
                .as_ref()
                .map(|p: &RevenuePoint| format!("{best_unit} {}: {}", p.label, p.revenue)),
        }
    }

    /// SVG `viewBox` width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.bars.len().max(1) * BAR_SLOT
    }

    /// Chart for the twelve months of a year.
    #[must_use]
    pub fn yearly(points: &[RevenuePoint]) -> Self {
        Self::new(&revenue::yearly(points), "T", "Tháng")
    }
}

#[derive(Debug, Clone)]
pub struct TopProductView {
    pub rank: usize,
    pub product_id: i64,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: String,
}

fn top_product_views(products: &[TopProduct]) -> Vec<TopProductView> {
    products
        .iter()
        .enumerate()
        .map(|(i, p)| TopProductView {
            rank: i + 1,
            product_id: p.product_id.as_i64(),
            name: p.product_name.clone(),
            quantity_sold: p.quantity_sold,
            revenue: p.revenue.to_string(),
        })
        .collect()
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "revenue/index.html")]
pub struct RevenueTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub year: i32,
    /// `None` for the yearly report.
    pub month: Option<u32>,
    pub years: Vec<PeriodOption>,
    pub chart: ChartView,
    pub top_products: Vec<TopProductView>,
}

impl RevenueTemplate {
    /// Month picker entries for the monthly report.
    #[must_use]
    pub fn month_options(&self) -> Vec<PeriodOption> {
        (1..=12_i32)
            .map(|m| PeriodOption {
                value: m,
                selected: self.month.is_some() && self.month == u32::try_from(m).ok(),
            })
            .collect()
    }
}

/// A year or month in a picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodOption {
    pub value: i32,
    pub selected: bool,
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl ReportQuery {
    fn year_or_current(&self) -> i32 {
        self.year.unwrap_or_else(|| chrono::Local::now().year())
    }
}

fn year_options(selected: i32) -> Vec<PeriodOption> {
    let current = chrono::Local::now().year();
    let mut years: Vec<i32> = (FIRST_REPORT_YEAR..=current).rev().collect();
    if !years.contains(&selected) {
        years.push(selected);
    }
    years
        .into_iter()
        .map(|value| PeriodOption {
            value,
            selected: value == selected,
        })
        .collect()
}

/// Yearly report: twelve months, totals, best month, best sellers.
#[instrument(skip(state, staff, ctx))]
pub async fn yearly(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    mut ctx: PageContext,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let token = staff.token();
    let year = query.year_or_current();

    let (points, top) = tokio::join!(
        state.api().revenue_yearly(token, year),
        state.api().top_products(token, TOP_PRODUCTS_LIMIT),
    );
    let points = points.map_err(|e| {
        if !e.is_unauthorized() {
            ctx.show(Flash::error(e.user_message("Không tải được báo cáo doanh thu")));
        }
        e
    });

    Ok(RevenueTemplate {
        ctx,
        title: format!("Doanh thu năm {year}"),
        year,
        month: None,
        years: year_options(year),
        chart: ChartView::yearly(&degrade(points, "yearly revenue")?),
        top_products: top_product_views(&degrade(top, "top products")?),
    })
}

/// Monthly report: every day of the month.
#[instrument(skip(state, staff, ctx))]
pub async fn monthly(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    mut ctx: PageContext,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let year = query.year_or_current();
    let month = query.month.unwrap_or_else(|| chrono::Local::now().month());
    revenue::days_in_month(year, month).map_err(|e| match e {
        ReportError::InvalidMonth(_) => AppError::BadRequest("Tháng phải từ 1 đến 12".to_string()),
        ReportError::InvalidYear(_) => AppError::BadRequest("Năm không hợp lệ".to_string()),
    })?;

    let token = staff.token();
    let (points, top) = tokio::join!(
        state.api().revenue_monthly(token, year, month),
        state.api().top_products(token, TOP_PRODUCTS_LIMIT),
    );
    let points = points.map_err(|e| {
        if !e.is_unauthorized() {
            ctx.show(Flash::error(e.user_message("Không tải được báo cáo doanh thu")));
        }
        e
    });
    let points = degrade(points, "monthly revenue")?;

    let report = revenue::monthly(year, month, &points)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(RevenueTemplate {
        ctx,
        title: format!("Doanh thu tháng {month}/{year}"),
        year,
        month: Some(month),
        years: year_options(year),
        chart: ChartView::new(&report, "", "Ngày"),
        top_products: top_product_views(&degrade(top, "top products")?),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sgshop_core::Money;

    use super::*;

    fn point(label: u32, dong: i64, orders: i64) -> RevenuePoint {
        RevenuePoint {
            label,
            revenue: Money::from_dong(dong),
            orders,
        }
    }

    #[test]
    fn test_yearly_chart_has_every_month() {
        let chart = ChartView::yearly(&[point(3, 2_000_000, 4), point(11, 500_000, 1)]);
        assert_eq!(chart.bars.len(), 12);
        assert_eq!(chart.bars[0].label, "T1");
        assert_eq!(chart.bars[0].percent, 0);
        assert_eq!(chart.bars[2].percent, 100);
        assert_eq!(chart.bars[10].percent, 25);
        assert_eq!(chart.total_orders, 5);
        assert_eq!(chart.best.as_deref(), Some("Tháng 3: 2.000.000 ₫"));
    }

    #[derive(Template)]
    #[template(path = "partials/chart.html")]
    struct ChartPartial {
        chart: ChartView,
    }

    #[test]
    fn test_chart_renders_without_inline_styles() {
        let chart = ChartView::yearly(&[point(3, 2_000_000, 4), point(11, 500_000, 1)]);
        let html = ChartPartial { chart }.render().unwrap();

        // style-src 'self' drops inline style attributes
        assert!(!html.contains("style="));
        assert!(html.contains(r#"viewBox="0 0 120 100""#));
        assert!(html.contains(r#"x="21" y="0" width="8" height="100""#));
        assert!(html.contains(r#"y="75" width="8" height="25""#));
    }

    #[test]
    fn test_february_leap_year() {
        let report = revenue::monthly(2024, 2, &[point(29, 100_000, 1)]).unwrap();
        let chart = ChartView::new(&report, "", "Ngày");
        assert_eq!(chart.bars.len(), 29);
        assert_eq!(chart.best.as_deref(), Some("Ngày 29: 100.000 ₫"));
    }

    #[test]
    fn test_empty_year_has_no_best() {
        let chart = ChartView::yearly(&[]);
        assert!(chart.best.is_none());
        assert_eq!(chart.total_revenue, "0 ₫");
    }

    #[test]
    fn test_year_options_include_selected() {
        let years = year_options(2019);
        let last = years.last().unwrap();
        assert_eq!(last.value, 2019);
        assert!(last.selected);
        assert!(years.iter().any(|y| y.value == FIRST_REPORT_YEAR && !y.selected));
    }
}
