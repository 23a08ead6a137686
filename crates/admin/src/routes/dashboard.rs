//! Dashboard: headline numbers, this year's revenue and the latest orders.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use chrono::Datelike;
use tracing::instrument;

use sgshop_core::records::RevenueSummary;

use crate::api::OrderFilter;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireStaff};
use crate::state::AppState;

use super::degrade;
use super::orders::OrderRowView;
use super::revenue::ChartView;

/// Orders listed under the chart.
const RECENT_ORDERS: u32 = 8;

/// Headline cards.
#[derive(Debug, Clone, Default)]
pub struct SummaryView {
    pub total_revenue: String,
    pub total_orders: i64,
    pub total_customers: i64,
    pub total_products: i64,
}

impl From<&RevenueSummary> for SummaryView {
    fn from(summary: &RevenueSummary) -> Self {
        Self {
            total_revenue: summary.total_revenue.to_string(),
            total_orders: summary.total_orders,
            total_customers: summary.total_customers,
            total_products: summary.total_products,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub year: i32,
    pub summary: SummaryView,
    pub chart: ChartView,
    pub recent_orders: Vec<OrderRowView>,
}

/// Dashboard page handler.
///
/// Each panel loads independently; a failing one renders empty.
#[instrument(skip(state, staff, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ctx: PageContext,
) -> Result<impl IntoResponse, AppError> {
    let token = staff.token();
    let year = chrono::Local::now().year();
    let recent = OrderFilter {
        size: RECENT_ORDERS,
        ..OrderFilter::default()
    };

    let (summary, points, orders) = tokio::join!(
        state.api().revenue_summary(token),
        state.api().revenue_yearly(token, year),
        state.api().orders(token, &recent),
    );

    let summary = degrade(summary, "revenue summary")?;
    let points = degrade(points, "yearly revenue")?;
    let orders = degrade(orders, "recent orders")?;

    Ok(DashboardTemplate {
        ctx,
        year,
        summary: SummaryView::from(&summary),
        chart: ChartView::yearly(&points),
        recent_orders: orders.content.iter().map(OrderRowView::from).collect(),
    })
}
