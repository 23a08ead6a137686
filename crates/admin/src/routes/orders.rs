//! Order management: list, detail and status changes.
//!
//! The backend owns the lifecycle. The back office only offers the moves
//! [`OrderStatus::admin_transitions`] allows from the current status, and
//! checks the move again before sending it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use sgshop_core::records::{Order, OrderItem};
use sgshop_core::{Flash, OrderId, OrderStatus};

use crate::api::{ApiError, OrderFilter};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireStaff, set_flash};
use crate::state::AppState;

use super::{Pager, degrade, finish, non_blank};

// =============================================================================
// Views
// =============================================================================

/// Order row for tables.
#[derive(Debug, Clone)]
pub struct OrderRowView {
    pub id: OrderId,
    pub code: String,
    pub created_at: String,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub item_count: u32,
    pub total: String,
    pub payment_label: &'static str,
    pub status_label: &'static str,
    pub badge_class: &'static str,
}

impl From<&Order> for OrderRowView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            code: order.display_code(),
            created_at: filters::format_datetime(order.created_at),
            receiver_name: order.receiver_name.clone(),
            receiver_phone: order.receiver_phone.clone(),
            item_count: order.item_count(),
            total: order.total.to_string(),
            payment_label: order.payment_method.label(),
            status_label: order.status.label(),
            badge_class: order.status.badge_class(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub name: String,
    pub image: String,
    pub price: String,
    pub quantity: u32,
    pub line_total: String,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            name: item.product_name.clone(),
            image: filters::image_url(item.image_url.as_deref().unwrap_or_default()),
            price: item.price.to_string(),
            quantity: item.quantity,
            line_total: item.line_total().to_string(),
        }
    }
}

/// A status the order can move to, as a button.
#[derive(Debug, Clone)]
pub struct TransitionView {
    pub value: &'static str,
    pub label: &'static str,
    pub is_cancel: bool,
}

/// Status filter option.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn status_options(selected: Option<OrderStatus>) -> Vec<StatusOption> {
    OrderStatus::ALL
        .iter()
        .map(|s| StatusOption {
            value: s.as_str(),
            label: s.label(),
            selected: selected == Some(*s),
        })
        .collect()
}

fn transitions(status: OrderStatus) -> Vec<TransitionView> {
    status
        .admin_transitions()
        .iter()
        .map(|s| TransitionView {
            value: s.as_str(),
            label: s.label(),
            is_cancel: *s == OrderStatus::Canceled,
        })
        .collect()
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderRowView>,
    pub statuses: Vec<StatusOption>,
    pub keyword: String,
    pub pager: Pager,
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub ctx: PageContext,
    pub order: OrderRowView,
    pub items: Vec<OrderItemView>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping_fee: String,
    pub voucher_code: Option<String>,
    pub shipping_address: String,
    pub note: Option<String>,
    pub transitions: Vec<TransitionView>,
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
    pub keyword: Option<String>,
    pub page: Option<u32>,
}

impl OrdersQuery {
    /// Unknown statuses are ignored rather than rejected.
    fn filter(&self) -> OrderFilter {
        OrderFilter {
            page: self.page.unwrap_or(1).max(1),
            status: non_blank(self.status.as_deref()).and_then(|s| s.parse().ok()),
            keyword: non_blank(self.keyword.as_deref()).map(str::to_owned),
            ..OrderFilter::default()
        }
    }
}

/// Order list handler.
#[instrument(skip(state, staff, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ctx: PageContext,
    Query(query): Query<OrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = query.filter();
    let page = degrade(state.api().orders(staff.token(), &filter).await, "orders")?;

    let status = filter.status.map(|s| s.as_str()).unwrap_or_default();
    let keyword = filter.keyword.clone().unwrap_or_default();
    let pager = Pager::new(page.view(), "/orders", &[("status", status), ("keyword", &keyword)]);

    Ok(OrdersIndexTemplate {
        ctx,
        orders: page.content.iter().map(OrderRowView::from).collect(),
        statuses: status_options(filter.status),
        keyword,
        pager,
    })
}

/// Order detail handler.
#[instrument(skip(state, staff, ctx))]
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ctx: PageContext,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.api().order(staff.token(), id).await?;

    Ok(OrderShowTemplate {
        ctx,
        order: OrderRowView::from(&order),
        items: order.items.iter().map(OrderItemView::from).collect(),
        subtotal: order.subtotal.to_string(),
        discount: order.discount.is_positive().then(|| order.discount.to_string()),
        shipping_fee: order.shipping_fee.to_string(),
        voucher_code: order.voucher_code.clone(),
        shipping_address: order.shipping_address.clone(),
        note: order.note.clone().filter(|n| !n.trim().is_empty()),
        transitions: transitions(order.status),
    })
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Move an order to the posted status.
#[instrument(skip(state, staff, session))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect, AppError> {
    let Ok(next) = form.status.parse::<OrderStatus>() else {
        set_flash(&session, Flash::error("Trạng thái không hợp lệ")).await;
        return Ok(Redirect::to(&format!("/orders/{id}")));
    };
    change_status(&state, staff.token(), &session, id, next).await
}

/// Cancel an order.
#[instrument(skip(state, staff, session))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    Path(id): Path<OrderId>,
) -> Result<Redirect, AppError> {
    change_status(&state, staff.token(), &session, id, OrderStatus::Canceled).await
}

async fn change_status(
    state: &AppState,
    token: &str,
    session: &Session,
    id: OrderId,
    next: OrderStatus,
) -> Result<Redirect, AppError> {
    let back = format!("/orders/{id}");

    // Re-read the order: someone else may have moved it since the page loaded
    let current = match state.api().order(token, id).await {
        Ok(order) => order.status,
        Err(ApiError::Unauthorized) => return Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => {
            set_flash(session, Flash::error(e.user_message("Không tìm thấy đơn hàng"))).await;
            return Ok(Redirect::to("/orders"));
        }
    };

    if !current.can_transition_to(next) {
        tracing::info!(order_id = %id, from = %current, to = %next, "Refused order transition");
        set_flash(
            session,
            Flash::error(format!(
                "Không thể chuyển đơn từ \"{}\" sang \"{}\"",
                current.label(),
                next.label()
            )),
        )
        .await;
        return Ok(Redirect::to(&back));
    }

    let result = state.api().update_order_status(token, id, next).await;
    if result.is_ok() {
        tracing::info!(order_id = %id, from = %current, to = %next, "Order status changed");
    }
    let success = format!("Đơn hàng đã chuyển sang \"{}\"", next.label());
    finish(session, result, &success, "Không thể cập nhật trạng thái đơn hàng", &back).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_filter() {
        let filter = OrdersQuery {
            status: Some("delivering".to_string()),
            keyword: Some("  ".to_string()),
            page: Some(0),
        }
        .filter();
        assert_eq!(filter.status, Some(OrderStatus::Delivering));
        assert_eq!(filter.keyword, None);
        assert_eq!(filter.page, 1);

        let unknown = OrdersQuery {
            status: Some("LOST".to_string()),
            ..OrdersQuery::default()
        }
        .filter();
        assert_eq!(unknown.status, None);
    }

    #[test]
    fn test_transition_buttons() {
        let pending = transitions(OrderStatus::Pending);
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().any(|t| t.is_cancel));
        assert!(transitions(OrderStatus::Shipped).is_empty());
        assert_eq!(transitions(OrderStatus::Delivering)[0].value, "SHIPPED");
    }

    #[test]
    fn test_status_options_mark_selection() {
        let options = status_options(Some(OrderStatus::Paid));
        assert_eq!(options.iter().filter(|o| o.selected).count(), 1);
        assert_eq!(options.len(), OrderStatus::ALL.len());
    }
}
