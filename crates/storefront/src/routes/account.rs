//! Account route handlers.
//!
//! Profile, order history and order detail for the logged-in customer.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use sgshop_core::records::{Order, OrderItem, User};
use sgshop_core::{Flash, OrderId, OrderStatus};

use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireAuth, set_flash};
use crate::state::AppState;

use super::{Pager, non_blank};

/// Orders per history page.
const ORDERS_PER_PAGE: u32 = 10;

// =============================================================================
// Views
// =============================================================================

/// Order row for the history table.
#[derive(Debug, Clone)]
pub struct OrderRowView {
    pub id: OrderId,
    pub code: String,
    pub created_at: String,
    pub item_count: u32,
    pub total: String,
    pub status_label: &'static str,
    pub badge_class: &'static str,
}

impl From<&Order> for OrderRowView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            code: order.display_code(),
            created_at: filters::format_datetime(order.created_at),
            item_count: order.item_count(),
            total: order.total.to_string(),
            status_label: order.status.label(),
            badge_class: order.status.badge_class(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub product_id: i64,
    pub name: String,
    pub image: String,
    pub price: String,
    pub quantity: u32,
    pub line_total: String,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.as_i64(),
            name: item.product_name.clone(),
            image: filters::image_url(item.image_url.as_deref().unwrap_or_default()),
            price: item.price.to_string(),
            quantity: item.quantity,
            line_total: item.line_total().to_string(),
        }
    }
}

/// Full order for the detail page.
#[derive(Debug, Clone)]
pub struct OrderDetailView {
    pub id: OrderId,
    pub code: String,
    pub created_at: String,
    pub status_label: &'static str,
    pub badge_class: &'static str,
    pub payment_label: &'static str,
    pub items: Vec<OrderItemView>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping_fee: String,
    pub total: String,
    pub voucher_code: Option<String>,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub shipping_address: String,
    pub note: Option<String>,
    pub can_cancel: bool,
    pub awaiting_payment: bool,
}

impl From<&Order> for OrderDetailView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            code: order.display_code(),
            created_at: filters::format_datetime(order.created_at),
            status_label: order.status.label(),
            badge_class: order.status.badge_class(),
            payment_label: order.payment_method.label(),
            items: order.items.iter().map(OrderItemView::from).collect(),
            subtotal: order.subtotal.to_string(),
            discount: order.discount.is_positive().then(|| order.discount.to_string()),
            shipping_fee: order.shipping_fee.to_string(),
            total: order.total.to_string(),
            voucher_code: order.voucher_code.clone(),
            receiver_name: order.receiver_name.clone(),
            receiver_phone: order.receiver_phone.clone(),
            shipping_address: order.shipping_address.clone(),
            note: order.note.clone().filter(|n| !n.trim().is_empty()),
            can_cancel: order.can_cancel(),
            awaiting_payment: order.awaiting_online_payment(),
        }
    }
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
            selected: Some(*s) == selected,
        })
        .collect()
}

// =============================================================================
// Templates
// =============================================================================

/// Account profile template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub ctx: PageContext,
    pub user: User,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderRowView>,
    pub statuses: Vec<StatusOption>,
    pub pager: Pager,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub ctx: PageContext,
    pub order: OrderDetailView,
    /// Arrived straight from checkout.
    pub placed: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display account profile.
#[instrument(skip(state, customer, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    ctx: PageContext,
) -> Result<impl IntoResponse, AppError> {
    let user = state.api().me(customer.token()).await?;
    Ok(AccountTemplate { ctx, user })
}

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub page: Option<u32>,
    pub status: Option<String>,
}

/// Display order history, optionally filtered by status.
#[instrument(skip(state, customer, ctx))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    ctx: PageContext,
    Query(query): Query<OrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let status = non_blank(query.status.as_deref()).and_then(|s| s.parse::<OrderStatus>().ok());

    let orders = state
        .api()
        .my_orders(customer.token(), page, ORDERS_PER_PAGE, status)
        .await?;

    let pager = Pager::new(
        orders.view(),
        "/account/orders",
        &[("status", status.map_or("", |s| s.as_str()))],
    );

    Ok(OrdersTemplate {
        ctx,
        orders: orders.content.iter().map(OrderRowView::from).collect(),
        statuses: status_options(status),
        pager,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderShowQuery {
    pub placed: Option<String>,
}

impl OrderShowQuery {
    #[must_use]
    pub fn is_placed(&self) -> bool {
        self.placed.as_deref() == Some("1")
    }
}

/// Display a single order.
#[instrument(skip(state, customer, ctx))]
pub async fn order_show(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    ctx: PageContext,
    Path(id): Path<OrderId>,
    Query(query): Query<OrderShowQuery>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.api().get_order(customer.token(), id).await?;
    Ok(OrderShowTemplate {
        ctx,
        order: OrderDetailView::from(&order),
        placed: query.is_placed(),
    })
}

/// Cancel a pending order.
#[instrument(skip(state, customer, session))]
pub async fn cancel_order(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    session: Session,
    Path(id): Path<OrderId>,
) -> Result<Redirect, AppError> {
    let order = state.api().get_order(customer.token(), id).await?;
    let order_path = format!("/orders/{id}");

    if !order.can_cancel() {
        set_flash(&session, Flash::error("Chỉ có thể hủy đơn hàng đang chờ xác nhận")).await;
        return Ok(Redirect::to(&order_path));
    }

    match state.api().cancel_order(customer.token(), id).await {
        Ok(()) => {
            tracing::info!(order_id = %id, "Order canceled by customer");
            set_flash(&session, Flash::success("Đã hủy đơn hàng")).await;
        }
        Err(e) if e.is_unauthorized() => return Err(e.into()),
        Err(e) => {
            tracing::warn!(order_id = %id, "Cancel rejected: {e}");
            set_flash(&session, Flash::error(e.user_message("Không thể hủy đơn hàng"))).await;
        }
    }

    Ok(Redirect::to(&order_path))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sgshop_core::Money;

    use super::*;

    fn order(status: &str, method: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "id": 7,
            "items": [
                {"productId": 1, "productName": "Áo thun", "price": 150_000, "quantity": 2},
                {"productId": 2, "productName": "Nón", "imageUrl": "products/non.jpg", "price": 50_000, "quantity": 1}
            ],
            "subtotal": 350_000,
            "discount": 0,
            "shippingFee": 30_000,
            "total": 380_000,
            "status": status,
            "paymentMethod": method,
            "receiverName": "Nguyễn Văn A",
            "receiverPhone": "0901234567",
            "shippingAddress": "12 Lê Lợi, Phường Bến Nghé, Quận 1, TP Hồ Chí Minh",
            "note": "  ",
            "createdAt": "2024-05-15T10:30:00"
        }))
        .unwrap()
    }

    #[test]
    fn test_detail_view() {
        let view = OrderDetailView::from(&order("PENDING", "ONLINE"));
        assert_eq!(view.code, "#7");
        assert_eq!(view.created_at, "15/05/2024 10:30");
        assert!(view.discount.is_none());
        assert!(view.note.is_none());
        assert!(view.can_cancel);
        assert!(view.awaiting_payment);
        assert_eq!(view.items[1].image, "/static/products/non.jpg");
        assert_eq!(view.items[0].line_total, Money::from_dong(300_000).to_string());
    }

    #[test]
    fn test_placed_order_shows_confirmation() {
        let page = |placed| {
            OrderShowTemplate {
                ctx: PageContext::default(),
                order: OrderDetailView::from(&order("PENDING", "CASH")),
                placed,
            }
            .render()
            .unwrap()
        };
        assert!(page(true).contains("Đặt hàng thành công!"));
        assert!(!page(false).contains("Đặt hàng thành công!"));

        let query: OrderShowQuery = serde_json::from_value(serde_json::json!({"placed": "1"})).unwrap();
        assert!(query.is_placed());
        assert!(!OrderShowQuery::default().is_placed());
    }

    #[test]
    fn test_shipped_order_is_final() {
        let view = OrderDetailView::from(&order("SHIPPED", "CASH"));
        assert!(!view.can_cancel);
        assert!(!view.awaiting_payment);
        assert_eq!(view.status_label, "Đã giao");
    }

    #[test]
    fn test_row_view_counts_units() {
        let row = OrderRowView::from(&order("PAID", "ONLINE"));
        assert_eq!(row.item_count, 3);
        assert_eq!(row.badge_class, "badge-info");
    }

    #[test]
    fn test_status_options_mark_selection() {
        let options = status_options(Some(OrderStatus::Delivering));
        assert_eq!(options.len(), OrderStatus::ALL.len());
        assert_eq!(options.iter().filter(|o| o.selected).count(), 1);
        assert!(options.iter().any(|o| o.selected && o.value == "DELIVERING"));
    }
}
