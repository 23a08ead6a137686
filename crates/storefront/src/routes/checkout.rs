//! Checkout route handlers.
//!
//! Checkout needs a logged-in customer and a non-empty cart. The form is
//! validated locally against the address lists and the live vouchers before
//! anything reaches the backend; invalid submissions re-render with every
//! field error and the customer's input kept.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::NaiveDateTime;
use tower_sessions::Session;
use tracing::instrument;

use sgshop_core::records::{Region, Voucher};
use sgshop_core::{FieldErrors, Flash, Money, OrderId, PaymentMethod};

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{PageContext, RequireAuth, load_cart, save_cart, set_flash};
use crate::models::{Cart, CurrentCustomer};
use crate::services::checkout::{self, AddressLists, CheckoutForm, VoucherOption};
use crate::state::AppState;

use super::address::{DISTRICT_PLACEHOLDER, PROVINCE_PLACEHOLDER, WARD_PLACEHOLDER};
use super::cart::CartView;
use super::non_blank;

/// Payment method radio option.
#[derive(Debug, Clone)]
pub struct PaymentOption {
    pub value: &'static str,
    pub label: &'static str,
}

const PAYMENT_OPTIONS: [PaymentOption; 2] = [
    PaymentOption {
        value: PaymentMethod::Cash.as_str(),
        label: PaymentMethod::Cash.label(),
    },
    PaymentOption {
        value: PaymentMethod::Online.as_str(),
        label: PaymentMethod::Online.label(),
    },
];

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub cart: CartView,
    pub form: CheckoutForm,
    pub errors: FieldErrors,
    pub provinces: Arc<Vec<Region>>,
    pub districts: Arc<Vec<Region>>,
    pub wards: Arc<Vec<Region>>,
    pub province_placeholder: &'static str,
    pub district_placeholder: &'static str,
    pub ward_placeholder: &'static str,
    pub vouchers: Vec<VoucherOption>,
    pub payment_options: [PaymentOption; 2],
    pub subtotal: String,
    pub discount: String,
    pub total: String,
}

/// Everything the form is rendered and validated against.
struct CheckoutData {
    provinces: Arc<Vec<Region>>,
    districts: Arc<Vec<Region>>,
    wards: Arc<Vec<Region>>,
    vouchers: Arc<Vec<Voucher>>,
}

impl CheckoutData {
    /// Load the address lists for the selected codes and the vouchers.
    ///
    /// Address and voucher failures leave empty lists; validation then
    /// reports the affected fields.
    async fn load(state: &AppState, province: &str, district: &str) -> Self {
        let api = state.api();
        let province = province.trim();
        let district = district.trim();

        let (provinces, districts, wards, vouchers) = tokio::join!(
            api.provinces(),
            async {
                if province.is_empty() {
                    Ok(Arc::default())
                } else {
                    api.districts(province).await
                }
            },
            async {
                if district.is_empty() {
                    Ok(Arc::default())
                } else {
                    api.wards(district).await
                }
            },
            api.available_vouchers(),
        );

        Self {
            provinces: provinces.unwrap_or_else(|e| {
                tracing::warn!("Failed to load provinces: {e}");
                Arc::default()
            }),
            districts: districts.unwrap_or_else(|e| {
                tracing::warn!("Failed to load districts: {e}");
                Arc::default()
            }),
            wards: wards.unwrap_or_else(|e| {
                tracing::warn!("Failed to load wards: {e}");
                Arc::default()
            }),
            vouchers: vouchers.unwrap_or_else(|e| {
                tracing::warn!("Failed to load vouchers: {e}");
                Arc::default()
            }),
        }
    }

    fn lists(&self) -> AddressLists<'_> {
        AddressLists {
            provinces: self.provinces.as_slice(),
            districts: self.districts.as_slice(),
            wards: self.wards.as_slice(),
        }
    }
}

/// Local wall-clock time, which is what voucher windows are written in.
fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn render(
    ctx: PageContext,
    cart: &Cart,
    form: CheckoutForm,
    errors: FieldErrors,
    data: CheckoutData,
) -> CheckoutTemplate {
    let subtotal = cart.subtotal();
    let vouchers = checkout::voucher_options(&data.vouchers, subtotal, now());
    let discount = vouchers
        .iter()
        .find(|v| v.applicable && v.code.eq_ignore_ascii_case(form.voucher_code.trim()))
        .map_or(Money::ZERO, |v| v.discount);

    CheckoutTemplate {
        ctx,
        cart: CartView::from(cart),
        form,
        errors,
        provinces: data.provinces,
        districts: data.districts,
        wards: data.wards,
        province_placeholder: PROVINCE_PLACEHOLDER,
        district_placeholder: DISTRICT_PLACEHOLDER,
        ward_placeholder: WARD_PLACEHOLDER,
        vouchers,
        payment_options: PAYMENT_OPTIONS,
        subtotal: subtotal.to_string(),
        discount: discount.to_string(),
        total: subtotal.saturating_sub(discount).to_string(),
    }
}

/// Send the customer back to the cart when there is nothing to check out.
async fn empty_cart_redirect(session: &Session) -> Response {
    set_flash(session, Flash::info("Giỏ hàng của bạn đang trống")).await;
    Redirect::to("/cart").into_response()
}

/// Display the checkout form.
///
/// The query string may carry a partly filled form: picking an address or
/// previewing a voucher without JavaScript submits the form here by GET.
#[instrument(skip(state, session, ctx, customer))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    session: Session,
    ctx: PageContext,
    Query(mut form): Query<CheckoutForm>,
) -> Response {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        return empty_cart_redirect(&session).await;
    }

    if form.receiver_name.trim().is_empty() {
        form.receiver_name = customer.full_name.clone().unwrap_or_default();
    }
    if form.payment_method.trim().is_empty() {
        form.payment_method = PaymentMethod::Cash.as_str().to_string();
    }

    let data = CheckoutData::load(&state, &form.province, &form.district).await;
    render(ctx, &cart, form, FieldErrors::new(), data).into_response()
}

/// Validate and place the order.
///
/// Cash orders land on the order page; online orders go straight to VNPay.
/// If the payment URL cannot be issued the order still exists and can be
/// paid from its detail page.
#[instrument(skip(state, session, ctx, customer, form))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    session: Session,
    mut ctx: PageContext,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await;
    if cart.is_empty() {
        return Ok(empty_cart_redirect(&session).await);
    }

    let data = CheckoutData::load(&state, &form.province, &form.district).await;
    let validated = match checkout::validate(&form, &cart, data.lists(), &data.vouchers, now()) {
        Ok(validated) => validated,
        Err(errors) => {
            tracing::debug!(fields = errors.len(), "Checkout form rejected");
            ctx.show(Flash::error("Vui lòng kiểm tra lại thông tin đặt hàng"));
            return Ok(invalid(render(ctx, &cart, form, errors, data)));
        }
    };

    let order = match state.api().place_order(customer.token(), &validated.request).await {
        Ok(order) => order,
        Err(e) if e.is_unauthorized() => return Err(e.into()),
        Err(e) => {
            tracing::warn!("Order rejected by backend: {e}");
            ctx.show(Flash::error(e.user_message("Đặt hàng không thành công, vui lòng thử lại")));
            return Ok(invalid(render(ctx, &cart, form, FieldErrors::new(), data)));
        }
    };

    tracing::info!(order_id = %order.id, total = %order.total, "Order placed");
    let order_id = order.id.to_string();
    add_breadcrumb("order", "Order placed", Some(&[("order_id", order_id.as_str())][..]));

    cart.clear();
    save_cart(&session, &cart).await?;

    let order_path = format!("/orders/{}", order.id);
    if order.payment_method == PaymentMethod::Cash {
        return Ok(Redirect::to(&placed_order_path(order.id)).into_response());
    }

    Ok(redirect_to_payment(&state, &session, &customer, &order, &order_path).await)
}

pub(super) async fn redirect_to_payment(
    state: &AppState,
    session: &Session,
    customer: &CurrentCustomer,
    order: &sgshop_core::records::Order,
    order_path: &str,
) -> Response {
    if let Some(url) = non_blank(order.payment_url.as_deref()) {
        return Redirect::to(url).into_response();
    }
    match state.api().vnpay_url(customer.token(), order.id).await {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            tracing::warn!(order_id = %order.id, "Failed to issue VNPay URL: {e}");
            set_flash(
                session,
                Flash::error("Đã tạo đơn hàng nhưng chưa mở được cổng thanh toán. Bạn có thể thanh toán lại tại đây."),
            )
            .await;
            Redirect::to(order_path).into_response()
        }
    }
}

/// Order detail in its just-placed confirmation state.
#[must_use]
pub fn placed_order_path(id: OrderId) -> String {
    format!("/orders/{id}?placed=1")
}

fn invalid(template: CheckoutTemplate) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sgshop_core::records::Product;

    use super::*;

    fn cart() -> Cart {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 1, "name": "Áo", "price": 300_000, "stock": 10
        }))
        .unwrap();
        let mut cart = Cart::default();
        cart.add(&product, 2).unwrap();
        cart
    }

    fn voucher(code: &str) -> Voucher {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "code": code,
            "discountType": "FIXED",
            "discountValue": 50_000,
            "minOrderValue": 100_000,
            "quantity": 10,
            "startDate": "2000-01-01T00:00:00",
            "endDate": "2999-12-31T23:59:59",
            "active": true,
        }))
        .unwrap()
    }

    fn data(vouchers: Vec<Voucher>) -> CheckoutData {
        CheckoutData {
            provinces: Arc::default(),
            districts: Arc::default(),
            wards: Arc::default(),
            vouchers: Arc::new(vouchers),
        }
    }

    #[test]
    fn test_render_previews_selected_voucher() {
        let form = CheckoutForm {
            voucher_code: "giam50k".to_string(),
            ..CheckoutForm::default()
        };
        let page = render(
            PageContext::default(),
            &cart(),
            form,
            FieldErrors::new(),
            data(vec![voucher("GIAM50K")]),
        );
        assert_eq!(page.subtotal, Money::from_dong(600_000).to_string());
        assert_eq!(page.discount, Money::from_dong(50_000).to_string());
        assert_eq!(page.total, Money::from_dong(550_000).to_string());
        assert_eq!(page.vouchers.len(), 1);
    }

    #[test]
    fn test_cash_orders_land_on_confirmation() {
        assert_eq!(placed_order_path(OrderId::new(42)), "/orders/42?placed=1");
    }

    #[test]
    fn test_render_without_voucher_has_no_discount() {
        let page = render(
            PageContext::default(),
            &cart(),
            CheckoutForm::default(),
            FieldErrors::new(),
            data(vec![voucher("GIAM50K")]),
        );
        assert_eq!(page.discount, Money::ZERO.to_string());
        assert_eq!(page.total, page.subtotal);
    }
}
