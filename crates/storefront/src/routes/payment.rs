//! VNPay payment route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::NaiveDateTime;
use tower_sessions::Session;
use tracing::instrument;

use sgshop_core::{Flash, OrderId};

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, PageContext, RequireAuth, set_flash};
use crate::services::vnpay::{self, VnpayReturn};
use crate::state::AppState;

use super::checkout::redirect_to_payment;

/// Payment result page template.
#[derive(Template, WebTemplate)]
#[template(path = "payment/result.html")]
pub struct PaymentResultTemplate {
    pub ctx: PageContext,
    pub success: bool,
    pub message: String,
    pub order_id: Option<OrderId>,
    pub amount: String,
    pub transaction_no: String,
    pub bank_code: String,
    pub pay_date: String,
    /// Whether the backend accepted the forwarded result.
    pub recorded: bool,
}

impl PaymentResultTemplate {
    fn rejected(ctx: PageContext, message: &str) -> Self {
        Self {
            ctx,
            success: false,
            message: message.to_string(),
            order_id: None,
            amount: String::new(),
            transaction_no: String::new(),
            bank_code: String::new(),
            pay_date: String::new(),
            recorded: false,
        }
    }

    fn from_return(ctx: PageContext, ret: &VnpayReturn, recorded: bool) -> Self {
        Self {
            ctx,
            success: ret.is_success(),
            message: ret.message().to_string(),
            order_id: ret.order_id(),
            amount: ret.amount.to_string(),
            transaction_no: ret.transaction_no.clone().unwrap_or_default(),
            bank_code: ret.bank_code.clone().unwrap_or_default(),
            pay_date: ret.pay_date.as_deref().map(format_pay_date).unwrap_or_default(),
            recorded,
        }
    }
}

/// `vnp_PayDate` is `yyyyMMddHHmmss`; anything else is shown as sent.
fn format_pay_date(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S")
        .map_or_else(|_| raw.to_string(), |dt| filters::format_datetime(Some(dt)))
}

/// Handle the customer returning from VNPay.
///
/// Verifies the signature when a hash secret is configured, forwards the
/// raw query to the backend so it can record the payment, then shows the
/// outcome. A forged or incomplete return is never forwarded.
#[instrument(skip(state, customer, ctx, query))]
pub async fn vnpay_return(
    State(state): State<AppState>,
    OptionalAuth(customer): OptionalAuth,
    ctx: PageContext,
    RawQuery(query): RawQuery,
) -> Response {
    let raw = query.unwrap_or_default();
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes()).into_owned().collect();
    let params = vnpay::vnp_params(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let verified = state
        .config()
        .vnpay_hash_secret
        .as_ref()
        .map_or(Ok(()), |secret| vnpay::verify(&params, secret));
    if let Err(e) = verified {
        tracing::warn!("Rejected VNPay return: {e}");
        return (
            StatusCode::BAD_REQUEST,
            PaymentResultTemplate::rejected(ctx, "Chữ ký giao dịch không hợp lệ. Vui lòng liên hệ cửa hàng nếu bạn đã bị trừ tiền."),
        )
            .into_response();
    }

    let ret = match VnpayReturn::from_params(&params) {
        Ok(ret) => ret,
        Err(e) => {
            tracing::warn!("Malformed VNPay return: {e}");
            return (
                StatusCode::BAD_REQUEST,
                PaymentResultTemplate::rejected(ctx, "Thiếu thông tin giao dịch thanh toán."),
            )
                .into_response();
        }
    };

    let token = customer.as_ref().map(|c| c.token());
    let recorded = match state.api().vnpay_callback(token, &raw).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(txn_ref = %ret.txn_ref, "Backend rejected VNPay callback: {e}");
            false
        }
    };

    tracing::info!(
        txn_ref = %ret.txn_ref,
        response_code = %ret.response_code,
        success = ret.is_success(),
        "VNPay return"
    );
    add_breadcrumb(
        "payment",
        "VNPay return",
        Some(&[("txn_ref", ret.txn_ref.as_str()), ("response_code", ret.response_code.as_str())][..]),
    );

    PaymentResultTemplate::from_return(ctx, &ret, recorded).into_response()
}

/// Issue a fresh VNPay URL for an unpaid online order.
#[instrument(skip(state, customer, session))]
pub async fn pay_order(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    session: Session,
    Path(id): Path<OrderId>,
) -> Result<Response, AppError> {
    let order = state.api().get_order(customer.token(), id).await?;
    let order_path = format!("/orders/{id}");

    if !order.awaiting_online_payment() {
        set_flash(&session, Flash::error("Đơn hàng này không chờ thanh toán trực tuyến")).await;
        return Ok(Redirect::to(&order_path).into_response());
    }

    Ok(redirect_to_payment(&state, &session, &customer, &order, &order_path).await)
}
