//! Voucher management.
//!
//! Terms are checked with [`VoucherTerms::validate`] and the window with
//! [`VoucherWindow::new`] before anything is sent, so the form shows the
//! same rules the checkout preview relies on.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Duration, NaiveDateTime};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use sgshop_core::records::Voucher;
use sgshop_core::types::datetime::parse_flexible;
use sgshop_core::{
    DiscountKind, FieldErrors, Money, VoucherError, VoucherId, VoucherTerms, VoucherWindow,
};

use crate::api::VoucherPayload;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireStaff};
use crate::state::AppState;

use super::{degrade, finish, non_blank};

const CODE_MIN_LEN: usize = 3;
const CODE_MAX_LEN: usize = 20;

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Clone)]
pub struct VoucherRowView {
    pub id: VoucherId,
    pub code: String,
    pub summary: String,
    pub min_order_value: String,
    pub quantity: i64,
    pub window: String,
    pub state_label: &'static str,
    pub state_class: &'static str,
}

impl VoucherRowView {
    fn new(voucher: &Voucher, now: NaiveDateTime) -> Self {
        let (state_label, state_class) = if !voucher.active {
            ("Đã tắt", "badge-muted")
        } else if voucher.is_usable_at(now) {
            ("Đang áp dụng", "badge-success")
        } else if now < voucher.start_date {
            ("Chưa bắt đầu", "badge-info")
        } else if voucher.quantity <= 0 {
            ("Hết lượt", "badge-warning")
        } else {
            ("Hết hạn", "badge-danger")
        };

        Self {
            id: voucher.id,
            code: voucher.code.clone(),
            summary: voucher.summary(),
            min_order_value: voucher.min_order_value.to_string(),
            quantity: voucher.quantity,
            window: format!(
                "{} - {}",
                filters::format_datetime(Some(voucher.start_date)),
                filters::format_datetime(Some(voucher.end_date))
            ),
            state_label,
            state_class,
        }
    }
}

// =============================================================================
// Form
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VoucherForm {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub discount_type: String,
    #[serde(default)]
    pub discount_value: String,
    #[serde(default)]
    pub min_order_value: String,
    #[serde(default)]
    pub max_discount: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    /// Checkbox; absent when unticked.
    #[serde(default)]
    pub active: Option<String>,
}

impl VoucherForm {
    /// A blank form starting now and running for thirty days.
    fn starting_at(now: NaiveDateTime) -> Self {
        Self {
            discount_type: DiscountKind::Fixed.as_str().to_string(),
            min_order_value: "0".to_string(),
            quantity: "100".to_string(),
            start_date: filters::datetime_input(now),
            end_date: filters::datetime_input(now + Duration::days(30)),
            active: Some("on".to_string()),
            ..Self::default()
        }
    }

    fn from_voucher(voucher: &Voucher) -> Self {
        Self {
            code: voucher.code.clone(),
            description: voucher.description.clone().unwrap_or_default(),
            discount_type: voucher.discount_type.as_str().to_string(),
            discount_value: voucher.discount_value.normalize().to_string(),
            min_order_value: voucher.min_order_value.as_dong().to_string(),
            max_discount: voucher
                .max_discount
                .map(|m| m.as_dong().to_string())
                .unwrap_or_default(),
            quantity: voucher.quantity.to_string(),
            start_date: filters::datetime_input(voucher.start_date),
            end_date: filters::datetime_input(voucher.end_date),
            active: voucher.active.then(|| "on".to_string()),
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn is_percentage(&self) -> bool {
        self.discount_type.parse::<DiscountKind>() == Ok(DiscountKind::Percentage)
    }

    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self) -> Result<VoucherPayload, FieldErrors> {
        let mut errors = FieldErrors::new();

        let code = normalize_code(&self.code)
            .map_err(|msg| errors.add("code", msg))
            .ok();

        let kind = self.discount_type.parse::<DiscountKind>().ok();
        if kind.is_none() {
            errors.add("discount_type", "Loại giảm giá không hợp lệ");
        }
        // Fixed amounts are typed like prices ("50.000"); percentages are plain decimals.
        let value = if kind == Some(DiscountKind::Fixed) {
            errors
                .parse_money("discount_value", &self.discount_value, "Giá trị giảm")
                .map(|money| money.amount())
        } else {
            errors.parse_decimal("discount_value", &self.discount_value, "Giá trị giảm")
        };
        let min_order_value = match non_blank(Some(&self.min_order_value)) {
            None => Some(Money::ZERO),
            Some(raw) => errors.parse_money("min_order_value", raw, "Đơn tối thiểu"),
        };
        let max_discount = match non_blank(Some(&self.max_discount)) {
            None => Some(None),
            Some(raw) => errors
                .parse_money("max_discount", raw, "Giảm tối đa")
                .map(Some),
        };
        let quantity = errors.parse_positive_int("quantity", &self.quantity, "Số lượng");

        let start = parse_date(&mut errors, "start_date", &self.start_date, "Ngày bắt đầu");
        let end = parse_date(&mut errors, "end_date", &self.end_date, "Ngày kết thúc");

        if let (Some(kind), Some(value), Some(min_order_value), Some(max_discount)) =
            (kind, value, min_order_value, max_discount)
        {
            let terms = VoucherTerms {
                kind,
                value,
                min_order_value,
                // Only percentages are capped.
                max_discount: max_discount.filter(|_| kind == DiscountKind::Percentage),
            };
            if let Err(e) = terms.validate() {
                add_voucher_error(&mut errors, &e);
            }
        }

        if let (Some(start), Some(end)) = (start, end) {
            if let Err(e) = VoucherWindow::new(start, end) {
                add_voucher_error(&mut errors, &e);
            }
        }

        match (code, kind, value, min_order_value, max_discount, quantity, start, end) {
            (
                Some(code),
                Some(kind),
                Some(value),
                Some(min_order_value),
                Some(max_discount),
                Some(quantity),
                Some(start),
                Some(end),
            ) if errors.is_empty() => Ok(VoucherPayload {
                code,
                description: FieldErrors::optional_text(Some(&self.description)),
                discount_type: kind,
                discount_value: value,
                min_order_value,
                max_discount: max_discount.filter(|_| kind == DiscountKind::Percentage),
                quantity,
                start_date: start,
                end_date: end,
                active: self.is_active(),
            }),
            _ => Err(errors),
        }
    }
}

/// Uppercase ASCII letters and digits, 3 to 20 of them.
///
/// # Errors
///
/// Returns the message to show under the code field.
pub fn normalize_code(raw: &str) -> Result<String, &'static str> {
    let code = raw.trim();
    if code.is_empty() {
        return Err("Mã voucher là bắt buộc");
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Mã voucher chỉ gồm chữ và số, không dấu");
    }
    if !(CODE_MIN_LEN..=CODE_MAX_LEN).contains(&code.len()) {
        return Err("Mã voucher phải dài từ 3 đến 20 ký tự");
    }
    Ok(code.to_ascii_uppercase())
}

fn parse_date(errors: &mut FieldErrors, field: &str, raw: &str, label: &str) -> Option<NaiveDateTime> {
    if raw.trim().is_empty() {
        errors.add(field, format!("{label} là bắt buộc"));
        return None;
    }
    let parsed = parse_flexible(raw);
    if parsed.is_none() {
        errors.add(field, format!("{label} không hợp lệ"));
    }
    parsed
}

fn add_voucher_error(errors: &mut FieldErrors, error: &VoucherError) {
    let (field, message) = match error {
        VoucherError::NonPositiveValue => ("discount_value", "Giá trị giảm phải lớn hơn 0"),
        VoucherError::PercentageOver100 => {
            ("discount_value", "Phần trăm giảm không được vượt quá 100")
        }
        VoucherError::NegativeMinimum => ("min_order_value", "Đơn tối thiểu không được âm"),
        VoucherError::NonPositiveMaxDiscount => ("max_discount", "Giảm tối đa phải lớn hơn 0"),
        VoucherError::InvalidWindow => ("end_date", "Ngày kết thúc phải sau ngày bắt đầu"),
    };
    errors.add(field, message);
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "vouchers/index.html")]
pub struct VouchersTemplate {
    pub ctx: PageContext,
    pub vouchers: Vec<VoucherRowView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "vouchers/form.html")]
pub struct VoucherFormTemplate {
    pub ctx: PageContext,
    /// `None` when creating.
    pub voucher_id: Option<VoucherId>,
    pub form: VoucherForm,
    pub errors: FieldErrors,
}

impl VoucherFormTemplate {
    #[must_use]
    pub fn action(&self) -> String {
        self.voucher_id
            .map_or_else(|| "/vouchers".to_string(), |id| format!("/vouchers/{id}"))
    }

    fn invalid(ctx: PageContext, voucher_id: Option<VoucherId>, form: VoucherForm, errors: FieldErrors) -> Response {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Self {
                ctx,
                voucher_id,
                form,
                errors,
            },
        )
            .into_response()
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

// =============================================================================
// Handlers
// =============================================================================

#[instrument(skip(state, staff, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ctx: PageContext,
) -> Result<impl IntoResponse, AppError> {
    let vouchers = degrade(state.api().vouchers(staff.token()).await, "vouchers")?;
    let now = now();
    Ok(VouchersTemplate {
        ctx,
        vouchers: vouchers.iter().map(|v| VoucherRowView::new(v, now)).collect(),
    })
}

#[instrument(skip_all)]
pub async fn new_voucher(RequireStaff(_staff): RequireStaff, ctx: PageContext) -> impl IntoResponse {
    VoucherFormTemplate {
        ctx,
        voucher_id: None,
        form: VoucherForm::starting_at(now()),
        errors: FieldErrors::new(),
    }
}

#[instrument(skip(state, staff, session, ctx, form))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    ctx: PageContext,
    Form(form): Form<VoucherForm>,
) -> Result<Response, AppError> {
    let payload = match form.validate() {
        Ok(payload) => payload,
        Err(errors) => return Ok(VoucherFormTemplate::invalid(ctx, None, form, errors)),
    };

    let result = state.api().create_voucher(staff.token(), &payload).await;
    if result.is_ok() {
        tracing::info!(code = %payload.code, "Voucher created");
    }
    let success = format!("Đã tạo voucher {}", payload.code);
    Ok(finish(&session, result, &success, "Không thể tạo voucher", "/vouchers")
        .await?
        .into_response())
}

#[instrument(skip(state, staff, ctx))]
pub async fn edit(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ctx: PageContext,
    Path(id): Path<VoucherId>,
) -> Result<impl IntoResponse, AppError> {
    let vouchers = state.api().vouchers(staff.token()).await?;
    let voucher = vouchers
        .iter()
        .find(|v| v.id == id)
        .ok_or_else(|| AppError::NotFound(format!("voucher {id}")))?;

    Ok(VoucherFormTemplate {
        ctx,
        voucher_id: Some(id),
        form: VoucherForm::from_voucher(voucher),
        errors: FieldErrors::new(),
    })
}

#[instrument(skip(state, staff, session, ctx, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    ctx: PageContext,
    Path(id): Path<VoucherId>,
    Form(form): Form<VoucherForm>,
) -> Result<Response, AppError> {
    let payload = match form.validate() {
        Ok(payload) => payload,
        Err(errors) => return Ok(VoucherFormTemplate::invalid(ctx, Some(id), form, errors)),
    };

    let result = state.api().update_voucher(staff.token(), id, &payload).await;
    let success = format!("Đã cập nhật voucher {}", payload.code);
    Ok(finish(&session, result, &success, "Không thể cập nhật voucher", "/vouchers")
        .await?
        .into_response())
}

#[instrument(skip(state, staff, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    Path(id): Path<VoucherId>,
) -> Result<Redirect, AppError> {
    let result = state.api().delete_voucher(staff.token(), id).await;
    finish(&session, result, "Đã xoá voucher", "Không thể xoá voucher", "/vouchers").await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;

    fn form() -> VoucherForm {
        VoucherForm {
            code: " he2024 ".to_string(),
            description: "Khuyến mãi hè".to_string(),
            discount_type: "PERCENTAGE".to_string(),
            discount_value: "10".to_string(),
            min_order_value: "200.000".to_string(),
            max_discount: "50000".to_string(),
            quantity: "100".to_string(),
            start_date: "2024-06-01T00:00".to_string(),
            end_date: "2024-06-30T23:59".to_string(),
            active: Some("on".to_string()),
        }
    }

    #[test]
    fn test_valid_voucher() {
        let payload = form().validate().unwrap();
        assert_eq!(payload.code, "HE2024");
        assert_eq!(payload.discount_type, DiscountKind::Percentage);
        assert_eq!(payload.discount_value, Decimal::from(10));
        assert_eq!(payload.min_order_value, Money::from_dong(200_000));
        assert_eq!(payload.max_discount, Some(Money::from_dong(50_000)));
        assert!(payload.active);
        assert_eq!(
            payload.start_date,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_fixed_value_uses_thousands_separator() {
        let payload = VoucherForm {
            discount_type: "FIXED".to_string(),
            discount_value: "50.000".to_string(),
            min_order_value: "200.000".to_string(),
            ..form()
        }
        .validate()
        .unwrap();
        assert_eq!(payload.discount_value, Decimal::from(50_000));
        assert_eq!(payload.min_order_value, Money::from_dong(200_000));
    }

    #[test]
    fn test_non_numeric_value_is_a_field_error() {
        for kind in ["PERCENTAGE", "FIXED"] {
            let errors = VoucherForm {
                discount_type: kind.to_string(),
                discount_value: "abc".to_string(),
                ..form()
            }
            .validate()
            .unwrap_err();
            assert!(errors.has("discount_value"), "{kind}");
            assert_eq!(errors.message("discount_value"), "Giá trị giảm phải là số");
        }
    }

    #[test]
    fn test_code_rules() {
        assert_eq!(normalize_code("sale50").unwrap(), "SALE50");
        assert!(normalize_code("AB").is_err());
        assert!(normalize_code("GIẢMGIÁ").is_err());
        assert!(normalize_code("SALE 50").is_err());
        assert!(normalize_code(&"A".repeat(21)).is_err());
    }

    #[test]
    fn test_percentage_over_100() {
        let errors = VoucherForm {
            discount_value: "150".to_string(),
            ..form()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors.message("discount_value"),
            "Phần trăm giảm không được vượt quá 100"
        );
    }

    #[test]
    fn test_fixed_voucher_drops_cap() {
        let payload = VoucherForm {
            discount_type: "FIXED".to_string(),
            discount_value: "30000".to_string(),
            ..form()
        }
        .validate()
        .unwrap();
        assert_eq!(payload.max_discount, None);
    }

    #[test]
    fn test_window_and_quantity() {
        let errors = VoucherForm {
            end_date: "2024-05-31T00:00".to_string(),
            quantity: "0".to_string(),
            active: None,
            ..form()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.message("end_date"), "Ngày kết thúc phải sau ngày bắt đầu");
        assert!(errors.has("quantity"));
    }

    #[test]
    fn test_edit_form_round_trips_voucher() {
        let voucher = Voucher {
            id: VoucherId::new(4),
            code: "HE2024".to_string(),
            description: None,
            discount_type: DiscountKind::Percentage,
            discount_value: Decimal::new(100, 1),
            min_order_value: Money::from_dong(200_000),
            max_discount: Some(Money::from_dong(50_000)),
            quantity: 100,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap().and_hms_opt(23, 59, 0).unwrap(),
            active: true,
        };
        let form = VoucherForm::from_voucher(&voucher);
        assert_eq!(form.discount_value, "10");
        assert_eq!(form.start_date, "2024-06-01T00:00");
        assert!(form.is_percentage());
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_row_state() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let voucher = Voucher {
            id: VoucherId::new(1),
            code: "A1B2".to_string(),
            description: None,
            discount_type: DiscountKind::Fixed,
            discount_value: Decimal::from(20_000),
            min_order_value: Money::ZERO,
            max_discount: None,
            quantity: 5,
            start_date: start,
            end_date: start + Duration::days(10),
            active: true,
        };
        assert_eq!(VoucherRowView::new(&voucher, start + Duration::days(1)).state_label, "Đang áp dụng");
        assert_eq!(VoucherRowView::new(&voucher, start - Duration::days(1)).state_label, "Chưa bắt đầu");
        assert_eq!(VoucherRowView::new(&voucher, start + Duration::days(11)).state_label, "Hết hạn");
    }
}
