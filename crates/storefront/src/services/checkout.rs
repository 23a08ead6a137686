//! Checkout form validation and order request building.
//!
//! Everything here is pure: handlers fetch the address lists and vouchers,
//! then hand them in together with the submitted form.

use chrono::NaiveDateTime;
use serde::Deserialize;

use sgshop_core::records::{CreateOrderRequest, Region, Voucher, region_name};
use sgshop_core::{FieldErrors, Money, PaymentMethod, PhoneNumber};

use crate::models::Cart;

/// Submitted checkout form. Every field defaults so a partial form still
/// re-renders with what the customer typed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub receiver_name: String,
    pub receiver_phone: String,
    pub province: String,
    pub district: String,
    pub ward: String,
    pub street: String,
    pub note: String,
    pub payment_method: String,
    pub voucher_code: String,
}

/// Address lists the submitted codes are checked against.
#[derive(Debug, Clone, Copy)]
pub struct AddressLists<'a> {
    pub provinces: &'a [Region],
    pub districts: &'a [Region],
    pub wards: &'a [Region],
}

/// A validated checkout, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCheckout {
    pub request: CreateOrderRequest,
    pub subtotal: Money,
    pub discount: Money,
}

impl ValidatedCheckout {
    #[must_use]
    pub fn total(&self) -> Money {
        self.subtotal.saturating_sub(self.discount)
    }
}

/// A voucher as offered on the checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherOption {
    pub code: String,
    pub summary: String,
    pub description: String,
    /// Discount this voucher would give on the current subtotal.
    pub discount: Money,
    /// Whether the subtotal reaches the voucher's minimum.
    pub applicable: bool,
    pub min_order_value: Money,
}

/// Vouchers usable at `now`, with the discount each would give.
#[must_use]
pub fn voucher_options(vouchers: &[Voucher], subtotal: Money, now: NaiveDateTime) -> Vec<VoucherOption> {
    vouchers
        .iter()
        .filter(|v| v.is_usable_at(now))
        .map(|v| {
            let terms = v.terms();
            VoucherOption {
                code: v.code.clone(),
                summary: v.summary(),
                description: v.description.clone().unwrap_or_default(),
                discount: terms.discount_for(subtotal),
                applicable: terms.applies_to(subtotal),
                min_order_value: v.min_order_value,
            }
        })
        .collect()
}

/// Case-insensitive lookup by code.
#[must_use]
pub fn find_voucher<'a>(vouchers: &'a [Voucher], code: &str) -> Option<&'a Voucher> {
    let code = code.trim();
    vouchers.iter().find(|v| v.code.eq_ignore_ascii_case(code))
}

/// Validate the form against the cart, the address lists and the
/// available vouchers.
///
/// # Errors
///
/// Returns every field problem found. Nothing should be sent to the
/// backend in that case.
pub fn validate(
    form: &CheckoutForm,
    cart: &Cart,
    lists: AddressLists<'_>,
    vouchers: &[Voucher],
    now: NaiveDateTime,
) -> Result<ValidatedCheckout, FieldErrors> {
    let mut errors = FieldErrors::new();

    if cart.is_empty() {
        errors.add("cart", "Giỏ hàng đang trống");
    }

    let receiver_name = errors.require_text("receiver_name", &form.receiver_name, "Vui lòng nhập tên người nhận");

    let receiver_phone = match PhoneNumber::parse(&form.receiver_phone) {
        Ok(phone) => Some(phone.as_str().to_string()),
        Err(sgshop_core::PhoneError::Empty) => {
            errors.add("receiver_phone", "Vui lòng nhập số điện thoại");
            None
        }
        Err(_) => {
            errors.add("receiver_phone", "Số điện thoại không hợp lệ");
            None
        }
    };

    let province = pick_region(&mut errors, "province", &form.province, lists.provinces, "Vui lòng chọn tỉnh/thành phố");
    let district = pick_region(&mut errors, "district", &form.district, lists.districts, "Vui lòng chọn quận/huyện");
    let ward = pick_region(&mut errors, "ward", &form.ward, lists.wards, "Vui lòng chọn phường/xã");
    let street = errors.require_text("street", &form.street, "Vui lòng nhập số nhà, tên đường");

    let payment_method = match form.payment_method.parse::<PaymentMethod>() {
        Ok(method) => Some(method),
        Err(_) => {
            errors.add("payment_method", "Vui lòng chọn phương thức thanh toán");
            None
        }
    };

    let subtotal = cart.subtotal();
    let mut discount = Money::ZERO;
    let voucher_code = FieldErrors::optional_text(Some(&form.voucher_code));
    let voucher_code = match voucher_code {
        None => None,
        Some(code) => match find_voucher(vouchers, &code) {
            Some(v) if !v.is_usable_at(now) => {
                errors.add("voucher_code", "Mã giảm giá đã hết hạn hoặc hết lượt sử dụng");
                None
            }
            Some(v) if !v.terms().applies_to(subtotal) => {
                errors.add(
                    "voucher_code",
                    format!("Đơn hàng tối thiểu {} để dùng mã này", v.min_order_value),
                );
                None
            }
            Some(v) => {
                discount = v.terms().discount_for(subtotal);
                Some(v.code.clone())
            }
            None => {
                errors.add("voucher_code", "Mã giảm giá không hợp lệ");
                None
            }
        },
    };

    match (receiver_name, receiver_phone, province, district, ward, street, payment_method) {
        (Some(receiver_name), Some(receiver_phone), Some(province), Some(district), Some(ward), Some(street), Some(payment_method))
            if errors.is_empty() =>
        {
            Ok(ValidatedCheckout {
                request: CreateOrderRequest {
                    items: cart.order_lines(),
                    receiver_name,
                    receiver_phone,
                    shipping_address: format!("{street}, {ward}, {district}, {province}"),
                    note: FieldErrors::optional_text(Some(&form.note)),
                    payment_method,
                    voucher_code,
                },
                subtotal,
                discount,
            })
        }
        _ => Err(errors),
    }
}

/// Resolve a selected code to its name, or record `message`.
fn pick_region(errors: &mut FieldErrors, field: &str, code: &str, regions: &[Region], message: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
        errors.add(field, message);
        return None;
    }
    if let Some(name) = region_name(regions, code) {
        Some(name.to_string())
    } else {
        errors.add(field, message);
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use sgshop_core::records::Product;

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn region(code: &str, name: &str) -> Region {
        Region {
            code: code.to_string(),
            name: name.to_string(),
        }
    }

    fn cart(price: i64, qty: u32) -> Cart {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 1, "name": "Áo", "price": price, "stock": 10
        }))
        .unwrap();
        let mut cart = Cart::default();
        cart.add(&product, qty).unwrap();
        cart
    }

    fn voucher(code: &str, min: i64, quantity: i64) -> Voucher {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "code": code,
            "discountType": "FIXED",
            "discountValue": 20000,
            "minOrderValue": min,
            "quantity": quantity,
            "startDate": "2024-05-01",
            "endDate": "2024-05-31",
            "active": true
        }))
        .unwrap()
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            receiver_name: " Nguyễn Lan ".to_string(),
            receiver_phone: "+84 912 345 678".to_string(),
            province: "79".to_string(),
            district: "760".to_string(),
            ward: "26734".to_string(),
            street: "12 Lê Lợi".to_string(),
            note: String::new(),
            payment_method: "CASH".to_string(),
            voucher_code: String::new(),
        }
    }

    struct Lists {
        provinces: Vec<Region>,
        districts: Vec<Region>,
        wards: Vec<Region>,
    }

    impl Lists {
        fn new() -> Self {
            Self {
                provinces: vec![region("79", "Hồ Chí Minh")],
                districts: vec![region("760", "Quận 1")],
                wards: vec![region("26734", "Bến Nghé")],
            }
        }

        fn as_lists(&self) -> AddressLists<'_> {
            AddressLists {
                provinces: &self.provinces,
                districts: &self.districts,
                wards: &self.wards,
            }
        }
    }

    #[test]
    fn test_valid_checkout_builds_request() {
        let lists = Lists::new();
        let ok = validate(&form(), &cart(100_000, 2), lists.as_lists(), &[], now()).unwrap();
        assert_eq!(ok.request.receiver_name, "Nguyễn Lan");
        assert_eq!(ok.request.receiver_phone, "0912345678");
        assert_eq!(ok.request.shipping_address, "12 Lê Lợi, Bến Nghé, Quận 1, Hồ Chí Minh");
        assert_eq!(ok.request.payment_method, PaymentMethod::Cash);
        assert_eq!(ok.request.items.len(), 1);
        assert_eq!(ok.total(), Money::from_dong(200_000));
        assert!(ok.request.note.is_none());
    }

    #[test]
    fn test_collects_every_problem() {
        let lists = Lists::new();
        let bad = CheckoutForm {
            receiver_name: "  ".to_string(),
            receiver_phone: "12345".to_string(),
            ward: "99999".to_string(),
            payment_method: String::new(),
            ..form()
        };
        let errors = validate(&bad, &Cart::default(), lists.as_lists(), &[], now()).unwrap_err();
        for field in ["cart", "receiver_name", "receiver_phone", "ward", "payment_method"] {
            assert!(errors.has(field), "expected error for {field}");
        }
        assert!(!errors.has("province"));
    }

    #[test]
    fn test_voucher_applied() {
        let lists = Lists::new();
        let with_voucher = CheckoutForm {
            voucher_code: "sale20".to_string(),
            ..form()
        };
        let ok = validate(&with_voucher, &cart(100_000, 2), lists.as_lists(), &[voucher("SALE20", 150_000, 3)], now())
            .unwrap();
        assert_eq!(ok.request.voucher_code.as_deref(), Some("SALE20"));
        assert_eq!(ok.discount, Money::from_dong(20_000));
        assert_eq!(ok.total(), Money::from_dong(180_000));
    }

    #[test]
    fn test_voucher_rejections() {
        let lists = Lists::new();
        let with_voucher = CheckoutForm {
            voucher_code: "SALE20".to_string(),
            ..form()
        };

        let below_min = validate(&with_voucher, &cart(100_000, 1), lists.as_lists(), &[voucher("SALE20", 150_000, 3)], now())
            .unwrap_err();
        assert_eq!(below_min.get("voucher_code"), Some("Đơn hàng tối thiểu 150.000 ₫ để dùng mã này"));

        let used_up = validate(&with_voucher, &cart(100_000, 2), lists.as_lists(), &[voucher("SALE20", 0, 0)], now())
            .unwrap_err();
        assert!(used_up.has("voucher_code"));

        let unknown = validate(&with_voucher, &cart(100_000, 2), lists.as_lists(), &[], now()).unwrap_err();
        assert_eq!(unknown.get("voucher_code"), Some("Mã giảm giá không hợp lệ"));
    }

    #[test]
    fn test_voucher_options_preview() {
        let options = voucher_options(
            &[voucher("A", 0, 1), voucher("B", 500_000, 1), voucher("C", 0, 0)],
            Money::from_dong(100_000),
            now(),
        );
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].discount, Money::from_dong(20_000));
        assert!(options[0].applicable);
        assert!(!options[1].applicable);
        assert_eq!(options[1].discount, Money::ZERO);
    }
}
