//! Backend records and request bodies, camelCase on the wire.
//!
//! Both web apps and the CLI talk to the same REST backend, so the shapes
//! live here once. Optional fields default when the backend omits them.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::datetime::{flexible, flexible_option};
use crate::types::{
    BannerId, CategoryId, DiscountKind, Money, OrderId, OrderStatus, PaymentMethod, ProductId,
    UserId, VoucherId, VoucherTerms, VoucherWindow,
};

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub sale_price: Option<Money>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub sold: i64,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, with = "flexible_option")]
    pub created_at: Option<NaiveDateTime>,
}

impl Product {
    /// Sale price when it undercuts the list price, otherwise the list price.
    #[must_use]
    pub fn effective_price(&self) -> Money {
        match self.sale_price {
            Some(sale) if sale.is_positive() && sale < self.price => sale,
            _ => self.price,
        }
    }

    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.effective_price() < self.price
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: BannerId,
    #[serde(default)]
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    pub id: VoucherId,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub discount_type: DiscountKind,
    pub discount_value: Decimal,
    #[serde(default)]
    pub min_order_value: Money,
    #[serde(default)]
    pub max_discount: Option<Money>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(with = "flexible")]
    pub start_date: NaiveDateTime,
    #[serde(with = "flexible")]
    pub end_date: NaiveDateTime,
    #[serde(default)]
    pub active: bool,
}

impl Voucher {
    #[must_use]
    pub const fn terms(&self) -> VoucherTerms {
        VoucherTerms {
            kind: self.discount_type,
            value: self.discount_value,
            min_order_value: self.min_order_value,
            max_discount: self.max_discount,
        }
    }

    /// Redemption window as stored; not re-validated.
    #[must_use]
    pub const fn window(&self) -> VoucherWindow {
        VoucherWindow {
            start: self.start_date,
            end: self.end_date,
        }
    }

    #[must_use]
    pub fn is_usable_at(&self, now: NaiveDateTime) -> bool {
        crate::types::is_usable(self.active, self.quantity, &self.window(), now)
    }

    /// Short description of the discount, e.g. `Giảm 10% (tối đa 30.000 ₫)`.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.discount_type {
            DiscountKind::Fixed => format!("Giảm {}", Money::new(self.discount_value)),
            DiscountKind::Percentage => match self.max_discount {
                Some(max) => format!("Giảm {}% (tối đa {max})", self.discount_value.normalize()),
                None => format!("Giảm {}%", self.discount_value.normalize()),
            },
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub price: Money,
    pub quantity: u32,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub subtotal: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub shipping_fee: Money,
    #[serde(default)]
    pub total: Money,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub voucher_code: Option<String>,
    #[serde(default)]
    pub receiver_name: String,
    #[serde(default)]
    pub receiver_phone: String,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default, with = "flexible_option")]
    pub created_at: Option<NaiveDateTime>,
}

impl Order {
    /// Backend order code, or `#<id>` when it has none.
    #[must_use]
    pub fn display_code(&self) -> String {
        match self.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_owned(),
            _ => format!("#{}", self.id),
        }
    }

    #[must_use]
    pub const fn can_cancel(&self) -> bool {
        self.status.is_cancellable_by_customer()
    }

    /// An online order that has not been paid yet.
    #[must_use]
    pub fn awaiting_online_payment(&self) -> bool {
        self.payment_method == PaymentMethod::Online && self.status == OrderStatus::Pending
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineRequest>,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub shipping_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher_code: Option<String>,
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Role {
    #[must_use]
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.iter().any(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl User {
    #[must_use]
    pub fn role_names(&self) -> Vec<&str> {
        self.roles.iter().map(|r| r.name.as_str()).collect()
    }

    #[must_use]
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name.eq_ignore_ascii_case(name))
    }
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

// =============================================================================
// Address
// =============================================================================

/// A province, district or ward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    #[serde(deserialize_with = "code_string")]
    pub code: String,
    pub name: String,
}

/// Region codes arrive as numbers from some providers and strings from others.
fn code_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(i64),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Text(s) => s,
        Code::Number(n) => n.to_string(),
    })
}

/// Look up a region name by code.
#[must_use]
pub fn region_name<'a>(regions: &'a [Region], code: &str) -> Option<&'a str> {
    regions
        .iter()
        .find(|r| r.code == code)
        .map(|r| r.name.as_str())
}

// =============================================================================
// Revenue
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RevenueSummary {
    pub total_revenue: Money,
    pub total_orders: i64,
    pub total_customers: i64,
    pub total_products: i64,
}

/// Revenue for one month (yearly report) or one day (monthly report).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenuePoint {
    pub label: u32,
    #[serde(default)]
    pub revenue: Money,
    #[serde(default)]
    pub orders: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub quantity_sold: i64,
    #[serde(default)]
    pub revenue: Money,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_product_effective_price() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Áo thun",
            "price": 200000,
            "salePrice": "150000",
            "stock": 4,
            "images": ["https://cdn.shop.vn/a.jpg"]
        }))
        .unwrap();
        assert_eq!(product.effective_price(), Money::from_dong(150_000));
        assert!(product.is_on_sale());
        assert_eq!(product.primary_image(), Some("https://cdn.shop.vn/a.jpg"));

        let not_lower = Product {
            sale_price: Some(Money::from_dong(250_000)),
            ..product
        };
        assert_eq!(not_lower.effective_price(), Money::from_dong(200_000));
        assert!(!not_lower.is_on_sale());
    }

    #[test]
    fn test_voucher_from_wire() {
        let voucher: Voucher = serde_json::from_value(serde_json::json!({
            "id": 1,
            "code": "SALE10",
            "discountType": "PERCENTAGE",
            "discountValue": 10,
            "minOrderValue": 100000,
            "maxDiscount": 30000,
            "quantity": 5,
            "startDate": "2024-05-01",
            "endDate": "2024-05-31T23:59:59",
            "active": true
        }))
        .unwrap();
        let inside = NaiveDate::from_ymd_opt(2024, 5, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(voucher.is_usable_at(inside));
        assert!(!voucher.is_usable_at(after));
        assert_eq!(
            voucher.terms().discount_for(Money::from_dong(500_000)),
            Money::from_dong(30_000)
        );
        assert_eq!(voucher.summary(), "Giảm 10% (tối đa 30.000 ₫)");
    }

    #[test]
    fn test_order_display_code_and_counts() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 42,
            "items": [
                {"productId": 1, "productName": "A", "price": 10000, "quantity": 2},
                {"productId": 2, "productName": "B", "price": 5000, "quantity": 1}
            ],
            "total": 25000,
            "status": "PENDING",
            "paymentMethod": "ONLINE",
            "createdAt": "2024-05-01T08:30:00"
        }))
        .unwrap();
        assert_eq!(order.display_code(), "#42");
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.items[0].line_total(), Money::from_dong(20_000));
        assert!(order.can_cancel());
        assert!(order.awaiting_online_payment());
    }

    #[test]
    fn test_create_order_request_wire_format() {
        let body = CreateOrderRequest {
            items: vec![OrderLineRequest {
                product_id: ProductId::new(7),
                quantity: 2,
            }],
            receiver_name: "Lan".to_owned(),
            receiver_phone: "0912345678".to_owned(),
            shipping_address: "1 Lê Lợi, Bến Nghé, Quận 1, Hồ Chí Minh".to_owned(),
            note: None,
            payment_method: PaymentMethod::Cash,
            voucher_code: Some("SALE10".to_owned()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["items"][0]["productId"], 7);
        assert_eq!(json["paymentMethod"], "CASH");
        assert_eq!(json["voucherCode"], "SALE10");
        assert!(json.get("note").is_none());
    }

    #[test]
    fn test_region_codes_accept_numbers() {
        let regions: Vec<Region> = serde_json::from_str(
            r#"[{"code":79,"name":"Hồ Chí Minh"},{"code":"01","name":"Hà Nội"}]"#,
        )
        .unwrap();
        assert_eq!(region_name(&regions, "79"), Some("Hồ Chí Minh"));
        assert_eq!(region_name(&regions, "01"), Some("Hà Nội"));
        assert_eq!(region_name(&regions, "02"), None);
    }

    #[test]
    fn test_user_defaults_active() {
        let user: User = serde_json::from_str(
            r#"{"id":1,"email":"a@b.vn","roles":[{"name":"STAFF"}]}"#,
        )
        .unwrap();
        assert!(user.active);
        assert!(user.has_role("staff"));
        assert_eq!(user.role_names(), vec!["STAFF"]);
    }
}
