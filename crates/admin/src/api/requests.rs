//! Request bodies for back-office mutations.
//!
//! Built only from forms that passed validation.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use sgshop_core::types::datetime::flexible;
use sgshop_core::{CategoryId, DiscountKind, Money};

/// Product fields, sent as the `product` JSON part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<Money>,
    pub stock: i64,
    pub category_id: CategoryId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherPayload {
    /// Always uppercase.
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub discount_type: DiscountKind,
    pub discount_value: Decimal,
    pub min_order_value: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discount: Option<Money>,
    pub quantity: i64,
    #[serde(with = "flexible")]
    pub start_date: NaiveDateTime,
    #[serde(with = "flexible")]
    pub end_date: NaiveDateTime,
    pub active: bool,
}

/// Role with the names of the permissions it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Banner fields, sent as the `banner` JSON part next to the `image` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerPayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub active: bool,
}

/// An uploaded image, passed through to the backend as a file part.
#[derive(Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusUpdate {
    pub status: sgshop_core::OrderStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct RolesUpdate<'a> {
    pub roles: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct ActiveUpdate {
    pub active: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_voucher_payload_wire_shape() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let payload = VoucherPayload {
            code: "HE2024".to_string(),
            description: None,
            discount_type: DiscountKind::Percentage,
            discount_value: Decimal::from(10),
            min_order_value: Money::from_dong(200_000),
            max_discount: Some(Money::from_dong(50_000)),
            quantity: 100,
            start_date: start,
            end_date: start + chrono::Duration::days(30),
            active: true,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["discountType"], "PERCENTAGE");
        assert_eq!(json["code"], "HE2024");
        assert!(json.get("description").is_none());
        assert!(json["startDate"].as_str().unwrap().starts_with("2024-06-01"));
    }

    #[test]
    fn test_upload_debug_hides_bytes() {
        let upload = ImageUpload {
            file_name: "ao.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF],
        };
        let debug = format!("{upload:?}");
        assert!(debug.contains("len: 3"));
        assert!(!debug.contains("255"));
    }
}
