//! Backend REST API client for the back office.
//!
//! # Architecture
//!
//! - Every call carries the signed-in staff member's bearer token; the
//!   backend decides what each role may do.
//! - Catalog, voucher, role, permission and banner lists are cached for a
//!   minute under a [`CacheTag`]. Keys never include the token, so staff
//!   share entries.
//! - Every mutation drops the tags it touches. Orders, users and revenue
//!   are always read fresh.

mod client;
mod requests;

pub use client::{AdminApiClient, OrderFilter, ProductFilter, UserFilter};
pub use requests::{
    BannerPayload, CategoryPayload, ImageUpload, PermissionPayload, ProductPayload, RolePayload,
    VoucherPayload,
};

use std::sync::Arc;

use serde::Deserialize;
use sgshop_core::Page;
use sgshop_core::records::{Banner, Category, Permission, Product, Role, Voucher};
use thiserror::Error;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Backend answered with an error status.
    #[error("API error {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Api {
        status: u16,
        message: Option<String>,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The access token was missing, expired or rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// The token is valid but its role may not do this.
    #[error("Forbidden")]
    Forbidden,

    /// Backend asked us to slow down.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A cached load failed; carries the original error text.
    #[error("{0}")]
    Shared(String),

    /// Could not build a request URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// The backend's own message when it sent one, otherwise `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.trim().to_owned(),
            Self::Forbidden => "Bạn không có quyền thực hiện thao tác này".to_owned(),
            Self::RateLimited(secs) => format!("Thao tác quá nhanh, vui lòng thử lại sau {secs} giây"),
            _ => fallback.to_owned(),
        }
    }

    /// Unwrap an error shared by concurrent cache loaders.
    #[must_use]
    pub fn from_shared(err: Arc<Self>) -> Self {
        Arc::try_unwrap(err).unwrap_or_else(|shared| match &*shared {
            Self::Api { status, message } => Self::Api {
                status: *status,
                message: message.clone(),
            },
            Self::NotFound(what) => Self::NotFound(what.clone()),
            Self::Unauthorized => Self::Unauthorized,
            Self::Forbidden => Self::Forbidden,
            Self::RateLimited(secs) => Self::RateLimited(*secs),
            other => Self::Shared(other.to_string()),
        })
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Success envelope. Only `data` is kept.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// Error body; the body may not be JSON at all.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn parse(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_default()
    }
}

/// Cache tags, one per back-office area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTag {
    Products,
    Categories,
    Vouchers,
    Orders,
    Users,
    Roles,
    Permissions,
    Banners,
    Revenue,
}

impl CacheTag {
    /// Tags a mutation in this area makes stale.
    ///
    /// Order changes move revenue figures and product stock too.
    #[must_use]
    pub const fn affected(self) -> &'static [Self] {
        match self {
            Self::Products => &[Self::Products],
            Self::Categories => &[Self::Categories, Self::Products],
            Self::Vouchers => &[Self::Vouchers],
            Self::Orders => &[Self::Orders, Self::Revenue, Self::Products],
            Self::Users => &[Self::Users],
            Self::Roles => &[Self::Roles, Self::Users],
            Self::Permissions => &[Self::Permissions, Self::Roles],
            Self::Banners => &[Self::Banners],
            Self::Revenue => &[Self::Revenue],
        }
    }
}

/// Values stored in the response cache.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<Page<Product>>),
    Product(Arc<Product>),
    Categories(Arc<Vec<Category>>),
    Vouchers(Arc<Vec<Voucher>>),
    Roles(Arc<Vec<Role>>),
    Permissions(Arc<Vec<Permission>>),
    Banners(Arc<Vec<Banner>>),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let err = ApiError::Api {
            status: 409,
            message: Some("Mã voucher đã tồn tại".to_string()),
        };
        assert_eq!(err.user_message("Không thể lưu voucher"), "Mã voucher đã tồn tại");
        assert_eq!(
            ApiError::Api {
                status: 500,
                message: None
            }
            .user_message("Không thể lưu voucher"),
            "Không thể lưu voucher"
        );
        assert!(ApiError::Forbidden.user_message("x").contains("không có quyền"));
    }

    #[test]
    fn test_order_mutations_also_touch_revenue() {
        assert!(CacheTag::Orders.affected().contains(&CacheTag::Revenue));
        // Canceling restocks, so cached product lists must go.
        assert!(CacheTag::Orders.affected().contains(&CacheTag::Products));
        assert!(!CacheTag::Banners.affected().contains(&CacheTag::Revenue));
        assert!(CacheTag::Permissions.affected().contains(&CacheTag::Roles));
    }

    #[test]
    fn test_error_body_tolerates_garbage() {
        assert_eq!(
            ErrorBody::parse(r#"{"message":"Tên danh mục đã tồn tại"}"#).message.as_deref(),
            Some("Tên danh mục đã tồn tại")
        );
        assert!(ErrorBody::parse("Bad Gateway").message.is_none());
    }
}
