//! Backend REST API client for the storefront.
//!
//! # Architecture
//!
//! - The backend owns products, orders, vouchers and accounts; the
//!   storefront never keeps its own copy beyond the session.
//! - Every response is wrapped in `{code, message, data}`; the client
//!   unwraps `data` before returning.
//! - Catalog and address reads are cached with a [`TaggedCache`]. Placing
//!   or cancelling an order drops the `Products` and `Vouchers` tags.
//!
//! [`TaggedCache`]: sgshop_core::TaggedCache

mod client;

pub use client::{ProductQuery, ProductSort, StoreApiClient};

use std::sync::Arc;

use serde::Deserialize;
use sgshop_core::Page;
use sgshop_core::records::{Banner, Category, Product, Region, Voucher};
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
    /// The message to show the user: the backend's own message when it sent
    /// one, otherwise `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.trim().to_owned(),
            Self::RateLimited(secs) => format!("Bạn thao tác quá nhanh, vui lòng thử lại sau {secs} giây"),
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
            Self::RateLimited(secs) => Self::RateLimited(*secs),
            other => Self::Shared(other.to_string()),
        })
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Success envelope. Only `data` is kept.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// Error body; both fields are optional and the body may not be JSON at all.
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

/// Cache tags for storefront reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTag {
    Products,
    Categories,
    Banners,
    Vouchers,
    Address,
}

/// Values stored in the response cache.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<Page<Product>>),
    Product(Arc<Product>),
    Categories(Arc<Vec<Category>>),
    Banners(Arc<Vec<Banner>>),
    Vouchers(Arc<Vec<Voucher>>),
    Regions(Arc<Vec<Region>>),
}

/// Responses the payment endpoint has been seen to return.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PaymentUrl {
    Plain(String),
    Object {
        #[serde(rename = "paymentUrl", alias = "url")]
        payment_url: String,
    },
}

impl PaymentUrl {
    pub(crate) fn into_string(self) -> String {
        match self {
            Self::Plain(url) | Self::Object { payment_url: url } => url,
        }
    }
}
