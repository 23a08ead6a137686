//! Sai Gon Shop Core - Shared types library.
//!
//! This crate provides common types used across all Sai Gon Shop components:
//! - `storefront` - Customer-facing shop
//! - `admin` - Back office for staff and administrators
//! - `cli` - Operator command-line tools
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients. The backend REST API owns every record lifecycle; the types here
//! mirror its wire shapes and add the small client-side rules (price
//! formatting, voucher previews, form validation, token decoding).
//!
//! # Modules
//!
//! - [`types`] - Ids, money, statuses, vouchers, contact details, pagination
//! - [`jwt`] - Access token claim decoding
//! - [`records`] - Backend records and request bodies
//! - [`revenue`] - Zero-filled revenue series
//! - [`validation`] - Form field error collection
//! - [`cache`] - Tag-invalidated response cache (feature `cache`)

#![cfg_attr(not(test), forbid(unsafe_code))]

#[cfg(feature = "cache")]
pub mod cache;
pub mod jwt;
pub mod records;
pub mod revenue;
pub mod types;
pub mod validation;

#[cfg(feature = "cache")]
pub use cache::{TaggedCache, TaggedCacheBuilder};
pub use jwt::{Claims, ClaimsError};
pub use revenue::{ReportError, RevenueReport};
pub use types::*;
pub use validation::FieldErrors;
