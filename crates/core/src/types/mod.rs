//! Core types for Sai Gon Shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod datetime;
pub mod flash;
pub mod id;
pub mod page;
pub mod price;
pub mod status;
pub mod voucher;

pub use contact::{Email, EmailError, PhoneError, PhoneNumber};
pub use flash::{Flash, FlashLevel};
pub use id::*;
pub use page::{Page, PageView};
pub use price::{Money, MoneyError};
pub use status::*;
pub use voucher::{DiscountKind, VoucherError, VoucherTerms, VoucherWindow, is_usable};
