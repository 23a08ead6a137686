//! Storefront business logic that sits between handlers and the API client.

pub mod checkout;
pub mod vnpay;
