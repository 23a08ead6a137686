//! Session models for the storefront.

pub mod cart;
pub mod session;

pub use cart::{Cart, CartError, CartLine};
pub use session::{CurrentCustomer, Theme, session_keys};
