//! Session models for the back office.

pub mod session;

pub use session::{CurrentStaff, StaffLoginError, session_keys};
