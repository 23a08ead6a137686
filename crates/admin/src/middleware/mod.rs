//! HTTP middleware stack for the back office.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (no third-party scripts, HSTS over https)
//! 5. Session layer (in-memory store, SameSite=Strict)
//! 6. Rate limiting on the login post (governor)

pub mod auth;
pub mod context;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{RequireAdmin, RequireStaff, clear_current_staff, set_current_staff};
pub use context::PageContext;
pub use rate_limit::login_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, set_flash, take_flash};
