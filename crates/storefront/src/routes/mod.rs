//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//!
//! # Catalog
//! GET  /products                  - Product listing (keyword, category, sort, page)
//! GET  /products/{id}             - Product detail
//!
//! # Cart (HTMX fragments when HX-Request is set)
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add to cart (returns count badge, triggers cart-updated)
//! POST /cart/update               - Update quantity (returns cart_items fragment)
//! POST /cart/remove               - Remove item (returns cart_items fragment)
//! GET  /cart/count                - Cart count badge (fragment)
//!
//! # Checkout and payment (requires auth)
//! GET  /checkout                  - Checkout form
//! POST /checkout                  - Place order
//! GET  /address/districts         - District <option> list for a province
//! GET  /address/wards             - Ward <option> list for a district
//! GET  /payment/vnpay-return      - VNPay return page
//! POST /orders/{id}/pay           - Retry VNPay payment
//!
//! # Auth
//! GET  /auth/login                - Login page
//! POST /auth/login                - Login action (rate limited)
//! GET  /auth/register             - Register page
//! POST /auth/register             - Register action (rate limited)
//! POST /auth/logout               - Logout action
//!
//! # Account (requires auth)
//! GET  /account                   - Profile
//! GET  /account/orders            - Order history
//! GET  /orders/{id}               - Order detail
//! POST /orders/{id}/cancel        - Cancel a pending order
//!
//! # Preferences
//! POST /preferences/theme         - Toggle light/dark
//! ```

pub mod account;
pub mod address;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod payment;
pub mod preferences;
pub mod products;

use axum::{
    Router,
    http::{HeaderMap, header::REFERER},
    routing::{get, post},
};
use sgshop_core::PageView;

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// Form posts are rate limited per client IP; the pages are not.
pub fn auth_routes() -> Router<AppState> {
    let pages = Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout));

    let posts = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register));

    let posts = match auth_rate_limiter() {
        Some(limiter) => posts.layer(limiter),
        None => {
            tracing::warn!("Auth rate limiter could not be configured; continuing without it");
            posts
        }
    };

    pages.merge(posts)
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/orders", get(account::orders))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(account::order_show))
        .route("/{id}/cancel", post(account::cancel_order))
        .route("/{id}/pay", post(payment::pay_order))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place_order))
        .route("/address/districts", get(address::districts))
        .route("/address/wards", get(address::wards))
        .route("/payment/vnpay-return", get(payment::vnpay_return))
        .nest("/orders", order_routes())
        .nest("/account", account_routes())
        .nest("/auth", auth_routes())
        .route("/preferences/theme", post(preferences::toggle_theme))
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Whether the request came from HTMX.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// A redirect target that stays on this site.
///
/// Only absolute paths are accepted; scheme-relative (`//host`) and
/// backslash tricks fall back to `/`.
#[must_use]
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Path and query of a same-site `Referer`, or `/`.
#[must_use]
pub fn referer_path(headers: &HeaderMap, base_url: &str) -> String {
    let Some(referer) = headers.get(REFERER).and_then(|v| v.to_str().ok()) else {
        return "/".to_string();
    };
    let (Ok(referer), Ok(base)) = (url::Url::parse(referer), url::Url::parse(base_url)) else {
        return "/".to_string();
    };
    if referer.origin() != base.origin() {
        return "/".to_string();
    }
    let path = match referer.query() {
        Some(query) => format!("{}?{query}", referer.path()),
        None => referer.path().to_string(),
    };
    safe_next(Some(&path))
}

/// Query-string value that is blank when unset.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Previous/next links for a paged listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    pub current: u32,
    pub total_pages: u32,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl Pager {
    /// Links to `path` keeping `params`, with `page` set.
    #[must_use]
    pub fn new(view: PageView, path: &str, params: &[(&str, &str)]) -> Self {
        let link = |page: u32| {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            for (k, v) in params.iter().filter(|(_, v)| !v.is_empty()) {
                query.append_pair(k, v);
            }
            query.append_pair("page", &page.to_string());
            format!("{path}?{}", query.finish())
        };
        Self {
            current: view.current,
            total_pages: view.total_pages,
            prev_url: view.has_prev().then(|| link(view.prev())),
            next_url: view.has_next().then(|| link(view.next())),
        }
    }

    #[must_use]
    pub const fn is_paged(&self) -> bool {
        self.total_pages > 1
    }
}
