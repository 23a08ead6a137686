//! HTTP route handlers for the back office.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                           - Dashboard
//!
//! # Auth
//! GET  /auth/login                 - Login page
//! POST /auth/login                 - Login action (rate limited)
//! POST /auth/logout                - Logout action
//!
//! # Catalog (staff)
//! GET  /products                   - Product list (keyword, category, page)
//! GET  /products/new               - New product form
//! POST /products                   - Create product (multipart)
//! GET  /products/{id}/edit         - Edit product form
//! POST /products/{id}              - Update product (multipart)
//! POST /products/{id}/delete       - Delete product
//! GET  /categories                 - Category list with create form
//! POST /categories                 - Create category
//! GET  /categories/{id}/edit       - Edit category form
//! POST /categories/{id}            - Update category
//! POST /categories/{id}/delete     - Delete category
//!
//! # Promotions (staff)
//! GET  /vouchers                   - Voucher list
//! GET  /vouchers/new               - New voucher form
//! POST /vouchers                   - Create voucher
//! GET  /vouchers/{id}/edit         - Edit voucher form
//! POST /vouchers/{id}              - Update voucher
//! POST /vouchers/{id}/delete       - Delete voucher
//! GET  /banners                    - Banner list with upload form
//! POST /banners                    - Create banner (multipart)
//! POST /banners/{id}/toggle        - Flip the active flag
//! POST /banners/{id}/delete        - Delete banner
//!
//! # Orders (staff)
//! GET  /orders                     - Order list (status, keyword, page)
//! GET  /orders/{id}                - Order detail
//! POST /orders/{id}/status         - Move to another status
//! POST /orders/{id}/cancel         - Cancel
//!
//! # Access control (admin only)
//! GET  /users                      - User list (keyword, page)
//! GET  /users/{id}                 - User detail with role checkboxes
//! POST /users/{id}/roles           - Replace roles
//! GET  /roles                      - Role list with create form
//! POST /roles                      - Create role
//! POST /roles/{name}/delete        - Delete role
//! GET  /permissions                - Permission list with create form
//! POST /permissions                - Create permission
//! POST /permissions/{name}/delete  - Delete permission
//!
//! # Reports (admin only)
//! GET  /revenue                    - Yearly report (year)
//! GET  /revenue/monthly            - Monthly report (year, month)
//! ```

pub mod auth;
pub mod banners;
pub mod categories;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod revenue;
pub mod roles;
pub mod upload;
pub mod users;
pub mod vouchers;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::Redirect,
    routing::{get, post},
};
use sgshop_core::{Flash, PageView};
use tower_sessions::Session;

use crate::api::ApiError;
use crate::error::AppError;
use crate::middleware::{login_rate_limiter, set_flash};
use crate::state::AppState;

/// Largest multipart body accepted (several product photos).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let post_login = Router::new().route("/login", post(auth::login));
    let post_login = match login_rate_limiter() {
        Some(limiter) => post_login.layer(limiter),
        None => {
            tracing::warn!("Login rate limiter could not be configured; continuing without it");
            post_login
        }
    };

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/logout", post(auth::logout))
        .merge(post_login)
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/new", get(products::new_product))
        .route("/{id}", post(products::update))
        .route("/{id}/edit", get(products::edit))
        .route("/{id}/delete", post(products::delete))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index).post(categories::create))
        .route("/{id}", post(categories::update))
        .route("/{id}/edit", get(categories::edit))
        .route("/{id}/delete", post(categories::delete))
}

/// Create the voucher routes router.
pub fn voucher_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(vouchers::index).post(vouchers::create))
        .route("/new", get(vouchers::new_voucher))
        .route("/{id}", post(vouchers::update))
        .route("/{id}/edit", get(vouchers::edit))
        .route("/{id}/delete", post(vouchers::delete))
}

/// Create the banner routes router.
pub fn banner_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banners::index).post(banners::create))
        .route("/{id}/toggle", post(banners::toggle))
        .route("/{id}/delete", post(banners::delete))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::update_status))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index))
        .route("/{id}", get(users::show))
        .route("/{id}/roles", post(users::assign_roles))
}

/// Create the role and permission routes router.
pub fn role_routes() -> Router<AppState> {
    Router::new()
        .route("/roles", get(roles::index).post(roles::create_role))
        .route("/roles/{name}/delete", post(roles::delete_role))
        .route("/permissions", get(roles::permissions).post(roles::create_permission))
        .route("/permissions/{name}/delete", post(roles::delete_permission))
}

/// Create all routes for the back office.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/vouchers", voucher_routes())
        .nest("/banners", banner_routes())
        .nest("/orders", order_routes())
        .nest("/users", user_routes())
        .merge(role_routes())
        .route("/revenue", get(revenue::yearly))
        .route("/revenue/monthly", get(revenue::monthly))
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Flash the outcome of a mutation and redirect to `to`.
///
/// A rejected token is the only failure that does not flash: it goes
/// back to login through [`AppError`].
///
/// # Errors
///
/// Returns `AppError::Api(ApiError::Unauthorized)` when the backend
/// rejected the staff token.
pub async fn finish(
    session: &Session,
    result: Result<(), ApiError>,
    success: &str,
    failure: &str,
    to: &str,
) -> Result<Redirect, AppError> {
    match result {
        Ok(()) => set_flash(session, Flash::success(success)).await,
        Err(ApiError::Unauthorized) => return Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => {
            tracing::warn!(error = %e, "{failure}");
            set_flash(session, Flash::error(e.user_message(failure))).await;
        }
    }
    Ok(Redirect::to(to))
}

/// Log a failed read for a page that still renders without it.
///
/// # Errors
///
/// Passes `ApiError::Unauthorized` through so the page redirects to login.
pub fn degrade<T: Default>(result: Result<T, ApiError>, what: &str) -> Result<T, AppError> {
    match result {
        Ok(value) => Ok(value),
        Err(ApiError::Unauthorized) => Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load {what}");
            Ok(T::default())
        }
    }
}

/// A redirect target that stays on this site.
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

/// Query-string value that is blank when unset.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Role and permission names: trimmed, uppercased, no whitespace inside.
///
/// # Errors
///
/// Returns a message for the form when the name is blank or has spaces.
pub fn normalize_authority_name(raw: &str) -> Result<String, &'static str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("Tên là bắt buộc");
    }
    if name.chars().any(char::is_whitespace) {
        return Err("Tên không được chứa khoảng trắng");
    }
    Ok(name.to_uppercase())
}

/// Previous/next links for a paged table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    pub current: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl Pager {
    /// Links to `path` keeping the non-empty `params`, with `page` set.
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
            total_items: view.total_items,
            prev_url: view.has_prev().then(|| link(view.prev())),
            next_url: view.has_next().then(|| link(view.next())),
        }
    }

    #[must_use]
    pub const fn is_paged(&self) -> bool {
        self.total_pages > 1
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::middleware::take_flash;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/orders?status=PENDING")), "/orders?status=PENDING");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_normalize_authority_name() {
        assert_eq!(normalize_authority_name(" order_write ").unwrap(), "ORDER_WRITE");
        assert!(normalize_authority_name("   ").is_err());
        assert_eq!(
            normalize_authority_name("kho hang").unwrap_err(),
            "Tên không được chứa khoảng trắng"
        );
    }

    #[test]
    fn test_pager_keeps_filters() {
        let pager = Pager::new(
            PageView::new(1, 4, 80),
            "/orders",
            &[("status", "PENDING"), ("keyword", "")],
        );
        assert!(pager.prev_url.is_none());
        assert_eq!(pager.next_url.as_deref(), Some("/orders?status=PENDING&page=2"));
        assert_eq!(pager.total_items, 80);
    }

    #[tokio::test]
    async fn test_finish_flashes_backend_message() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let result = Err(ApiError::Api {
            status: 409,
            message: Some("Danh mục đang có sản phẩm".to_string()),
        });
        finish(&session, result, "Đã xoá", "Không thể xoá danh mục", "/categories")
            .await
            .unwrap();
        assert_eq!(
            take_flash(&session).await.unwrap().message,
            "Danh mục đang có sản phẩm"
        );

        let expired = finish(&session, Err(ApiError::Unauthorized), "a", "b", "/").await;
        assert!(matches!(expired, Err(AppError::Api(ApiError::Unauthorized))));
    }

    #[test]
    fn test_degrade_keeps_unauthorized() {
        let empty: Vec<u8> = degrade(Err(ApiError::NotFound("x".to_string())), "things").unwrap();
        assert!(empty.is_empty());
        assert!(degrade::<Vec<u8>>(Err(ApiError::Unauthorized), "things").is_err());
    }
}
