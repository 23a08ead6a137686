//! Authentication route handlers.
//!
//! The backend issues JWT access and refresh tokens; the storefront keeps
//! them in the server-side session and never shows them to the browser.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use sgshop_core::records::RegisterRequest;
use sgshop_core::{Email, FieldErrors, Flash, PhoneNumber};

use crate::api::ApiError;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, PageContext, clear_current_customer, set_current_customer, set_flash};
use crate::models::CurrentCustomer;
use crate::state::AppState;

use super::safe_next;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub email: String,
    pub next: String,
    pub errors: FieldErrors,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub errors: FieldErrors,
}

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
    pub expired: Option<String>,
}

/// Login form input. `Debug` leaves the password out.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

/// Registration form input. `Debug` leaves the passwords out.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

impl std::fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterForm")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

/// Registration input after local checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub full_name: String,
    pub email: Email,
    pub phone: PhoneNumber,
}

impl RegisterForm {
    /// Check the form before it is sent to the backend.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self) -> Result<ValidRegistration, FieldErrors> {
        let mut errors = FieldErrors::new();

        let full_name = errors.require_text("full_name", &self.full_name, "Vui lòng nhập họ tên");
        let email = Email::parse(&self.email)
            .map_err(|_| errors.add("email", "Email không hợp lệ"))
            .ok();
        let phone = PhoneNumber::parse(&self.phone)
            .map_err(|_| errors.add("phone", "Số điện thoại không hợp lệ"))
            .ok();

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password", format!("Mật khẩu phải có ít nhất {MIN_PASSWORD_LEN} ký tự"));
        }
        if self.password != self.confirm_password {
            errors.add("confirm_password", "Mật khẩu xác nhận không khớp");
        }

        match (full_name, email, phone) {
            (Some(full_name), Some(email), Some(phone)) if errors.is_empty() => Ok(ValidRegistration {
                full_name,
                email,
                phone,
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display login page.
///
/// `?expired=1` comes from a backend 401: the stale customer is dropped
/// before the form is shown.
#[instrument(skip(session, ctx))]
pub async fn login_page(
    session: Session,
    mut ctx: PageContext,
    Query(query): Query<LoginQuery>,
) -> Result<impl IntoResponse, AppError> {
    if query.expired.is_some() {
        clear_current_customer(&session).await?;
        clear_sentry_user();
        ctx.customer_name = None;
        ctx.show(Flash::info("Phiên đăng nhập đã hết hạn, vui lòng đăng nhập lại"));
    }

    Ok(LoginTemplate {
        ctx,
        email: String::new(),
        next: safe_next(query.next.as_deref()),
        errors: FieldErrors::new(),
    })
}

/// Handle login form submission.
#[instrument(skip(state, session, ctx, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    mut ctx: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let next = safe_next(form.next.as_deref());

    let mut errors = FieldErrors::new();
    let email = Email::parse(&form.email)
        .map_err(|_| errors.add("email", "Email không hợp lệ"))
        .ok();
    if form.password.is_empty() {
        errors.add("password", "Vui lòng nhập mật khẩu");
    }
    let Some(email) = email.filter(|_| errors.is_empty()) else {
        return Ok(login_failed(ctx, form.email, next, errors));
    };

    let tokens = match state.api().login(email.as_str(), &form.password).await {
        Ok(tokens) => tokens,
        Err(e) => {
            ctx.show(Flash::error(login_error_message(&e)));
            return Ok(login_failed(ctx, form.email, next, FieldErrors::new()));
        }
    };

    let mut customer = match CurrentCustomer::from_tokens(tokens) {
        Ok(customer) => customer,
        Err(e) => {
            tracing::error!("Backend issued an unreadable token: {e}");
            return Err(AppError::Internal("unreadable access token".to_string()));
        }
    };

    // Profile name is cosmetic; the token already identifies the customer
    match state.api().me(customer.token()).await {
        Ok(user) => {
            customer.user_id = Some(user.id);
            customer.full_name = Some(user.full_name);
        }
        Err(e) => tracing::debug!("Profile lookup after login failed: {e}"),
    }

    // New session ID on privilege change
    session.cycle_id().await?;
    set_current_customer(&session, &customer).await?;
    set_sentry_user(customer.user_id.as_ref(), &customer.email);
    tracing::info!(email = %customer.email, "Customer logged in");

    set_flash(&session, Flash::success(format!("Xin chào, {}!", customer.display_name()))).await;
    Ok(Redirect::to(&next).into_response())
}

fn login_failed(ctx: PageContext, email: String, next: String, errors: FieldErrors) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        LoginTemplate {
            ctx,
            email,
            next,
            errors,
        },
    )
        .into_response()
}

/// Display registration page.
#[instrument(skip(ctx))]
pub async fn register_page(ctx: PageContext) -> impl IntoResponse {
    RegisterTemplate {
        ctx,
        full_name: String::new(),
        email: String::new(),
        phone: String::new(),
        errors: FieldErrors::new(),
    }
}

/// Handle registration form submission.
#[instrument(skip(state, session, ctx, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    mut ctx: PageContext,
    Form(form): Form<RegisterForm>,
) -> Response {
    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(errors) => return register_failed(ctx, form, errors),
    };

    let request = RegisterRequest {
        full_name: &valid.full_name,
        email: valid.email.as_str(),
        phone: valid.phone.as_str(),
        password: &form.password,
    };

    if let Err(e) = state.api().register(&request).await {
        tracing::info!("Registration rejected: {e}");
        let mut errors = FieldErrors::new();
        match &e {
            ApiError::Api { status: 409, .. } => errors.add("email", e.user_message("Email đã được sử dụng")),
            other => ctx.show(Flash::error(other.user_message("Đăng ký không thành công, vui lòng thử lại"))),
        }
        return register_failed(ctx, form, errors);
    }

    tracing::info!(email = %valid.email, "Customer registered");
    set_flash(&session, Flash::success("Đăng ký thành công! Vui lòng đăng nhập.")).await;
    Redirect::to("/auth/login").into_response()
}

fn register_failed(ctx: PageContext, form: RegisterForm, errors: FieldErrors) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        RegisterTemplate {
            ctx,
            full_name: form.full_name,
            email: form.email,
            phone: form.phone,
            errors,
        },
    )
        .into_response()
}

/// Handle logout.
///
/// The backend is told to revoke the token, but the local session is
/// cleared regardless of whether that succeeds.
#[instrument(skip(state, session, customer))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
) -> Result<Redirect, AppError> {
    if let Some(customer) = customer {
        if let Err(e) = state.api().logout(customer.token()).await {
            tracing::debug!("Backend logout failed: {e}");
        }
        tracing::info!(email = %customer.email, "Customer logged out");
    }

    clear_current_customer(&session).await?;
    clear_sentry_user();
    set_flash(&session, Flash::info("Bạn đã đăng xuất")).await;

    Ok(Redirect::to("/"))
}

/// Flash text for a failed login: the backend's message when it sent one.
fn login_error_message(error: &ApiError) -> String {
    match error {
        ApiError::RateLimited(_) => "Bạn thử quá nhiều lần, vui lòng đợi một lát".to_string(),
        ApiError::Unauthorized | ApiError::Api { status: 400 | 401, .. } => {
            error.user_message("Email hoặc mật khẩu không đúng")
        }
        other => {
            tracing::warn!("Login failed: {other}");
            other.user_message("Đăng nhập không thành công, vui lòng thử lại")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_prefers_backend_message() {
        let locked = ApiError::Api {
            status: 400,
            message: Some("Tài khoản đã bị khóa".to_string()),
        };
        assert_eq!(login_error_message(&locked), "Tài khoản đã bị khóa");

        let bare = ApiError::Api {
            status: 401,
            message: None,
        };
        assert_eq!(login_error_message(&bare), "Email hoặc mật khẩu không đúng");
        assert_eq!(login_error_message(&ApiError::Unauthorized), "Email hoặc mật khẩu không đúng");
    }

    fn form() -> RegisterForm {
        RegisterForm {
            full_name: "Nguyễn Văn A".to_string(),
            email: "a@example.vn".to_string(),
            phone: "0901234567".to_string(),
            password: "matkhau123".to_string(),
            confirm_password: "matkhau123".to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let valid = form().validate().unwrap();
        assert_eq!(valid.full_name, "Nguyễn Văn A");
        assert_eq!(valid.email.as_str(), "a@example.vn");
    }

    #[test]
    fn test_short_password_counts_characters() {
        let errors = RegisterForm {
            password: "mậtkhẩu".to_string(),
            confirm_password: "mậtkhẩu".to_string(),
            ..form()
        }
        .validate()
        .unwrap_err();
        assert!(errors.has("password"));
        assert!(!errors.has("confirm_password"));
    }

    #[test]
    fn test_mismatched_confirmation() {
        let errors = RegisterForm {
            confirm_password: "khac12345".to_string(),
            ..form()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.message("confirm_password"), "Mật khẩu xác nhận không khớp");
    }

    #[test]
    fn test_collects_every_error() {
        let errors = RegisterForm::default().validate().unwrap_err();
        for field in ["full_name", "email", "phone", "password"] {
            assert!(errors.has(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_form_debug_hides_password() {
        let debug = format!("{:?}", form());
        assert!(!debug.contains("matkhau123"));
    }
}
