//! Staff login and logout.
//!
//! Staff sign in with their backend accounts. The back office keeps the
//! access token in the session and refuses accounts without a back-office
//! role, even when the backend accepted the password.

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

use sgshop_core::{Email, FieldErrors, Flash};

use crate::api::ApiError;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{PageContext, clear_current_staff, set_current_staff, set_flash};
use crate::middleware::auth::current_staff;
use crate::models::{CurrentStaff, StaffLoginError};
use crate::state::AppState;

use super::safe_next;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub email: String,
    pub next: String,
    pub errors: FieldErrors,
}

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

/// Display login page.
#[instrument(skip(session, ctx))]
pub async fn login_page(
    session: Session,
    mut ctx: PageContext,
    Query(query): Query<LoginQuery>,
) -> Result<impl IntoResponse, AppError> {
    if query.expired.is_some() {
        clear_current_staff(&session).await?;
        clear_sentry_user();
        ctx.staff_name = None;
        ctx.is_admin = false;
        ctx.show(Flash::info("Phiên làm việc đã hết hạn, vui lòng đăng nhập lại"));
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

    let mut staff = match CurrentStaff::from_tokens(tokens) {
        Ok(staff) => staff,
        Err(StaffLoginError::NoAccess) => {
            tracing::warn!(email = %email, "Login refused: no back-office role");
            ctx.show(Flash::error("Tài khoản không có quyền truy cập trang quản trị"));
            return Ok((
                StatusCode::FORBIDDEN,
                LoginTemplate {
                    ctx,
                    email: form.email,
                    next,
                    errors: FieldErrors::new(),
                },
            )
                .into_response());
        }
        Err(StaffLoginError::Claims(e)) => {
            tracing::error!("Backend issued an unreadable token: {e}");
            return Err(AppError::Internal("unreadable access token".to_string()));
        }
    };

    match state.api().me(staff.token()).await {
        Ok(user) => {
            staff.user_id = Some(user.id);
            staff.full_name = Some(user.full_name);
        }
        Err(e) => tracing::debug!("Profile lookup after login failed: {e}"),
    }

    // New session ID on privilege change
    session.cycle_id().await?;
    set_current_staff(&session, &staff).await?;
    set_sentry_user(staff.user_id.as_ref(), &staff.email);
    tracing::info!(email = %staff.email, admin = staff.is_admin(), "Staff logged in");

    set_flash(&session, Flash::success(format!("Xin chào, {}!", staff.display_name()))).await;
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

/// Handle logout. The local session is cleared even if the backend call fails.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect, AppError> {
    if let Some(staff) = current_staff(&session).await {
        if let Err(e) = state.api().logout(staff.token()).await {
            tracing::debug!("Backend logout failed: {e}");
        }
        tracing::info!(email = %staff.email, "Staff logged out");
    }

    clear_current_staff(&session).await?;
    clear_sentry_user();
    set_flash(&session, Flash::info("Bạn đã đăng xuất")).await;

    Ok(Redirect::to("/auth/login"))
}

/// Flash text for a failed login: the backend's message when it sent one.
fn login_error_message(error: &ApiError) -> String {
    match error {
        ApiError::Unauthorized | ApiError::Api { status: 400 | 401, .. } => {
            error.user_message("Email hoặc mật khẩu không đúng")
        }
        other => {
            tracing::warn!("Staff login failed: {other}");
            other.user_message("Đăng nhập không thành công, vui lòng thử lại")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_prefers_backend_message() {
        let disabled = ApiError::Api {
            status: 401,
            message: Some("Tài khoản đã bị vô hiệu hóa".to_string()),
        };
        assert_eq!(login_error_message(&disabled), "Tài khoản đã bị vô hiệu hóa");
        assert_eq!(login_error_message(&ApiError::Unauthorized), "Email hoặc mật khẩu không đúng");
        assert!(login_error_message(&ApiError::Forbidden).contains("không có quyền"));
    }
}
