//! Authentication extractors for the back office.
//!
//! [`RequireStaff`] admits any signed-in `ADMIN` or `STAFF` account;
//! [`RequireAdmin`] admits `ADMIN` only. There is no token refresh here:
//! an expired session is cleared and the staff member signs in again.

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use crate::models::{CurrentStaff, session_keys};

/// Extractor that requires a signed-in staff member.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireStaff(staff): RequireStaff,
/// ) -> impl IntoResponse {
///     format!("Xin chào, {}!", staff.display_name())
/// }
/// ```
pub struct RequireStaff(pub CurrentStaff);

/// Extractor that requires the `ADMIN` role.
///
/// Signed-out requests go to login like [`RequireStaff`]; staff without
/// the role get 403.
pub struct RequireAdmin(pub CurrentStaff);

/// Error returned when the back office refuses a request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login, then back to `next`.
    RedirectToLogin { next: String, htmx: bool },
    /// No session layer; should never happen outside tests.
    Unauthorized,
    /// Signed in without the `ADMIN` role.
    Forbidden,
}

impl AuthRejection {
    fn for_request(parts: &Parts) -> Self {
        let next = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str())
            .to_string();
        Self::RedirectToLogin {
            next,
            htmx: parts.headers.contains_key("hx-request"),
        }
    }

    /// The login URL this rejection points at.
    #[must_use]
    pub fn login_url(next: &str) -> String {
        if next == "/" {
            "/auth/login".to_string()
        } else {
            format!("/auth/login?next={}", urlencoding::encode(next))
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next, htmx } => {
                let location = Self::login_url(&next);
                if htmx {
                    let mut response = StatusCode::OK.into_response();
                    if let Ok(value) = HeaderValue::from_str(&location) {
                        response.headers_mut().insert("HX-Redirect", value);
                    }
                    response
                } else {
                    Redirect::to(&location).into_response()
                }
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "Chỉ quản trị viên mới được truy cập trang này",
            )
                .into_response(),
        }
    }
}

/// Load the staff member from the session, clearing an expired one.
async fn staff_from_parts(parts: &Parts) -> Result<CurrentStaff, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;

    let Some(staff) = current_staff(session).await else {
        return Err(AuthRejection::for_request(parts));
    };

    if staff.is_expired_at(Utc::now()) {
        tracing::info!(email = %staff.email, "Staff session expired");
        if let Err(e) = clear_current_staff(session).await {
            tracing::error!("Failed to clear expired staff session: {e}");
        }
        return Err(AuthRejection::for_request(parts));
    }

    Ok(staff)
}

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        staff_from_parts(parts).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let staff = staff_from_parts(parts).await?;
        if !staff.is_admin() {
            tracing::warn!(email = %staff.email, path = %parts.uri.path(), "Non-admin refused");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(staff))
    }
}

pub(crate) async fn current_staff(session: &Session) -> Option<CurrentStaff> {
    session
        .get::<CurrentStaff>(session_keys::CURRENT_STAFF)
        .await
        .ok()
        .flatten()
}

/// Helper to set the signed-in staff member.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_staff(
    session: &Session,
    staff: &CurrentStaff,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_STAFF, staff).await
}

/// Helper to clear the signed-in staff member (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_staff(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentStaff>(session_keys::CURRENT_STAFF)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::header::LOCATION;

    use super::*;

    #[test]
    fn test_login_url_keeps_next() {
        assert_eq!(AuthRejection::login_url("/"), "/auth/login");
        assert_eq!(
            AuthRejection::login_url("/orders?status=PENDING"),
            "/auth/login?next=%2Forders%3Fstatus%3DPENDING"
        );
    }

    #[test]
    fn test_rejection_responses() {
        let html = AuthRejection::RedirectToLogin {
            next: "/products".to_string(),
            htmx: false,
        }
        .into_response();
        assert_eq!(html.status(), StatusCode::SEE_OTHER);
        assert_eq!(html.headers()[LOCATION], "/auth/login?next=%2Fproducts");

        let htmx = AuthRejection::RedirectToLogin {
            next: "/products".to_string(),
            htmx: true,
        }
        .into_response();
        assert_eq!(htmx.status(), StatusCode::OK);
        assert_eq!(htmx.headers()["HX-Redirect"], "/auth/login?next=%2Fproducts");

        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
