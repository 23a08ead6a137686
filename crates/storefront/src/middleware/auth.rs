//! Authentication extractors.
//!
//! The session holds the customer's backend tokens. [`RequireAuth`] makes
//! sure they are still valid before a handler runs, refreshing an expired
//! access token once when a refresh token is available.

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use crate::models::{CurrentCustomer, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in customer.
///
/// If the customer is not logged in, or the session expired and could not
/// be refreshed, returns a redirect to the login page that comes back to
/// the current URL.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(customer): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Xin chào, {}!", customer.display_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentCustomer);

/// Error returned when authentication is required but the customer is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, then back to `next`.
    RedirectToLogin { next: String, htmx: bool },
    /// No session layer; should never happen outside tests.
    Unauthorized,
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
                    // HTMX follows redirects inside the swap target; ask for a full navigation
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
        }
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        let Some(customer) = current_customer(&session).await else {
            return Err(AuthRejection::for_request(parts));
        };

        if !customer.is_expired_at(Utc::now()) {
            return Ok(Self(customer));
        }

        if let Some(refresh_token) = customer.refresh_token() {
            match state.api().refresh(refresh_token).await {
                Ok(tokens) => match customer.refreshed(tokens) {
                    Ok(refreshed) => {
                        if let Err(e) = set_current_customer(&session, &refreshed).await {
                            tracing::error!("Failed to store refreshed customer: {e}");
                        }
                        tracing::debug!(email = %refreshed.email, "Access token refreshed");
                        return Ok(Self(refreshed));
                    }
                    Err(e) => tracing::warn!("Refreshed token could not be decoded: {e}"),
                },
                Err(e) => tracing::info!("Token refresh failed: {e}"),
            }
        }

        if let Err(e) = clear_current_customer(&session).await {
            tracing::error!("Failed to clear expired customer: {e}");
        }
        Err(AuthRejection::for_request(parts))
    }
}

/// Extractor that optionally gets the current customer.
///
/// Unlike `RequireAuth`, this never rejects and never refreshes: an
/// expired session simply reads as logged out.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     OptionalAuth(customer): OptionalAuth,
/// ) -> impl IntoResponse {
///     match customer {
///         Some(c) => format!("Xin chào, {}!", c.display_name()),
///         None => "Xin chào!".to_string(),
///     }
/// }
/// ```
pub struct OptionalAuth(pub Option<CurrentCustomer>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer = match parts.extensions.get::<Session>() {
            Some(session) => current_customer(session)
                .await
                .filter(|c| !c.is_expired_at(Utc::now())),
            None => None,
        };

        Ok(Self(customer))
    }
}

async fn current_customer(session: &Session) -> Option<CurrentCustomer> {
    session
        .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await
        .ok()
        .flatten()
}

/// Helper to set the current customer in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await
}

/// Helper to clear the current customer from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_customer(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::header::LOCATION;

    use super::*;

    #[test]
    fn test_login_url_keeps_next() {
        assert_eq!(AuthRejection::login_url("/"), "/auth/login");
        assert_eq!(
            AuthRejection::login_url("/account/orders?page=2"),
            "/auth/login?next=%2Faccount%2Forders%3Fpage%3D2"
        );
    }

    #[test]
    fn test_rejection_responses() {
        let html = AuthRejection::RedirectToLogin {
            next: "/checkout".to_string(),
            htmx: false,
        }
        .into_response();
        assert_eq!(html.status(), StatusCode::SEE_OTHER);
        assert_eq!(html.headers()[LOCATION], "/auth/login?next=%2Fcheckout");

        let htmx = AuthRejection::RedirectToLogin {
            next: "/checkout".to_string(),
            htmx: true,
        }
        .into_response();
        assert_eq!(htmx.status(), StatusCode::OK);
        assert_eq!(htmx.headers()["HX-Redirect"], "/auth/login?next=%2Fcheckout");

        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
