//! Per-page layout data.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use sgshop_core::Flash;
use tower_sessions::Session;

use super::auth::current_staff;
use super::session::take_flash;

/// Layout data for the base template: who is signed in, which menu
/// entries to show, and any pending flash.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub staff_name: Option<String>,
    /// Shows the admin-only menu entries.
    pub is_admin: bool,
    /// Consumed when the context is extracted.
    pub flash: Option<Flash>,
    pub current_path: String,
}

impl PageContext {
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.staff_name.is_some()
    }

    /// Show a notice on this render instead of the next one.
    pub fn show(&mut self, flash: Flash) {
        self.flash = Some(flash);
    }

    /// Whether a menu entry for `prefix` is the active one.
    #[must_use]
    pub fn is_active(&self, prefix: &str) -> bool {
        if prefix == "/" {
            self.current_path == "/"
        } else {
            self.current_path.starts_with(prefix)
        }
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let current_path = parts.uri.path().to_string();
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self {
                current_path,
                ..Self::default()
            });
        };

        let staff = current_staff(session)
            .await
            .filter(|s| !s.is_expired_at(Utc::now()));

        Ok(Self {
            staff_name: staff.as_ref().map(|s| s.display_name().to_string()),
            is_admin: staff.as_ref().is_some_and(crate::models::CurrentStaff::is_admin),
            flash: take_flash(session).await,
            current_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_active() {
        let ctx = PageContext {
            current_path: "/products/5/edit".to_string(),
            ..PageContext::default()
        };
        assert!(ctx.is_active("/products"));
        assert!(!ctx.is_active("/"));
        assert!(!ctx.is_signed_in());
    }
}
