//! Per-page layout data.
//!
//! Every full page shows the customer's name, the cart badge, the theme and
//! any pending flash. [`PageContext`] gathers them from the session in one
//! extractor so handlers do not repeat the lookups.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use sgshop_core::Flash;
use tower_sessions::Session;

use crate::models::{CurrentCustomer, Theme, session_keys};

use super::session::{load_cart, load_theme, take_flash};

/// Layout data for the base template.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Display name when logged in.
    pub customer_name: Option<String>,
    pub cart_count: u32,
    /// Consumed when the context is extracted.
    pub flash: Option<Flash>,
    pub theme: Theme,
    pub current_path: String,
}

impl PageContext {
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.customer_name.is_some()
    }

    /// Show a notice on this render instead of the next one.
    pub fn show(&mut self, flash: Flash) {
        self.flash = Some(flash);
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

        let customer_name = session
            .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
            .await
            .ok()
            .flatten()
            .filter(|c| !c.is_expired_at(Utc::now()) || c.refresh_token().is_some())
            .map(|c| c.display_name().to_string());

        Ok(Self {
            customer_name,
            cart_count: load_cart(session).await.item_count(),
            flash: take_flash(session).await,
            theme: load_theme(session).await,
            current_path,
        })
    }
}
