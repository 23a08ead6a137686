//! Session middleware configuration and session-stored values.
//!
//! Sessions live in memory: they only carry the customer's tokens, the
//! cart, the theme preference and a pending flash notice.

use sgshop_core::Flash;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::models::{Cart, Theme, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "sg_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    let store = MemoryStore::default();

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

// =============================================================================
// Flash
// =============================================================================

/// Store a notice for the next rendered page.
pub async fn set_flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(session_keys::FLASH, flash).await {
        tracing::error!("Failed to store flash: {e}");
    }
}

/// Take the pending notice, if any.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}

// =============================================================================
// Cart
// =============================================================================

/// The session cart, empty when none was stored.
pub async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Persist the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

// =============================================================================
// Theme
// =============================================================================

pub async fn load_theme(session: &Session) -> Theme {
    session
        .get::<Theme>(session_keys::THEME)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_theme(session: &Session, theme: Theme) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::THEME, theme).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_flash_is_one_shot() {
        let session = session();
        set_flash(&session, Flash::success("Đã thêm vào giỏ hàng")).await;
        assert_eq!(
            take_flash(&session).await.unwrap().message,
            "Đã thêm vào giỏ hàng"
        );
        assert!(take_flash(&session).await.is_none());
    }

    #[tokio::test]
    async fn test_cart_and_theme_defaults() {
        let session = session();
        assert!(load_cart(&session).await.is_empty());
        assert_eq!(load_theme(&session).await, Theme::Light);

        save_theme(&session, Theme::Dark).await.unwrap();
        assert_eq!(load_theme(&session).await, Theme::Dark);
    }
}
