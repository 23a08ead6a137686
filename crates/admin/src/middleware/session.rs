//! Session middleware configuration for the back office.
//!
//! In-memory sessions with stricter settings than the storefront
//! (SameSite=Strict, 8 hour inactivity expiry). They hold the staff
//! member's token and a pending flash notice, nothing else.

use sgshop_core::Flash;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::AdminConfig;
use crate::models::session_keys;

/// Session cookie name for the back office.
pub const SESSION_COOKIE_NAME: &str = "sg_admin_session";

/// Session expiry time in seconds (8 hours, one shift).
const SESSION_EXPIRY_SECONDS: i64 = 8 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &AdminConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        // SameSite=Strict for admin (stricter than storefront's Lax)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}

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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_flash_is_one_shot() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        set_flash(&session, Flash::error("Không thể xoá danh mục")).await;

        let flash = take_flash(&session).await.unwrap();
        assert!(flash.is_error());
        assert!(take_flash(&session).await.is_none());
    }
}
