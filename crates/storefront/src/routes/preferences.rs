//! Display preferences.

use axum::{extract::State, http::HeaderMap, response::Redirect};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::{load_theme, save_theme};
use crate::state::AppState;

use super::referer_path;

/// Flip between light and dark, then go back to the page the toggle was on.
#[instrument(skip(state, session, headers))]
pub async fn toggle_theme(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    let theme = load_theme(&session).await.toggled();
    save_theme(&session, theme).await?;
    tracing::debug!(theme = theme.as_str(), "Theme changed");
    Ok(Redirect::to(&referer_path(&headers, &state.config().base_url)))
}
