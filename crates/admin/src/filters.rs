//! Custom Askama template filters and display helpers.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use chrono::NaiveDateTime;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Local::now().year())
}

/// Thumbnail source for a backend image reference.
///
/// Usage in templates: `{{ url|thumb }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn thumb(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(image_url(&value.to_string()))
}

/// Backend images are absolute URLs or site paths; anything else is a
/// missing image.
#[must_use]
pub fn image_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") || raw.starts_with('/') {
        raw.to_string()
    } else {
        "/static/img/no-image.svg".to_string()
    }
}

/// `15/05/2024 10:30`, or `-`.
#[must_use]
pub fn format_datetime(value: Option<NaiveDateTime>) -> String {
    value.map_or_else(|| "-".to_string(), |dt| dt.format("%d/%m/%Y %H:%M").to_string())
}

/// Value for an `<input type="datetime-local">`.
#[must_use]
pub fn datetime_input(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M").to_string()
}
