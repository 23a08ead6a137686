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

/// Prefixes a relative image path with `/static/`; absolute URLs pass
/// through unchanged.
///
/// Usage in templates: `{{ product.image|image_src }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn image_src(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(image_url(&value.to_string()))
}

/// Resolve an image reference for `<img src>`.
#[must_use]
pub fn image_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        "/static/img/placeholder.svg".to_string()
    } else if raw.starts_with("http://") || raw.starts_with("https://") || raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/static/{raw}")
    }
}

/// `15/05/2024 10:30`, or an empty string.
#[must_use]
pub fn format_datetime(value: Option<NaiveDateTime>) -> String {
    value
        .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_default()
}

/// `15/05/2024`.
#[must_use]
pub fn format_date(value: NaiveDateTime) -> String {
    value.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_image_url() {
        assert_eq!(image_url(""), "/static/img/placeholder.svg");
        assert_eq!(image_url("https://cdn.shop.vn/a.jpg"), "https://cdn.shop.vn/a.jpg");
        assert_eq!(image_url("/uploads/a.jpg"), "/uploads/a.jpg");
        assert_eq!(image_url("img/a.jpg"), "/static/img/a.jpg");
    }

    #[test]
    fn test_format_datetime() {
        let dt = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 5, 0)
            .unwrap();
        assert_eq!(format_datetime(Some(dt)), "01/05/2024 08:05");
        assert_eq!(format_datetime(None), "");
        assert_eq!(format_date(dt), "01/05/2024");
    }
}
