//! Access token inspection.
//!
//! Only the payload is decoded; the signature is the backend's business.

use chrono::{DateTime, Utc};
use sgshop_core::Claims;

use super::CliError;

/// Decode `jwt` and print its claims.
///
/// # Errors
///
/// Returns an error if the token cannot be decoded.
#[allow(clippy::print_stdout)]
pub fn inspect(jwt: &str) -> Result<(), CliError> {
    let claims = Claims::decode(jwt)?;
    for (label, value) in describe(&claims, Utc::now()) {
        println!("{label:<12} {value}");
    }
    Ok(())
}

/// Label/value rows for a decoded token.
pub fn describe(claims: &Claims, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
    let list = |items: Vec<String>| {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    };
    let timestamp = |secs: i64| {
        DateTime::from_timestamp(secs, 0).map_or_else(|| secs.to_string(), |dt| dt.to_rfc3339())
    };

    let status = if claims.is_expired_at(now, 0) {
        "expired".to_string()
    } else {
        let left = claims.exp.saturating_sub(now.timestamp());
        format!("valid for {}m {}s", left / 60, left % 60)
    };

    vec![
        ("subject", claims.sub.clone()),
        ("user id", claims.user_id.map_or_else(|| "-".to_string(), |id| id.to_string())),
        ("roles", list(claims.roles())),
        ("permissions", list(claims.permissions())),
        ("issued at", claims.iat.map_or_else(|| "-".to_string(), timestamp)),
        ("expires at", timestamp(claims.exp)),
        ("status", status),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;

    fn claims(payload: &str) -> Claims {
        let jwt = format!("eyJhbGciOiJIUzI1NiJ9.{}.c2ln", URL_SAFE_NO_PAD.encode(payload));
        Claims::decode(&jwt).unwrap()
    }

    fn value<'a>(rows: &'a [(&'static str, String)], label: &str) -> &'a str {
        rows.iter().find(|(l, _)| *l == label).map(|(_, v)| v.as_str()).unwrap()
    }

    #[test]
    fn test_describe_staff_token() {
        let claims = claims(
            r#"{"sub":"lan@saigonshop.vn","exp":1700000600,"userId":7,"scope":"ROLE_STAFF ORDER_WRITE"}"#,
        );
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let rows = describe(&claims, now);

        assert_eq!(value(&rows, "subject"), "lan@saigonshop.vn");
        assert_eq!(value(&rows, "user id"), "7");
        assert_eq!(value(&rows, "roles"), "STAFF");
        assert_eq!(value(&rows, "permissions"), "ORDER_WRITE");
        assert_eq!(value(&rows, "issued at"), "-");
        assert_eq!(value(&rows, "status"), "valid for 10m 0s");
    }

    #[test]
    fn test_describe_expired_token() {
        let claims = claims(r#"{"sub":"a@b.vn","exp":1000}"#);
        let rows = describe(&claims, DateTime::from_timestamp(2000, 0).unwrap());
        assert_eq!(value(&rows, "status"), "expired");
        assert_eq!(value(&rows, "roles"), "-");
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        assert!(matches!(inspect("not-a-jwt"), Err(CliError::Token(_))));
    }
}
