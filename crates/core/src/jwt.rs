//! Access token claim decoding.
//!
//! The backend signs and verifies its own tokens. The web apps only need
//! to read the payload to know who is logged in, which roles they carry
//! and when the token runs out, so the signature is never checked here.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix Spring Security puts on role authorities.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Errors that can occur when decoding a token payload.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token must have three dot-separated segments, found {0}")]
    Segments(usize),
    #[error("token payload is not valid base64url")]
    Base64,
    #[error("token payload is not valid JSON: {0}")]
    Json(String),
}

/// One entry of the `roles` claim.
///
/// Some backends emit plain strings, others Spring `GrantedAuthority`
/// objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum Authority {
    Name(String),
    Object {
        #[serde(alias = "name")]
        authority: String,
    },
}

impl Authority {
    fn as_str(&self) -> &str {
        match self {
            Self::Name(name) | Self::Object { authority: name } => name,
        }
    }
}

/// The claims the web apps read from an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject, the account email.
    pub sub: String,
    /// Expiry as seconds since the Unix epoch.
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Space-separated authorities.
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    roles: Option<Vec<Authority>>,
}

impl Claims {
    /// Decode the payload segment of a JWT.
    ///
    /// # Errors
    ///
    /// Returns an error if the token does not have three segments or the
    /// payload is not base64url-encoded JSON with at least `sub` and `exp`.
    pub fn decode(token: &str) -> Result<Self, ClaimsError> {
        let segments: Vec<&str> = token.trim().split('.').collect();
        let [_, payload, _] = segments.as_slice() else {
            return Err(ClaimsError::Segments(segments.len()));
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| ClaimsError::Base64)?;

        serde_json::from_slice(&bytes).map_err(|e| ClaimsError::Json(e.to_string()))
    }

    /// Every authority from `scope` and `roles`, de-duplicated in order.
    #[must_use]
    pub fn authorities(&self) -> Vec<String> {
        let from_scope = self
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace();
        let from_roles = self
            .roles
            .iter()
            .flatten()
            .map(Authority::as_str);

        let mut out: Vec<String> = Vec::new();
        for authority in from_scope.chain(from_roles) {
            if !authority.is_empty() && !out.iter().any(|a| a == authority) {
                out.push(authority.to_owned());
            }
        }
        out
    }

    /// Role names without the `ROLE_` prefix, e.g. `ADMIN`.
    ///
    /// Scope entries count as roles only when prefixed; every entry of the
    /// `roles` claim is a role.
    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        let from_scope = self
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .filter_map(|a| a.strip_prefix(ROLE_PREFIX));
        let from_roles = self
            .roles
            .iter()
            .flatten()
            .map(|a| a.as_str().strip_prefix(ROLE_PREFIX).unwrap_or(a.as_str()));

        let mut out: Vec<String> = Vec::new();
        for role in from_scope.chain(from_roles) {
            if !role.is_empty() && !out.iter().any(|r| r == role) {
                out.push(role.to_owned());
            }
        }
        out
    }

    /// Case-insensitive role check; accepts `ADMIN` or `ROLE_ADMIN`.
    #[must_use]
    pub fn has_role(&self, name: &str) -> bool {
        let wanted = name.strip_prefix(ROLE_PREFIX).unwrap_or(name);
        self.roles().iter().any(|r| r.eq_ignore_ascii_case(wanted))
    }

    /// True if the token carries any of the given roles.
    #[must_use]
    pub fn has_any_role(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.has_role(n))
    }

    /// Scope authorities that are not roles, e.g. `PRODUCT_WRITE`.
    #[must_use]
    pub fn permissions(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .filter(|a| !a.starts_with(ROLE_PREFIX))
            .map(str::to_owned)
            .collect()
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Whether the token is expired at `now`, treating it as expired
    /// `leeway_secs` early.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway_secs: i64) -> bool {
        now.timestamp().saturating_add(leeway_secs) >= self.exp
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE;

    fn token(payload: &str) -> String {
        format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl",
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_decode_scope_claims() {
        let t = token(
            r#"{"sub":"lan@shop.vn","exp":1700000000,"iat":1699990000,"userId":7,"scope":"ROLE_ADMIN PRODUCT_WRITE"}"#,
        );
        let claims = Claims::decode(&t).unwrap();
        assert_eq!(claims.sub, "lan@shop.vn");
        assert_eq!(claims.user_id, Some(7));
        assert_eq!(claims.roles(), vec!["ADMIN"]);
        assert_eq!(claims.permissions(), vec!["PRODUCT_WRITE"]);
        assert!(claims.has_role("admin"));
        assert!(claims.has_role("ROLE_ADMIN"));
        assert!(!claims.has_role("STAFF"));
    }

    #[test]
    fn test_decode_roles_array_and_objects() {
        let t = token(
            r#"{"sub":"a@b.c","exp":1,"scope":"ROLE_STAFF","roles":["ROLE_STAFF",{"authority":"ROLE_CUSTOMER"}]}"#,
        );
        let claims = Claims::decode(&t).unwrap();
        assert_eq!(claims.authorities(), vec!["ROLE_STAFF", "ROLE_CUSTOMER"]);
        assert_eq!(claims.roles(), vec!["STAFF", "CUSTOMER"]);
        assert!(claims.has_any_role(&["ADMIN", "STAFF"]));
        assert!(claims.permissions().is_empty());
    }

    #[test]
    fn test_unprefixed_roles_claim() {
        let t = token(r#"{"sub":"a@b.c","exp":1,"roles":["ADMIN"]}"#);
        let claims = Claims::decode(&t).unwrap();
        assert!(claims.has_role("ADMIN"));
    }

    #[test]
    fn test_decode_tolerates_padding() {
        let payload = URL_SAFE.encode(r#"{"sub":"x@y.z","exp":100}"#);
        assert!(payload.ends_with('='));
        let t = format!("h.{payload}.s");
        assert_eq!(Claims::decode(&t).unwrap().exp, 100);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(Claims::decode("abc"), Err(ClaimsError::Segments(1)));
        assert_eq!(Claims::decode("a.b.c.d"), Err(ClaimsError::Segments(4)));
        assert_eq!(Claims::decode("h.!!!.s"), Err(ClaimsError::Base64));
        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode("nope"));
        assert!(matches!(Claims::decode(&not_json), Err(ClaimsError::Json(_))));
    }

    #[test]
    fn test_expiry_with_leeway() {
        let t = token(r#"{"sub":"a@b.c","exp":1000}"#);
        let claims = Claims::decode(&t).unwrap();
        let at = |secs| DateTime::from_timestamp(secs, 0).unwrap();
        assert!(!claims.is_expired_at(at(900), 30));
        assert!(claims.is_expired_at(at(980), 30));
        assert!(claims.is_expired_at(at(1000), 0));
    }
}
