//! Session-stored staff identity.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sgshop_core::records::AuthTokens;
use sgshop_core::{Claims, ClaimsError, UserId, roles};

/// A session is treated as expired this many seconds early.
pub const EXPIRY_LEEWAY_SECS: i64 = 30;

/// Why a successful backend login still cannot open the back office.
#[derive(Debug, Error)]
pub enum StaffLoginError {
    #[error("token could not be decoded: {0}")]
    Claims(#[from] ClaimsError),

    /// The account has neither `ADMIN` nor `STAFF`.
    #[error("account has no back-office role")]
    NoAccess,
}

/// Session-stored staff identity.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentStaff {
    pub user_id: Option<UserId>,
    pub email: String,
    pub full_name: Option<String>,
    pub roles: Vec<String>,
    #[serde(with = "secret_string")]
    pub access_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for CurrentStaff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentStaff")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl CurrentStaff {
    /// Build the session identity from login tokens.
    ///
    /// # Errors
    ///
    /// Returns `StaffLoginError::NoAccess` unless the token carries `ADMIN`
    /// or `STAFF`.
    pub fn from_tokens(tokens: AuthTokens) -> Result<Self, StaffLoginError> {
        let claims = Claims::decode(&tokens.access_token)?;
        if !claims.has_any_role(&[roles::ADMIN, roles::STAFF]) {
            return Err(StaffLoginError::NoAccess);
        }

        Ok(Self {
            user_id: claims.user_id.map(UserId::new),
            email: claims.sub.clone(),
            full_name: None,
            roles: claims.roles(),
            expires_at: claims.expires_at().unwrap_or_else(Utc::now),
            access_token: SecretString::from(tokens.access_token),
        })
    }

    #[must_use]
    pub fn token(&self) -> &str {
        self.access_token.expose_secret()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(roles::ADMIN))
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(EXPIRY_LEEWAY_SECS) >= self.expires_at
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

mod secret_string {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

/// Session keys for back-office data.
pub mod session_keys {
    /// Key for the signed-in staff member.
    pub const CURRENT_STAFF: &str = "current_staff";

    /// Key for the one-shot flash notice.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;

    fn tokens(payload: &str) -> AuthTokens {
        AuthTokens {
            access_token: format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload)),
            refresh_token: None,
        }
    }

    #[test]
    fn test_staff_and_admin_roles() {
        let staff = CurrentStaff::from_tokens(tokens(
            r#"{"sub":"kho@shop.vn","exp":2000000000,"userId":3,"scope":"ROLE_STAFF"}"#,
        ))
        .unwrap();
        assert!(!staff.is_admin());
        assert_eq!(staff.user_id, Some(UserId::new(3)));
        assert_eq!(staff.display_name(), "kho@shop.vn");

        let admin = CurrentStaff::from_tokens(tokens(
            r#"{"sub":"boss@shop.vn","exp":2000000000,"scope":"ROLE_ADMIN ORDER_WRITE"}"#,
        ))
        .unwrap();
        assert!(admin.is_admin());
    }

    #[test]
    fn test_customer_token_is_refused() {
        let result = CurrentStaff::from_tokens(tokens(
            r#"{"sub":"lan@shop.vn","exp":2000000000,"scope":"ROLE_CUSTOMER"}"#,
        ));
        assert!(matches!(result, Err(StaffLoginError::NoAccess)));

        let garbage = CurrentStaff::from_tokens(AuthTokens {
            access_token: "not-a-jwt".to_string(),
            refresh_token: None,
        });
        assert!(matches!(garbage, Err(StaffLoginError::Claims(_))));
    }

    #[test]
    fn test_expiry_and_redacted_debug() {
        let staff = CurrentStaff::from_tokens(tokens(
            r#"{"sub":"a@shop.vn","exp":1000,"scope":"ROLE_STAFF"}"#,
        ))
        .unwrap();
        assert!(staff.is_expired_at(DateTime::from_timestamp(975, 0).unwrap()));
        assert!(!staff.is_expired_at(DateTime::from_timestamp(900, 0).unwrap()));

        let json = serde_json::to_value(&staff).unwrap();
        let back: CurrentStaff = serde_json::from_value(json).unwrap();
        assert_eq!(back.token(), staff.token());
        assert!(format!("{staff:?}").contains("[REDACTED]"));
    }
}
