//! Session-related types.
//!
//! Types stored in the session for authentication state and preferences.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use sgshop_core::records::AuthTokens;
use sgshop_core::{Claims, ClaimsError, UserId};

/// Tokens are refreshed this many seconds before they run out.
pub const EXPIRY_LEEWAY_SECS: i64 = 30;

/// Session-stored customer identity.
///
/// Built from the login tokens plus the decoded access token claims.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    pub user_id: Option<UserId>,
    pub email: String,
    pub full_name: Option<String>,
    pub roles: Vec<String>,
    #[serde(with = "secret_string")]
    pub access_token: SecretString,
    #[serde(default, with = "secret_string_option")]
    pub refresh_token: Option<SecretString>,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for CurrentCustomer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentCustomer")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl CurrentCustomer {
    /// Build the session identity from freshly issued tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the access token payload cannot be decoded.
    pub fn from_tokens(tokens: AuthTokens) -> Result<Self, ClaimsError> {
        let claims = Claims::decode(&tokens.access_token)?;
        let expires_at = claims.expires_at().unwrap_or_else(Utc::now);

        Ok(Self {
            user_id: claims.user_id.map(UserId::new),
            email: claims.sub.clone(),
            full_name: None,
            roles: claims.roles(),
            access_token: SecretString::from(tokens.access_token),
            refresh_token: tokens.refresh_token.map(SecretString::from),
            expires_at,
        })
    }

    /// Replace the tokens after a refresh, keeping the profile fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the new access token cannot be decoded.
    pub fn refreshed(&self, tokens: AuthTokens) -> Result<Self, ClaimsError> {
        let mut next = Self::from_tokens(tokens)?;
        next.full_name.clone_from(&self.full_name);
        if next.refresh_token.is_none() {
            next.refresh_token.clone_from(&self.refresh_token);
        }
        Ok(next)
    }

    #[must_use]
    pub fn token(&self) -> &str {
        self.access_token.expose_secret()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(ExposeSecret::expose_secret)
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(EXPIRY_LEEWAY_SECS) >= self.expires_at
    }

    /// Name for the header: full name when known, else the email.
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

mod secret_string_option {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(secret) => serializer.serialize_some(secret.expose_secret()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SecretString>, D::Error> {
        Option::<String>::deserialize(deserializer).map(|v| v.map(SecretString::from))
    }
}

/// Colour scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Session keys for storefront data.
pub mod session_keys {
    /// Key for storing the current logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for the session cart.
    pub const CART: &str = "cart";

    /// Key for the light/dark preference.
    pub const THEME: &str = "theme";

    /// Key for the one-shot flash notice.
    pub const FLASH: &str = "flash";
}
