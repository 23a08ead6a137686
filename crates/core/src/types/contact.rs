//! Contact details collected at registration and checkout.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain exactly one @ symbol")]
    AtSymbol,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    #[error("email domain cannot be empty")]
    EmptyDomain,
}

/// An email address used as the login identifier.
///
/// Surrounding whitespace is trimmed and the address is lowercased so that
/// `Foo@Shop.vn` and `foo@shop.vn` log in as the same customer.
///
/// ```
/// use sgshop_core::Email;
///
/// assert_eq!(Email::parse(" An@Shop.VN ").unwrap().as_str(), "an@shop.vn");
/// assert!(Email::parse("a@b@c").is_err());
/// assert!(Email::parse("@shop.vn").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 254 characters,
    /// does not contain exactly one `@`, or has an empty local or domain part.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::AtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::AtSymbol);
        }
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }

        Ok(Self(s.to_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    #[error("phone number cannot be empty")]
    Empty,
    #[error("phone number must start with 0 or +84 followed by a mobile prefix and 8 digits")]
    Invalid,
}

/// A Vietnamese mobile number, stored in the domestic `0xxxxxxxxx` form.
///
/// Accepts `0` or `+84`/`84` followed by a 3, 5, 7, 8 or 9 network prefix and
/// eight more digits. Spaces, dots and dashes are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse and normalise a phone number.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::Empty`] for blank input and
    /// [`PhoneError::Invalid`] for anything that is not a VN mobile number.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let compact: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')'))
            .collect();
        if compact.is_empty() {
            return Err(PhoneError::Empty);
        }

        let national = if let Some(rest) = compact.strip_prefix("+84") {
            rest
        } else if let Some(rest) = compact.strip_prefix("84").filter(|r| r.len() == 9) {
            rest
        } else if let Some(rest) = compact.strip_prefix('0') {
            rest
        } else {
            return Err(PhoneError::Invalid);
        };

        let mut chars = national.chars();
        let prefix_ok = matches!(chars.next(), Some('3' | '5' | '7' | '8' | '9'));
        if !prefix_ok || national.len() != 9 || !national.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneError::Invalid);
        }

        Ok(Self(format!("0{national}")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_emails() {
        assert!(Email::parse("user@example.com").is_ok());
        assert!(Email::parse("user+tag@shop.com.vn").is_ok());
        assert!(Email::parse("a@b.c").is_ok());
    }

    #[test]
    fn test_email_errors() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("no-at-symbol"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("a@b@c.vn"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("@shop.vn"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("user@"), Err(EmailError::EmptyDomain));

        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { .. })));
    }

    #[test]
    fn test_email_is_normalised() {
        let email: Email = "  Lan.Nguyen@Gmail.COM ".parse().unwrap();
        assert_eq!(email.as_str(), "lan.nguyen@gmail.com");
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"lan.nguyen@gmail.com\"");
    }

    #[test]
    fn test_phone_accepts_domestic_and_international() {
        assert_eq!(PhoneNumber::parse("0912345678").unwrap().as_str(), "0912345678");
        assert_eq!(PhoneNumber::parse("+84912345678").unwrap().as_str(), "0912345678");
        assert_eq!(PhoneNumber::parse("84 38 123 4567").unwrap().as_str(), "0381234567");
        assert_eq!(PhoneNumber::parse("070-123-4567").unwrap().as_str(), "0701234567");
    }

    #[test]
    fn test_phone_rejects_invalid() {
        assert_eq!(PhoneNumber::parse(""), Err(PhoneError::Empty));
        assert_eq!(PhoneNumber::parse("0212345678"), Err(PhoneError::Invalid));
        assert_eq!(PhoneNumber::parse("091234567"), Err(PhoneError::Invalid));
        assert_eq!(PhoneNumber::parse("09123456789"), Err(PhoneError::Invalid));
        assert_eq!(PhoneNumber::parse("09123x5678"), Err(PhoneError::Invalid));
        assert_eq!(PhoneNumber::parse("912345678"), Err(PhoneError::Invalid));
    }
}
