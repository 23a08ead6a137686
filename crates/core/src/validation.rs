//! Form field validation.
//!
//! Handlers collect every problem with a submitted form into a
//! [`FieldErrors`] and re-render the form with the messages next to their
//! fields. Nothing is sent to the backend while errors remain.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{Money, MoneyError};

/// Field name to message, in the order the problems were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    errors: Vec<(String, String)>,
}

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem. The first message for a field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.errors.push((field.to_owned(), message.into()));
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, m)| m.as_str())
    }

    /// Message for `field`, or an empty string. Templates render this
    /// directly under the input.
    #[must_use]
    pub fn message(&self, field: &str) -> &str {
        self.get(field).unwrap_or_default()
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(f, m)| (f.as_str(), m.as_str()))
    }

    /// The first message, for a single-line flash.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        self.errors.first().map(|(_, m)| m.as_str())
    }

    /// Trimmed non-empty text, or records `message`.
    pub fn require_text(&mut self, field: &str, value: &str, message: &str) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, message);
            None
        } else {
            Some(trimmed.to_owned())
        }
    }

    /// Optional trimmed text; blank input becomes `None`.
    #[must_use]
    pub fn optional_text(value: Option<&str>) -> Option<String> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }

    /// Parse a dong amount. `label` names the field in messages.
    pub fn parse_money(&mut self, field: &str, value: &str, label: &str) -> Option<Money> {
        match Money::parse_input(value) {
            Ok(money) => Some(money),
            Err(MoneyError::Empty) => {
                self.add(field, format!("{label} là bắt buộc"));
                None
            }
            Err(MoneyError::NotANumber) => {
                self.add(field, format!("{label} phải là số"));
                None
            }
            Err(MoneyError::Negative) => {
                self.add(field, format!("{label} không được âm"));
                None
            }
        }
    }

    /// Parse a decimal number (percentages, fixed amounts).
    pub fn parse_decimal(&mut self, field: &str, value: &str, label: &str) -> Option<Decimal> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, format!("{label} là bắt buộc"));
            return None;
        }
        if let Ok(d) = trimmed.parse::<Decimal>() {
            Some(d)
        } else {
            self.add(field, format!("{label} phải là số"));
            None
        }
    }

    /// Parse an integer that must be at least `min`.
    pub fn parse_int_at_least(
        &mut self,
        field: &str,
        value: &str,
        min: i64,
        label: &str,
    ) -> Option<i64> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, format!("{label} là bắt buộc"));
            return None;
        }
        match trimmed.parse::<i64>() {
            Ok(n) if n >= min => Some(n),
            Ok(_) => {
                self.add(field, format!("{label} phải lớn hơn hoặc bằng {min}"));
                None
            }
            Err(_) => {
                self.add(field, format!("{label} phải là số nguyên"));
                None
            }
        }
    }

    /// Parse an integer greater than zero.
    pub fn parse_positive_int(&mut self, field: &str, value: &str, label: &str) -> Option<i64> {
        self.parse_int_at_least(field, value, 1, label)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text_trims() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            errors.require_text("name", "  Áo thun ", "Tên là bắt buộc"),
            Some("Áo thun".to_owned())
        );
        assert!(errors.is_empty());

        assert_eq!(errors.require_text("name", "   ", "Tên là bắt buộc"), None);
        assert_eq!(errors.get("name"), Some("Tên là bắt buộc"));
    }

    #[test]
    fn test_first_message_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.add("price", "first");
        errors.add("price", "second");
        errors.add("stock", "third");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("price"), Some("first"));
        assert_eq!(errors.first_message(), Some("first"));
    }

    #[test]
    fn test_parse_money_messages() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            errors.parse_money("price", "199.000", "Giá"),
            Some(Money::from_dong(199_000))
        );
        assert!(errors.parse_money("price", "abc", "Giá").is_none());
        assert_eq!(errors.get("price"), Some("Giá phải là số"));
    }

    #[test]
    fn test_parse_ints() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.parse_int_at_least("stock", "0", 0, "Tồn kho"), Some(0));
        assert_eq!(errors.parse_positive_int("quantity", "0", "Số lượng"), None);
        assert!(errors.has("quantity"));
        assert_eq!(errors.parse_positive_int("qty2", "1.5", "Số lượng"), None);
        assert_eq!(errors.get("qty2"), Some("Số lượng phải là số nguyên"));
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(FieldErrors::optional_text(Some("  ")), None);
        assert_eq!(FieldErrors::optional_text(None), None);
        assert_eq!(
            FieldErrors::optional_text(Some(" x ")),
            Some("x".to_owned())
        );
    }
}
