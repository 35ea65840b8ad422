//! Shopify order number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    /// The input string is empty or only whitespace.
    #[error("order number cannot be empty")]
    Empty,
}

/// The human-facing order identifier exported by Shopify in the `Name` column
/// (e.g. `#1042`).
///
/// Order numbers are the natural key of an order: unique, and never changed
/// once stored. Surrounding whitespace is trimmed; any other text, of any
/// length, is kept as exported.
///
/// ## Examples
///
/// ```
/// use vega_core::OrderNumber;
///
/// assert_eq!(OrderNumber::parse(" #1042 ").unwrap().as_str(), "#1042");
/// assert!(OrderNumber::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Parse an `OrderNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(OrderNumberError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `OrderNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let n = OrderNumber::parse("  #1001\t").unwrap();
        assert_eq!(n.as_str(), "#1001");
        assert_eq!(n.to_string(), "#1001");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(OrderNumber::parse(""), Err(OrderNumberError::Empty));
        assert_eq!(OrderNumber::parse("  "), Err(OrderNumberError::Empty));
    }

    #[test]
    fn test_parse_keeps_long_names() {
        let long = format!("#{}", "9".repeat(120));
        assert_eq!(OrderNumber::parse(&long).unwrap().as_str(), long);
    }
}
