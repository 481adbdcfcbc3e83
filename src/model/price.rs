//! Price type for the amount of a booking or an expense.
//!
//! This module provides the `Price` type which wraps a non-negative `Decimal` and parses only
//! plain decimal numbers: digits with an optional fractional part, no sign, no separators.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use tracing::warn;

/// A non-negative price.
///
/// Prices are written in their shortest form, so trailing zeros are dropped:
///
/// ```
/// # use booking_grid::model::Price;
/// # use std::str::FromStr;
/// assert_eq!(Price::from_str("120.00").unwrap().to_string(), "120");
/// assert_eq!(Price::from_str("120.5").unwrap().to_string(), "120.5");
/// assert!(Price::from_str("-5").is_err());
/// assert!(Price::from_str("1,000").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    /// Returns `None` for negative values.
    pub fn new(value: Decimal) -> Option<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            None
        } else {
            Some(Self(value.normalize()))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// Converts a stored floating point value back into a price, used when reading the ledger
    /// back from SQLite.
    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64_retain(value)
            .map(|d| d.round_dp(6))
            .and_then(Price::new)
    }
}

/// The reason a string could not be parsed into a `Price`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PriceError {
    Empty,
    Malformed(String),
    Overflow(String),
}

impl Display for PriceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PriceError::Empty => write!(f, "A price must not be empty"),
            PriceError::Malformed(s) => write!(f, "'{s}' is not a plain non-negative number"),
            PriceError::Overflow(s) => write!(f, "'{s}' is too large to be a price"),
        }
    }
}

impl std::error::Error for PriceError {}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (trimmed, None),
        };
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(whole) || !fraction.map(digits).unwrap_or(true) {
            return Err(PriceError::Malformed(trimmed.to_string()));
        }

        let value =
            Decimal::from_str(trimmed).map_err(|_| PriceError::Overflow(trimmed.to_string()))?;
        Ok(Self(value.normalize()))
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Totals saturate at `Decimal::MAX` instead of overflowing.
impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Self) -> Self::Output {
        match self.0.checked_add(rhs.0) {
            Some(total) => Price(total),
            None => {
                warn!("The total of {self} and {rhs} is too large, keeping the largest price");
                Price(Decimal::MAX)
            }
        }
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Price::ZERO, Add::add)
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Price::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer() {
        let price = Price::from_str("120").unwrap();
        assert_eq!(price.value(), Decimal::from(120));
    }

    #[test]
    fn test_parse_fraction() {
        let price = Price::from_str("120.5").unwrap();
        assert_eq!(price.to_string(), "120.5");
    }

    #[test]
    fn test_trailing_zeros_are_dropped() {
        assert_eq!(Price::from_str("120.00").unwrap().to_string(), "120");
        assert_eq!(Price::from_str("0.50").unwrap().to_string(), "0.5");
        assert_eq!(Price::from_str("0").unwrap().to_string(), "0");
    }

    #[test]
    fn test_parse_whitespace() {
        assert_eq!(Price::from_str("  75  ").unwrap().to_string(), "75");
    }

    #[test]
    fn test_reject_malformed() {
        assert_eq!(Price::from_str(""), Err(PriceError::Empty));
        assert!(matches!(Price::from_str("-5"), Err(PriceError::Malformed(_))));
        assert!(matches!(Price::from_str("1,000"), Err(PriceError::Malformed(_))));
        assert!(matches!(Price::from_str(".5"), Err(PriceError::Malformed(_))));
        assert!(matches!(Price::from_str("5."), Err(PriceError::Malformed(_))));
        assert!(matches!(Price::from_str("$5"), Err(PriceError::Malformed(_))));
        assert!(matches!(Price::from_str("1e3"), Err(PriceError::Malformed(_))));
    }

    #[test]
    fn test_reject_overflow() {
        let huge = "9".repeat(40);
        assert!(matches!(Price::from_str(&huge), Err(PriceError::Overflow(_))));
    }

    #[test]
    fn test_equality_ignores_scale() {
        assert_eq!(
            Price::from_str("100").unwrap(),
            Price::from_str("100.000").unwrap()
        );
    }

    #[test]
    fn test_sum() {
        let total: Price = ["10", "20.5", "0.25"]
            .iter()
            .map(|s| Price::from_str(s).unwrap())
            .sum();
        assert_eq!(total.to_string(), "30.75");
    }

    #[test]
    fn test_sum_saturates() {
        let near_max = Price::new(Decimal::MAX - Decimal::ONE).unwrap();
        let total: Price = [near_max, near_max, Price::from_str("1").unwrap()]
            .into_iter()
            .sum();
        assert_eq!(total.value(), Decimal::MAX);
    }

    #[test]
    fn test_f64_round_trip() {
        let price = Price::from_str("120.5").unwrap();
        assert_eq!(Price::from_f64(price.to_f64()), Some(price));
        assert_eq!(Price::from_f64(-1.0), None);
    }

    #[test]
    fn test_serde() {
        let price = Price::from_str("80").unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"80\"");
        let back: Price = serde_json::from_str("\"80.0\"").unwrap();
        assert_eq!(back, price);
    }
}
