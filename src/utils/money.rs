//! Fixed-point monetary amounts: scale 2, stored as integer minor units
//! (cents) the way the persisted-state layout requires.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount must match ^[0-9]+(\\.[0-9]{{2}})?$, got {0:?}")]
    InvalidFormat(String),
    #[error("amount must be non-negative")]
    Negative,
}

/// A non-negative amount with exactly two decimal digits of precision,
/// represented internally as cents to avoid floating point drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money(i64);

impl Money {
    pub fn from_cents(cents: i64) -> Result<Self, MoneyError> {
        if cents < 0 {
            return Err(MoneyError::Negative);
        }
        Ok(Self(cents))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Parses a decimal string matching `^[0-9]+(\.[0-9]{2})?$`, positive.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        if !is_valid_amount(input) {
            return Err(MoneyError::InvalidFormat(input.to_string()));
        }

        let cents = match input.split_once('.') {
            Some((whole, frac)) => {
                let whole: i64 = whole.parse().map_err(|_| MoneyError::InvalidFormat(input.to_string()))?;
                let frac: i64 = frac.parse().map_err(|_| MoneyError::InvalidFormat(input.to_string()))?;
                whole * 100 + frac
            }
            None => {
                let whole: i64 = input.parse().map_err(|_| MoneyError::InvalidFormat(input.to_string()))?;
                whole * 100
            }
        };

        if cents <= 0 {
            return Err(MoneyError::Negative);
        }

        Ok(Self(cents))
    }
}

fn is_valid_amount(input: &str) -> bool {
    let (whole, frac) = match input.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (input, None),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    match frac {
        None => true,
        Some(f) => f.len() == 2 && f.bytes().all(|b| b.is_ascii_digit()),
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Money::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(Money::parse("10.00").unwrap().cents(), 1000);
        assert_eq!(Money::parse("25.5").is_err(), true);
        assert_eq!(Money::parse("25.50").unwrap().cents(), 2550);
        assert_eq!(Money::parse("7").unwrap().cents(), 700);
    }

    #[test]
    fn rejects_negative_and_malformed_amounts() {
        assert!(Money::parse("-1.00").is_err());
        assert!(Money::parse("0.00").is_err());
        assert!(Money::parse("abc").is_err());
        assert!(Money::parse("1.5").is_err());
        assert!(Money::parse("1.500").is_err());
    }

    #[test]
    fn displays_with_two_decimal_places() {
        assert_eq!(Money::from_cents(1000).unwrap().to_string(), "10.00");
        assert_eq!(Money::from_cents(2550).unwrap().to_string(), "25.50");
    }

}
