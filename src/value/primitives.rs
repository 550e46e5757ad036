//! Refined string and timestamp primitives, validated once at construction
//! (spec §3 "Refined primitives"). Mirrors the approval prototype's
//! smart-constructor idiom (`UserID::new`, `TimeStamp::new_with`), extended
//! to collect every violation rather than failing on the first.

use chrono::{DateTime, Utc};

use crate::error::{Error, FieldViolation};

/// A string validated to be non-empty at construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, Error> {
        let value = value.into();
        if value.is_empty() {
            Err(Error::single_violation("value", "must not be empty"))
        } else {
            Ok(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Legal Entity Identifier: exactly 20 alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lei(String);

impl Lei {
    pub fn new(value: impl Into<String>) -> Result<Self, Error> {
        let value = value.into();
        if value.len() == 20 && value.chars().all(|c| c.is_ascii_alphanumeric()) {
            Ok(Self(value))
        } else {
            Err(Error::single_violation(
                "lei",
                format!("expected 20 alphanumeric characters, got {value:?}"),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Lei {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An International Securities Identification Number: 12 characters, with
/// a trailing Luhn check digit over the preceding 11 characters (letters
/// mapped to their base-36 digit values, per the standard ISIN check).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Isin(String);

impl Isin {
    pub fn new(value: impl Into<String>) -> Result<Self, Error> {
        let value = value.into();
        if value.len() != 12 {
            return Err(Error::single_violation(
                "isin",
                format!("expected 12 characters, got {}", value.len()),
            ));
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::single_violation(
                "isin",
                "must be alphanumeric ASCII",
            ));
        }
        if !luhn_check(&value) {
            return Err(Error::single_violation("isin", "Luhn check digit failed"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Expand each ASCII character to its base-36 digit string (0-9 as
/// themselves, A-Z as 10-35), concatenate, then Luhn-check the result —
/// the standard ISIN check-digit algorithm.
fn luhn_check(isin: &str) -> bool {
    let mut digits: Vec<u32> = Vec::with_capacity(isin.len() * 2);
    for c in isin.chars() {
        let value = match c {
            '0'..='9' => c.to_digit(10).unwrap(),
            'A'..='Z' => c as u32 - 'A' as u32 + 10,
            'a'..='z' => c as u32 - 'a' as u32 + 10,
            _ => return false,
        };
        if value >= 10 {
            digits.push(value / 10);
            digits.push(value % 10);
        } else {
            digits.push(value);
        }
    }

    let mut sum = 0u32;
    let mut double = false; // rightmost digit (the check digit itself) is not doubled
    for &d in digits.iter().rev() {
        if double {
            let doubled = d * 2;
            sum += if doubled > 9 { doubled - 9 } else { doubled };
        } else {
            sum += d;
        }
        double = !double;
    }
    sum % 10 == 0
}

/// A Unique Transaction Identifier: 1-52 characters, the first 20 of which
/// must be alphanumeric (the LEI prefix slot; see [`crate::projection::uti`]).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uti(String);

impl Uti {
    pub fn new(value: impl Into<String>) -> Result<Self, Error> {
        let value = value.into();
        let mut violations = Vec::new();
        if value.is_empty() || value.len() > 52 {
            violations.push(FieldViolation::new(
                "uti",
                format!("length must be 1-52, got {}", value.len()),
            ));
        }
        let prefix_len = value.chars().count().min(20);
        let prefix_ok = value.chars().take(prefix_len).all(|c| c.is_ascii_alphanumeric());
        if prefix_len < 20 || !prefix_ok {
            violations.push(FieldViolation::new(
                "uti",
                "first 20 characters must be alphanumeric",
            ));
        }
        if violations.is_empty() {
            Ok(Self(value))
        } else {
            Err(Error::validation(violations))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A UTC timestamp. `chrono::DateTime<Utc>` cannot represent a naive time,
/// so construction only rejects non-UTC input when parsing from text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UtcTimestamp(DateTime<Utc>);

impl UtcTimestamp {
    pub fn new(value: DateTime<Utc>) -> Self {
        Self(value)
    }

    pub fn parse_rfc3339(value: &str) -> Result<Self, Error> {
        let parsed = DateTime::parse_from_rfc3339(value)
            .map_err(|e| Error::single_violation("timestamp", e.to_string()))?;
        Ok(Self(parsed.with_timezone(&Utc)))
    }

    pub fn get(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lei_length_boundaries() {
        assert!(Lei::new("1".repeat(19)).is_err());
        assert!(Lei::new("1".repeat(21)).is_err());
        assert!(Lei::new("5299001234567890ABCD").is_ok());
    }

    #[test]
    fn isin_rejects_bad_check_digit() {
        // US0378331005 is Apple's real ISIN (valid check digit).
        assert!(Isin::new("US0378331005").is_ok());
        assert!(Isin::new("US0378331006").is_err());
    }

    #[test]
    fn isin_rejects_wrong_length() {
        assert!(Isin::new("US037833100").is_err());
    }

    #[test]
    fn non_empty_string_rejects_empty() {
        assert!(NonEmptyString::new("").is_err());
        assert!(NonEmptyString::new("x").is_ok());
    }

    #[test]
    fn uti_length_and_prefix() {
        let good = format!("{}{}", "5299001234567890ABCD", "a1b2c3");
        assert!(Uti::new(good).is_ok());
        assert!(Uti::new("short").is_err());
        assert!(Uti::new("x".repeat(53)).is_err());
    }
}
