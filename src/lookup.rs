//! MSISDN lookup interface, the resource behind the user guard.

use async_trait::async_trait;
use serde::Serialize;

pub const MIN_MSISDN_DIGITS: usize = 8;
pub const MAX_MSISDN_DIGITS: usize = 15;

/// Result of classifying a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberInfo {
    /// Mobile network operator
    pub mno: String,
    pub country_code: String,
    pub subscriber_number: String,
    /// ISO 3166-1 alpha-2
    pub country_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("number not found")]
    NotFound,

    #[error("lookup unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait NumberLookup: Send + Sync {
    /// Classify a normalized MSISDN (digits only, no prefix).
    async fn lookup(&self, msisdn: &str) -> Result<NumberInfo, LookupError>;
}

/// Used when no lookup backend is configured; every lookup is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredLookup;

#[async_trait]
impl NumberLookup for UnconfiguredLookup {
    async fn lookup(&self, _msisdn: &str) -> Result<NumberInfo, LookupError> {
        Err(LookupError::Unavailable(
            "no number lookup backend configured".into(),
        ))
    }
}

/// Strip spaces, dashes, dots, parentheses and a leading `+` or `00`, then
/// check that 8 to 15 digits remain.
pub fn normalize_msisdn(input: &str) -> Result<String, LookupError> {
    let trimmed = input.trim();
    let without_plus = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let mut digits = String::with_capacity(without_plus.len());
    for c in without_plus.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => {
                return Err(LookupError::InvalidNumber(
                    "number may only contain digits".into(),
                ));
            }
        }
    }

    let digits = match digits.strip_prefix("00") {
        Some(rest) if !trimmed.starts_with('+') => rest.to_string(),
        _ => digits,
    };

    if digits.len() < MIN_MSISDN_DIGITS || digits.len() > MAX_MSISDN_DIGITS {
        return Err(LookupError::InvalidNumber(format!(
            "number must have between {} and {} digits",
            MIN_MSISDN_DIGITS, MAX_MSISDN_DIGITS
        )));
    }

    Ok(digits)
}
