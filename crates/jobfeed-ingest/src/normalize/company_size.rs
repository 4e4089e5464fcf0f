//! Company headcount resolution
//!
//! Postings describe size as a token such as `"50"`, `"50+"` or `"50-100"`.
//! A range resolves to the floor of its midpoint.

use serde_json::Value;
use thiserror::Error;

use crate::diagnostics::{Anomaly, Diagnostics};
use crate::document::{display_path, RawDocument};

const SIZE_PATH: [&str; 2] = ["company", "size"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompanySizeError {
    #[error("unexpected character {0:?}")]
    InvalidCharacter(char),

    #[error("more than one '-' separator")]
    TooManySeparators,

    #[error("{0:?} is not a whole number")]
    NotANumber(String),

    #[error("value out of range")]
    Overflow,
}

pub fn company_size(doc: &RawDocument, diagnostics: &mut Diagnostics) -> Option<i64> {
    let value = doc.get(&SIZE_PATH)?;

    let parsed = match value {
        Value::String(raw) => parse_company_size(raw),
        Value::Number(n) => n
            .as_i64()
            .filter(|v| *v >= 0)
            .ok_or_else(|| CompanySizeError::NotANumber(n.to_string())),
        other => Err(CompanySizeError::NotANumber(other.to_string())),
    };

    match parsed {
        Ok(size) => Some(size),
        Err(err) => {
            let raw = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            diagnostics.push(
                Anomaly::MalformedCompanySize { raw: raw.clone() },
                display_path(&SIZE_PATH),
                format!("Unrecognized company size {:?}: {}", raw, err),
            );
            None
        }
    }
}

/// Resolve a size token to a single headcount
pub fn parse_company_size(raw: &str) -> Result<i64, CompanySizeError> {
    if let Some(bad) = raw
        .chars()
        .find(|c| !(c.is_ascii_digit() || *c == '-' || *c == '+'))
    {
        return Err(CompanySizeError::InvalidCharacter(bad));
    }

    let cleaned: String = raw.chars().filter(|c| *c != '+').collect();
    let bounds: Vec<&str> = cleaned.split('-').collect();

    match bounds.as_slice() {
        [single] => parse_count(single),
        [low, high] => {
            let low = parse_count(low)?;
            let high = parse_count(high)?;
            low.checked_add(high)
                .map(|sum| sum / 2)
                .ok_or(CompanySizeError::Overflow)
        }
        _ => Err(CompanySizeError::TooManySeparators),
    }
}

fn parse_count(digits: &str) -> Result<i64, CompanySizeError> {
    if digits.is_empty() {
        return Err(CompanySizeError::NotANumber(digits.to_string()));
    }
    digits.parse::<i64>().map_err(|_| CompanySizeError::Overflow)
}
