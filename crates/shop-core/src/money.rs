//! Money Handling
//!
//! Records keep amounts in major currency units (rupees); the gateway API
//! speaks minor units (paise). Conversion happens only through these helpers.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

/// Minor units per major unit
const MINOR_PER_MAJOR: i64 = 100;

/// Parse a client-supplied amount.
///
/// Accepts JSON numbers and numeric strings (surrounding whitespace is
/// ignored). Returns `None` for anything that is not a finite number.
pub fn parse_amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

/// Parse a client-supplied amount that must be strictly positive.
pub fn parse_positive_amount(value: &Value) -> Option<Decimal> {
    parse_amount(value).filter(|amount| amount.is_sign_positive() && !amount.is_zero())
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Convert a major-unit amount to minor units, rounding half away from zero.
///
/// Returns `None` when the result does not fit in an `i64`.
pub fn to_minor(major: Decimal) -> Option<i64> {
    major
        .checked_mul(Decimal::from(MINOR_PER_MAJOR))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Round a major-unit amount to whole minor units, half away from zero.
///
/// Stored amounts go through this so every backend keeps the same value.
pub fn round_major(major: Decimal) -> Decimal {
    major
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Convert a minor-unit amount reported by the gateway to major units.
pub fn to_major(minor: i64) -> Decimal {
    Decimal::new(minor, 2).normalize()
}
