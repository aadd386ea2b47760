//! Whole-unit quantity parsing
//!
//! Stock is counted in whole units. Operator input such as `"12"`, `"1,200"`
//! or `12.0` is accepted, while `"1.5"` is rejected rather than truncated.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::money::{parse_text, MoneyError, RawAmount};

/// Parses a raw value into a whole number of units
///
/// The sign is preserved; whether a negative quantity is meaningful is up
/// to the caller.
pub fn parse_units<'a>(raw: impl Into<RawAmount<'a>>) -> Result<i64, MoneyError> {
    let raw = raw.into();
    let value = match raw {
        RawAmount::Missing => return Err(MoneyError::InvalidQuantity("missing".to_string())),
        RawAmount::Integer(n) => return Ok(n),
        RawAmount::Decimal(d) => d,
        RawAmount::Float(f) => {
            if !f.is_finite() {
                return Err(MoneyError::InvalidQuantity(f.to_string()));
            }
            parse_text(&f.to_string()).ok_or_else(|| MoneyError::InvalidQuantity(f.to_string()))?
        }
        RawAmount::Text(s) => {
            parse_text(s).ok_or_else(|| MoneyError::InvalidQuantity(s.trim().to_string()))?
        }
    };
    whole_units(value)
}

fn whole_units(value: Decimal) -> Result<i64, MoneyError> {
    if !value.fract().is_zero() {
        return Err(MoneyError::FractionalQuantity(value.to_string()));
    }
    value.trunc().to_i64().ok_or(MoneyError::Overflow)
}
