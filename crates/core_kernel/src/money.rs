//! Money types and the amount normalizer
//!
//! Every amount that enters the system passes through this module. Raw values
//! arrive as integers, floats, decimals or operator-typed text and leave as a
//! [`Decimal`] fixed at two fractional digits, rounded half away from zero.
//!
//! Two entry points exist on purpose:
//!
//! - [`parse_display`] (alias [`normalize`]) never fails and maps garbage to
//!   `0.00`. It is meant for read paths such as report rendering.
//! - [`parse_amount`] is the strict twin used on write paths, where silently
//!   recording zero would corrupt the books.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits carried by every monetary amount
pub const MONEY_SCALE: u32 = 2;

/// Errors that can occur while parsing or computing amounts
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Amount is empty")]
    Empty,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Fractional quantity not allowed: {0}")]
    FractionalQuantity(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow")]
    Overflow,
}

/// A raw amount as it arrives from a caller, before normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawAmount<'a> {
    Missing,
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Text(&'a str),
}

impl From<i64> for RawAmount<'_> {
    fn from(value: i64) -> Self {
        RawAmount::Integer(value)
    }
}

impl From<i32> for RawAmount<'_> {
    fn from(value: i32) -> Self {
        RawAmount::Integer(i64::from(value))
    }
}

impl From<u32> for RawAmount<'_> {
    fn from(value: u32) -> Self {
        RawAmount::Integer(i64::from(value))
    }
}

impl From<f64> for RawAmount<'_> {
    fn from(value: f64) -> Self {
        RawAmount::Float(value)
    }
}

impl From<Decimal> for RawAmount<'_> {
    fn from(value: Decimal) -> Self {
        RawAmount::Decimal(value)
    }
}

impl<'a> From<&'a str> for RawAmount<'a> {
    fn from(value: &'a str) -> Self {
        RawAmount::Text(value)
    }
}

impl<'a> From<&'a String> for RawAmount<'a> {
    fn from(value: &'a String) -> Self {
        RawAmount::Text(value.as_str())
    }
}

impl<'a, T: Into<RawAmount<'a>>> From<Option<T>> for RawAmount<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawAmount::Missing, Into::into)
    }
}

/// Rounds to two fractional digits, half away from zero
///
/// The result always carries scale 2, so `5` becomes `5.00`.
pub fn quantize(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Lenient normalization for display paths
///
/// Missing, empty, non-finite or unparseable input yields `0.00`.
pub fn parse_display<'a>(raw: impl Into<RawAmount<'a>>) -> Decimal {
    parse_amount(raw).unwrap_or_else(|_| quantize(Decimal::ZERO))
}

/// Alias of [`parse_display`]
pub fn normalize<'a>(raw: impl Into<RawAmount<'a>>) -> Decimal {
    parse_display(raw)
}

/// Strict normalization for write paths
///
/// Accepts the same shapes as [`parse_display`] but reports missing or
/// malformed input instead of mapping it to zero.
pub fn parse_amount<'a>(raw: impl Into<RawAmount<'a>>) -> Result<Decimal, MoneyError> {
    let value = match raw.into() {
        RawAmount::Missing => return Err(MoneyError::Empty),
        RawAmount::Integer(n) => Decimal::from(n),
        RawAmount::Decimal(d) => d,
        RawAmount::Float(f) => {
            if !f.is_finite() {
                return Err(MoneyError::InvalidAmount(f.to_string()));
            }
            // Shortest round-trip representation, so 0.1 stays 0.1
            parse_text(&f.to_string()).ok_or_else(|| MoneyError::InvalidAmount(f.to_string()))?
        }
        RawAmount::Text(s) => {
            if s.trim().is_empty() {
                return Err(MoneyError::Empty);
            }
            parse_text(s).ok_or_else(|| MoneyError::InvalidAmount(s.to_string()))?
        }
    };
    Ok(quantize(value))
}

/// Parses operator text: thousands separators and accounting parentheses
pub(crate) fn parse_text(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();

    let (body, negate) = match cleaned.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (inner.trim().to_string(), true),
        None => (cleaned, false),
    };

    if body.is_empty() {
        return None;
    }

    let value = Decimal::from_str(&body)
        .or_else(|_| Decimal::from_scientific(&body))
        .ok()?;

    Some(if negate { -value } else { value })
}

/// Divides and quantizes, returning `default` when the divisor is zero
pub fn safe_divide(numerator: Decimal, denominator: Decimal, default: Decimal) -> Decimal {
    if denominator.is_zero() {
        return quantize(default);
    }
    numerator
        .checked_div(denominator)
        .map(quantize)
        .unwrap_or_else(|| quantize(default))
}

/// A monetary amount fixed at two fractional digits
///
/// Every constructor quantizes, so two `Money` values that compare equal
/// also render identically. Serialized as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Creates a new Money value, rounding half away from zero
    pub fn new(amount: Decimal) -> Self {
        Self(quantize(amount))
    }

    /// Creates Money from an integer amount in minor units (cents)
    pub fn from_minor(minor_units: i64) -> Self {
        Self::new(Decimal::new(minor_units, MONEY_SCALE))
    }

    pub fn zero() -> Self {
        Self::new(Decimal::ZERO)
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Extends a unit amount over a whole number of units
    ///
    /// Fails with [`MoneyError::Overflow`] past the range of [`Decimal`].
    pub fn checked_times(&self, units: i64) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(Decimal::from(units))
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Adds two amounts, failing instead of panicking on overflow
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.0.checked_add(other.0).map(Self::new).ok_or(MoneyError::Overflow)
    }

    /// Divides by a whole number of units, `None` when `units` is zero
    pub fn per_unit(&self, units: i64) -> Option<Self> {
        if units == 0 {
            return None;
        }
        Some(Self::new(safe_divide(self.0, Decimal::from(units), Decimal::ZERO)))
    }

    /// Returns the smaller of two amounts
    pub fn min(self, other: Self) -> Self {
        if self <= other { self } else { other }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Decimal {
        money.0
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_amount(s).map(Self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Represents a percentage rate (e.g., VAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    /// The rate as a decimal (e.g., 0.12 for 12%)
    value: Decimal,
}

impl Rate {
    /// Creates a rate from a decimal value (e.g., 0.12 for 12%)
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Creates a rate from a percentage (e.g., 12 for 12%)
    pub fn from_percentage(percentage: Decimal) -> Self {
        Self {
            value: percentage / dec!(100),
        }
    }

    /// Returns the rate as a decimal
    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    /// Returns the rate as a percentage
    pub fn as_percentage(&self) -> Decimal {
        self.value * dec!(100)
    }

    /// Applies this rate to an exclusive amount
    pub fn apply(&self, money: &Money) -> Money {
        Money::new(money.amount() * self.value)
    }

    /// Splits a tax-inclusive gross amount into `(net, tax)`
    ///
    /// The net is rounded and the tax takes the remainder, so the two parts
    /// always add back to `gross` exactly.
    pub fn split_inclusive(&self, gross: Money) -> (Money, Money) {
        let divisor = Decimal::ONE + self.value;
        if divisor.is_zero() {
            return (gross, Money::zero());
        }
        let net = Money::new(safe_divide(gross.amount(), divisor, gross.amount()));
        (net, gross - net)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().round_dp(4))
    }
}
