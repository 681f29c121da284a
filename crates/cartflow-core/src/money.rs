//! # Money Module
//!
//! Provides the `Money` type used for every price and total in a cart.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SUB-TOTAL ACCUMULATION                                                 │
//! │                                                                         │
//! │  With floats:                                                           │
//! │    3 × 0.10 + 0.20 = 0.5000000000000001                                │
//! │                                                                         │
//! │  With integer cents:                                                    │
//! │    3 × 10 + 20 = 50 cents, exactly                                     │
//! │                                                                         │
//! │  Tax and discount lines round once, at the end, half-up to the cent.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cartflow_core::money::Money;
//!
//! let price = Money::from_cents(1000); // $10.00
//! let line_total = price.checked_mul_quantity(5).unwrap();
//! assert_eq!(line_total.cents(), 5000);
//!
//! // Arithmetic is checked; overflow is a `None`, never a wrapped total
//! assert_eq!(Money::from_cents(i64::MAX).checked_mul_quantity(2), None);
//!
//! // Raw price columns from record rows are parsed, not cast
//! let parsed: Money = "10.99".parse().unwrap();
//! assert_eq!(parsed.cents(), 1099);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Signed so that discount lines can be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use cartflow_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion, always 0-99.
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a line quantity.
    ///
    /// Returns `None` if the product does not fit in an `i64`.
    ///
    /// ```rust
    /// use cartflow_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.checked_mul_quantity(3), Some(Money::from_cents(897)));
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as i64) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Negates the amount, returning `None` for `i64::MIN` cents.
    #[inline]
    pub const fn checked_neg(&self) -> Option<Self> {
        match self.0.checked_neg() {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `rate` of this amount, rounded half-up to the cent.
    ///
    /// Used by both tax and percentage-discount totals. Returns `None` when
    /// the result does not fit, which takes a rate above 100%.
    ///
    /// ```rust
    /// use cartflow_core::money::{BasisPoints, Money};
    ///
    /// let sub_total = Money::from_cents(1000);
    /// // $10.00 × 8.25% = $0.825 → $0.83
    /// let tax = sub_total.checked_percentage_of(BasisPoints::from_bps(825));
    /// assert_eq!(tax, Some(Money::from_cents(83)));
    /// ```
    pub fn checked_percentage_of(&self, rate: BasisPoints) -> Option<Money> {
        // i128 keeps large baskets from overflowing before the division
        let cents = (i128::from(self.0) * i128::from(rate.bps()) + 5000) / 10000;
        i64::try_from(cents).ok().map(Money)
    }

    /// Formats the amount as a plain decimal string, e.g. `"10.99"`.
    ///
    /// This is the representation written to record price columns.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// A string could not be read as a money amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{input}' is not a money amount: {reason}")]
pub struct ParseMoneyError {
    input: String,
    reason: &'static str,
}

impl ParseMoneyError {
    fn new(input: &str, reason: &'static str) -> Self {
        ParseMoneyError {
            input: input.to_string(),
            reason,
        }
    }
}

/// Parses decimal amounts with at most two fractional digits.
///
/// Accepts `"10"`, `"10.5"`, `"10.50"`, `"-3.20"` and `".99"`. Rejects
/// anything else rather than guessing.
impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        let (major, minor) = digits.split_once('.').unwrap_or((digits, ""));

        if major.is_empty() && minor.is_empty() {
            return Err(ParseMoneyError::new(input, "no digits"));
        }
        if !major.chars().chain(minor.chars()).all(|c| c.is_ascii_digit()) {
            return Err(ParseMoneyError::new(input, "not a decimal number"));
        }
        if minor.len() > 2 {
            return Err(ParseMoneyError::new(input, "more than two decimal places"));
        }

        let major: i64 = if major.is_empty() {
            0
        } else {
            major
                .parse()
                .map_err(|_| ParseMoneyError::new(input, "amount too large"))?
        };
        let minor: i64 = if minor.is_empty() {
            0
        } else {
            format!("{minor:0<2}")
                .parse()
                .map_err(|_| ParseMoneyError::new(input, "not a decimal number"))?
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| ParseMoneyError::new(input, "amount too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Basis Points
// =============================================================================

/// A rate in basis points: 1 bps = 0.01%, 825 bps = 8.25%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BasisPoints(u32);

impl BasisPoints {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        BasisPoints(bps)
    }

    /// Creates a rate from a percentage, e.g. `8.25`.
    pub fn from_percentage(pct: f64) -> Self {
        BasisPoints((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Percentage, for display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
