//! Price - Immutable monetary value with a distinguished market variant.
//!
//! Limit prices are signed fixed-point amounts in minor units (cents).
//! Market prices carry no amount: they are always marketable in matching
//! contexts and unordered for ordinary relational comparisons.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::errors::PriceError;

/// A price is either a limit amount in cents or the market marker.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum Price {
    /// Fixed-point amount in minor units (e.g. $100.50 -> 10050)
    Limit(i64),
    /// No limit: crosses any opposing resting price, never rests unfilled
    Market,
}

impl Price {
    /// Limit price from a cent amount.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Price::Limit(cents)
    }

    /// The zero limit price, used when publishing an empty book side.
    #[inline]
    pub const fn zero() -> Self {
        Price::Limit(0)
    }

    /// Parse a decimal price string, e.g. `"10.50"`, `"$1,234.05"`, `"-.05"`.
    ///
    /// A leading `$` and `,` group separators are accepted. The amount is
    /// rounded to whole cents, midpoint away from zero.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let cleaned: String = input
            .trim()
            .chars()
            .filter(|c| *c != '$' && *c != ',')
            .collect();
        if cleaned.is_empty() {
            return Err(PriceError::Parse(input.to_string()));
        }
        let dec = Decimal::from_str(&cleaned)
            .map_err(|_| PriceError::Parse(input.to_string()))?;
        let cents = (dec * Decimal::from(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| PriceError::Parse(input.to_string()))?;
        Ok(Price::Limit(cents))
    }

    #[inline]
    pub const fn is_market(&self) -> bool {
        matches!(self, Price::Market)
    }

    /// Cent amount of a limit price; `None` for market.
    #[inline]
    pub const fn cents(&self) -> Option<i64> {
        match self {
            Price::Limit(v) => Some(*v),
            Price::Market => None,
        }
    }

    /// Add two limit prices. Market operands are rejected.
    pub fn add(&self, other: Price) -> Result<Price, PriceError> {
        match (self, other) {
            (Price::Limit(a), Price::Limit(b)) => Ok(Price::Limit(a + b)),
            _ => Err(PriceError::MarketOperand),
        }
    }

    /// Subtract a limit price from this one. Market operands are rejected.
    pub fn subtract(&self, other: Price) -> Result<Price, PriceError> {
        match (self, other) {
            (Price::Limit(a), Price::Limit(b)) => Ok(Price::Limit(a - b)),
            _ => Err(PriceError::MarketOperand),
        }
    }

    /// Multiply a limit price by a volume. Market operands are rejected.
    pub fn multiply(&self, volume: u32) -> Result<Price, PriceError> {
        match self {
            Price::Limit(a) => Ok(Price::Limit(a * volume as i64)),
            Price::Market => Err(PriceError::MarketOperand),
        }
    }

    // Relational helpers: false whenever a market price is involved, per the
    // ordinary-comparison contract. Matching code handles market explicitly.

    #[inline]
    pub fn greater_or_equal(&self, other: Price) -> bool {
        matches!(self.partial_cmp(&other), Some(Ordering::Greater | Ordering::Equal))
    }

    #[inline]
    pub fn less_or_equal(&self, other: Price) -> bool {
        matches!(self.partial_cmp(&other), Some(Ordering::Less | Ordering::Equal))
    }

    #[inline]
    pub fn greater_than(&self, other: Price) -> bool {
        matches!(self.partial_cmp(&other), Some(Ordering::Greater))
    }

    #[inline]
    pub fn less_than(&self, other: Price) -> bool {
        matches!(self.partial_cmp(&other), Some(Ordering::Less))
    }
}

impl PartialOrd for Price {
    /// Total order among limit prices only; comparisons involving market
    /// are undefined (`None`).
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Price::Limit(a), Price::Limit(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Market => write!(f, "MKT"),
            Price::Limit(cents) => {
                let sign = if *cents < 0 { "-" } else { "" };
                let abs = cents.unsigned_abs();
                write!(f, "${}{}.{:02}", sign, abs / 100, abs % 100)
            }
        }
    }
}
