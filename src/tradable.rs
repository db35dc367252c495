//! Tradable - The unit of resting interest.
//!
//! A tradable is either a standalone order or one leg of a two-sided quote,
//! distinguished by a tag rather than separate types. Matching and
//! cancellation branch on the tag only where quote legs must be excluded or
//! exclusively targeted.

use std::fmt;

use serde::Serialize;

use crate::errors::ExchangeError;
use crate::price::Price;

/// Unique tradable identifier. Assigned once at submission from a
/// monotonically increasing counter, so ids double as creation order.
pub type TradableId = u64;

/// Book side (buy = bids, sell = asks).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an incoming tradable matches against.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// What kind of interest a tradable represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TradableKind {
    Order,
    QuoteLeg,
}

/// Resting (or incoming) trading interest for one symbol and side.
///
/// Volume invariant: `remaining + filled + cancelled == original`, where
/// filled is derived (`original - remaining - cancelled`), reconstructable
/// from emitted fill volumes.
#[derive(Clone, Debug)]
pub struct Tradable {
    id: TradableId,
    user: String,
    product: String,
    price: Price,
    original_volume: u32,
    remaining_volume: u32,
    cancelled_volume: u32,
    side: Side,
    kind: TradableKind,
}

impl Tradable {
    pub(crate) fn new(
        id: TradableId,
        user: &str,
        product: &str,
        price: Price,
        volume: u32,
        side: Side,
        kind: TradableKind,
    ) -> Result<Self, ExchangeError> {
        if user.is_empty() {
            return Err(ExchangeError::Validation("user must not be empty".into()));
        }
        if product.is_empty() {
            return Err(ExchangeError::Validation("product must not be empty".into()));
        }
        if volume == 0 {
            return Err(ExchangeError::Validation(
                "original volume must be greater than zero".into(),
            ));
        }
        Ok(Self {
            id,
            user: user.to_string(),
            product: product.to_string(),
            price,
            original_volume: volume,
            remaining_volume: volume,
            cancelled_volume: 0,
            side,
            kind,
        })
    }

    #[inline]
    pub fn id(&self) -> TradableId {
        self.id
    }

    #[inline]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[inline]
    pub fn product(&self) -> &str {
        &self.product
    }

    #[inline]
    pub fn price(&self) -> Price {
        self.price
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn is_quote(&self) -> bool {
        self.kind == TradableKind::QuoteLeg
    }

    #[inline]
    pub fn original_volume(&self) -> u32 {
        self.original_volume
    }

    #[inline]
    pub fn remaining_volume(&self) -> u32 {
        self.remaining_volume
    }

    #[inline]
    pub fn cancelled_volume(&self) -> u32 {
        self.cancelled_volume
    }

    /// Filled volume, derived from the stored quantities.
    #[inline]
    pub fn filled_volume(&self) -> u32 {
        self.original_volume - self.remaining_volume - self.cancelled_volume
    }

    /// True once the tradable has left the live book (nothing left to fill
    /// or cancel).
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.remaining_volume == 0
    }

    /// Reduce remaining volume by a fill. Matching guarantees `qty` never
    /// exceeds the remainder.
    pub(crate) fn fill(&mut self, qty: u32) {
        debug_assert!(qty <= self.remaining_volume, "fill exceeds remaining volume");
        self.remaining_volume -= qty;
    }

    /// Move all remaining volume into cancelled volume, resolving the
    /// tradable. Called on every cancel-and-archive path.
    pub(crate) fn cancel_remainder(&mut self) {
        self.cancelled_volume += self.remaining_volume;
        self.remaining_volume = 0;
    }
}

/// Point-in-time copy of a tradable, handed across the query surface.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TradableSnapshot {
    pub id: TradableId,
    pub user: String,
    pub product: String,
    pub price: Price,
    pub original_volume: u32,
    pub remaining_volume: u32,
    pub cancelled_volume: u32,
    pub side: Side,
    pub is_quote: bool,
}

impl From<&Tradable> for TradableSnapshot {
    fn from(t: &Tradable) -> Self {
        Self {
            id: t.id,
            user: t.user.clone(),
            product: t.product.clone(),
            price: t.price,
            original_volume: t.original_volume,
            remaining_volume: t.remaining_volume,
            cancelled_volume: t.cancelled_volume,
            side: t.side,
            is_quote: t.is_quote(),
        }
    }
}

/// A request to place a single-sided order.
#[derive(Clone, Debug)]
pub struct OrderRequest {
    pub user: String,
    pub product: String,
    pub price: Price,
    pub volume: u32,
    pub side: Side,
}

/// A request to place (or replace) a two-sided quote: simultaneous buy and
/// sell interest from one user. A user has at most one live quote per symbol.
#[derive(Clone, Debug)]
pub struct QuoteRequest {
    pub user: String,
    pub product: String,
    pub buy_price: Price,
    pub buy_volume: u32,
    pub sell_price: Price,
    pub sell_volume: u32,
}
