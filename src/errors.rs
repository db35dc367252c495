//! Error taxonomy for the exchange.
//!
//! Every outcome here is local and synchronous: a rejected operation leaves
//! all book invariants intact and nothing is retried internally. Benign
//! outcomes (too-late cancel, cancelling a missing quote) are successes and
//! deliberately absent from this enum.

use thiserror::Error;

use crate::exchange::MarketState;

/// Failure while constructing or combining prices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("cannot parse price from {0:?}")]
    Parse(String),
    #[error("arithmetic on a market price is undefined")]
    MarketOperand,
}

/// Failure surfaced by an exchange operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Malformed input (empty symbol/user, non-positive volume, sell <= buy
    /// on a quote). Rejected before any state change.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Submission or cancellation while the venue is CLOSED.
    #[error("market is CLOSED")]
    MarketClosed,

    /// Market-priced orders cannot be accepted while PREOPEN: there is no
    /// matching to consume them and they never rest.
    #[error("market orders cannot be submitted while PREOPEN")]
    MarketOrderInPreopen,

    /// Requested market-state transition is not in the legality table.
    #[error("invalid market state transition: {from} -> {to}")]
    InvalidTransition { from: MarketState, to: MarketState },

    #[error("no such product: {0}")]
    NoSuchProduct(String),

    #[error("product already exists: {0}")]
    ProductAlreadyExists(String),

    /// Order id unknown on the addressed side and absent from the archive.
    #[error("order not found: {0}")]
    OrderNotFound(u64),

    #[error(transparent)]
    Price(#[from] PriceError),
}
