//! # Matchbook
//!
//! A single-venue, price-time-priority matching engine for a simulated
//! securities exchange, callable as an in-process library.
//!
//! ## Design Principles
//!
//! - **Arena-Backed**: Price levels, id maps, and the archive hold 32-bit
//!   handles into one slab per symbol; a tradable is mutated in place and
//!   every view stays consistent
//! - **Per-Symbol Locking**: Each product book is an independently lockable
//!   aggregate; operations on different symbols never contend
//! - **Honest Cancel Races**: A cancel that loses to a concurrent fill gets
//!   "too late to cancel" from the archive, not a lock or a lie
//!
//! ## Architecture
//!
//! ```text
//! [Callers] --> [Exchange (state gate)] --> [ProductBook (per symbol)]
//!                                                  |
//!                                      [BookSide] -+- [BookSide]
//!                                                  |
//!                                            [EventSink]
//! ```

pub mod arena;
pub mod book_side;
pub mod errors;
pub mod events;
pub mod exchange;
pub mod matching;
pub mod price;
pub mod price_level;
pub mod product_book;
pub mod tradable;

// Re-exports for convenience
pub use arena::{Arena, ArenaIndex};
pub use book_side::{BookSide, EMPTY_DEPTH};
pub use errors::{ExchangeError, PriceError};
pub use events::{
    CancelEvent, CurrentMarketEvent, Event, EventLog, EventSink, FillEvent, LastSaleEvent,
    NullSink,
};
pub use exchange::{Exchange, MarketState};
pub use price::Price;
pub use price_level::PriceLevel;
pub use product_book::ProductBook;
pub use tradable::{
    OrderRequest, QuoteRequest, Side, Tradable, TradableId, TradableKind, TradableSnapshot,
};
