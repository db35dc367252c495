//! Exchange - Venue-wide facade and market-state machine.
//!
//! Owns the symbol registry and the single market-state value, gates every
//! submission and cancellation through the current state, and fans state
//! transitions out to every product book. One mutex guards the registry
//! (symbol map + state); each book has its own. Gated operations hand over
//! from the registry lock to the addressed book's lock before releasing the
//! registry, and a state transition holds the registry lock across its full
//! fan-out, so transitions appear atomic to outside observers and the state
//! read at the gate is the state the book operation runs under.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::ExchangeError;
use crate::events::{CurrentMarketEvent, EventSink};
use crate::product_book::ProductBook;
use crate::tradable::{OrderRequest, QuoteRequest, Side, TradableId, TradableSnapshot};

/// Venue-wide trading phase. Global, not per symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum MarketState {
    Closed,
    Preopen,
    Open,
}

impl MarketState {
    /// Transition legality. Re-asserting the current state is illegal, as
    /// is skipping PREOPEN in either direction.
    pub fn can_transition_to(self, next: MarketState) -> bool {
        matches!(
            (self, next),
            (MarketState::Closed, MarketState::Preopen)
                | (MarketState::Preopen, MarketState::Open)
                | (MarketState::Open, MarketState::Preopen)
                | (MarketState::Open, MarketState::Closed)
        )
    }
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketState::Closed => write!(f, "CLOSED"),
            MarketState::Preopen => write!(f, "PREOPEN"),
            MarketState::Open => write!(f, "OPEN"),
        }
    }
}

struct Registry {
    state: MarketState,
    books: FxHashMap<String, Arc<Mutex<ProductBook>>>,
}

/// The engine's entry point. Construct one per process (or one per test);
/// callers on independent threads share it by reference.
pub struct Exchange {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
    events: Arc<dyn EventSink>,
}

impl Exchange {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self {
            registry: Mutex::new(Registry {
                state: MarketState::Closed,
                books: FxHashMap::default(),
            }),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    /// Register a new symbol. Symbols are created once, never removed.
    pub fn create_product(&self, symbol: &str) -> Result<(), ExchangeError> {
        if symbol.is_empty() {
            return Err(ExchangeError::Validation("symbol must not be empty".into()));
        }
        let mut registry = self.lock_registry();
        if registry.books.contains_key(symbol) {
            return Err(ExchangeError::ProductAlreadyExists(symbol.to_string()));
        }
        registry.books.insert(
            symbol.to_string(),
            Arc::new(Mutex::new(ProductBook::new(symbol, self.events.clone()))),
        );
        debug!(%symbol, "product registered");
        Ok(())
    }

    pub fn market_state(&self) -> MarketState {
        self.lock_registry().state
    }

    /// Validated state transition. On success the new state is published
    /// venue-wide, then entering OPEN sweeps every book and entering CLOSED
    /// liquidates every book. The registry lock is held across the full
    /// fan-out.
    pub fn set_market_state(&self, next: MarketState) -> Result<(), ExchangeError> {
        let mut registry = self.lock_registry();
        let current = registry.state;
        if !current.can_transition_to(next) {
            return Err(ExchangeError::InvalidTransition {
                from: current,
                to: next,
            });
        }
        registry.state = next;
        info!(from = %current, to = %next, "market state transition");
        self.events.publish_market_state(next);
        match next {
            MarketState::Open => {
                for book in registry.books.values() {
                    lock_book(book).open_market();
                }
            }
            MarketState::Closed => {
                for book in registry.books.values() {
                    lock_book(book).close_market();
                }
            }
            MarketState::Preopen => {}
        }
        Ok(())
    }

    /// Submit a single-sided order, returning its assigned id.
    ///
    /// The book lock is acquired before the registry guard is released, so
    /// the state read under the gate is still the state the book sees: a
    /// transition cannot slip between the gate and the book operation.
    pub fn submit_order(&self, req: &OrderRequest) -> Result<TradableId, ExchangeError> {
        let registry = self.lock_registry();
        match registry.state {
            MarketState::Closed => return Err(ExchangeError::MarketClosed),
            MarketState::Preopen if req.price.is_market() => {
                return Err(ExchangeError::MarketOrderInPreopen)
            }
            _ => {}
        }
        let state = registry.state;
        let book = self.book(&registry, &req.product)?;
        let mut guard = lock_book(&book);
        drop(registry);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        guard.add_order(req, id, state)?;
        Ok(id)
    }

    /// Submit (or replace) a two-sided quote, returning the (buy, sell) leg
    /// ids.
    pub fn submit_quote(
        &self,
        req: &QuoteRequest,
    ) -> Result<(TradableId, TradableId), ExchangeError> {
        let registry = self.lock_registry();
        if registry.state == MarketState::Closed {
            return Err(ExchangeError::MarketClosed);
        }
        let state = registry.state;
        let book = self.book(&registry, &req.product)?;
        let mut guard = lock_book(&book);
        drop(registry);
        let buy_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let sell_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        guard.add_quote(req, buy_id, sell_id, state)?;
        Ok((buy_id, sell_id))
    }

    /// Cancel a live order. A fully-resolved id is a benign race, reported
    /// through the sink as "Too late to Cancel" rather than an error.
    pub fn cancel_order(
        &self,
        product: &str,
        side: Side,
        id: TradableId,
    ) -> Result<(), ExchangeError> {
        let registry = self.lock_registry();
        if registry.state == MarketState::Closed {
            return Err(ExchangeError::MarketClosed);
        }
        let book = self.book(&registry, product)?;
        let mut guard = lock_book(&book);
        drop(registry);
        guard.cancel_order(side, id)
    }

    /// Cancel both legs of `user`'s quote. Holding no quote is a no-op.
    pub fn cancel_quote(&self, product: &str, user: &str) -> Result<(), ExchangeError> {
        let registry = self.lock_registry();
        if registry.state == MarketState::Closed {
            return Err(ExchangeError::MarketClosed);
        }
        let book = self.book(&registry, product)?;
        let mut guard = lock_book(&book);
        drop(registry);
        guard.cancel_quote(user);
        Ok(())
    }

    /// Best-bid/best-ask snapshot for one symbol.
    pub fn market_data(&self, product: &str) -> Result<CurrentMarketEvent, ExchangeError> {
        let book = self.book(&self.lock_registry(), product)?;
        let data = lock_book(&book).market_data();
        Ok(data)
    }

    /// Depth per side as "price x volume" lines, buy side first.
    pub fn book_depth(&self, product: &str) -> Result<[Vec<String>; 2], ExchangeError> {
        let book = self.book(&self.lock_registry(), product)?;
        let depth = lock_book(&book).book_depth();
        Ok(depth)
    }

    /// Registered symbols, sorted.
    pub fn product_list(&self) -> Vec<String> {
        let registry = self.lock_registry();
        let mut products: Vec<String> = registry.books.keys().cloned().collect();
        products.sort();
        products
    }

    /// Live orders with remaining volume for one user in one symbol.
    pub fn orders_with_remaining_qty(
        &self,
        product: &str,
        user: &str,
    ) -> Result<Vec<TradableSnapshot>, ExchangeError> {
        let book = self.book(&self.lock_registry(), product)?;
        let orders = lock_book(&book).orders_with_remaining_qty(user);
        Ok(orders)
    }

    fn book(
        &self,
        registry: &Registry,
        product: &str,
    ) -> Result<Arc<Mutex<ProductBook>>, ExchangeError> {
        registry
            .books
            .get(product)
            .cloned()
            .ok_or_else(|| ExchangeError::NoSuchProduct(product.to_string()))
    }

    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn lock_book(book: &Arc<Mutex<ProductBook>>) -> MutexGuard<'_, ProductBook> {
    book.lock().unwrap_or_else(|e| e.into_inner())
}
