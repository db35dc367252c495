//! Product Book - Per-symbol aggregate over both book sides.
//!
//! The only component that decides whether incoming interest attempts to
//! trade or rests untouched. Owns the tradable arena, the archive of
//! fully-resolved entries, and the last-published market snapshot used to
//! suppress duplicate current-market notifications.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::arena::{Arena, ArenaIndex};
use crate::book_side::BookSide;
use crate::errors::ExchangeError;
use crate::events::{CancelEvent, CurrentMarketEvent, EventSink, FillEvent, LastSaleEvent};
use crate::exchange::MarketState;
use crate::matching;
use crate::price::Price;
use crate::tradable::{
    OrderRequest, QuoteRequest, Side, Tradable, TradableId, TradableKind, TradableSnapshot,
};

/// Fully-resolved tradables keyed by price, spanning both sides of one
/// symbol. Answers "was this id ever on this book and is it now too late to
/// cancel?"; entries are never replayed into matching.
pub(crate) struct Archive {
    entries: FxHashMap<Price, Vec<ArenaIndex>>,
}

impl Archive {
    pub(crate) fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Move a tradable's remaining volume into cancelled volume and record
    /// the handle under its price bucket. Idempotent on volume for entries
    /// that are already fully filled.
    pub(crate) fn insert(&mut self, arena: &mut Arena, index: ArenaIndex) {
        let t = arena.get_mut(index);
        let price = t.price();
        t.cancel_remainder();
        self.entries.entry(price).or_default().push(index);
    }

    /// Scan the archive for a resolved tradable with this id.
    pub(crate) fn find(&self, arena: &Arena, id: TradableId) -> Option<ArenaIndex> {
        self.entries
            .values()
            .flat_map(|bucket| bucket.iter().copied())
            .find(|&i| arena.get(i).id() == id)
    }
}

pub struct ProductBook {
    product: String,
    buy: BookSide,
    sell: BookSide,
    arena: Arena,
    archive: Archive,
    events: Arc<dyn EventSink>,
    quote_users: FxHashSet<String>,
    last_market: Option<(Price, u32, Price, u32)>,
}

impl ProductBook {
    pub fn new(product: &str, events: Arc<dyn EventSink>) -> Self {
        Self {
            product: product.to_string(),
            buy: BookSide::new(Side::Buy),
            sell: BookSide::new(Side::Sell),
            arena: Arena::new(),
            archive: Archive::new(),
            events,
            quote_users: FxHashSet::default(),
            last_market: None,
        }
    }

    #[inline]
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Admit a single-sided order. PREOPEN accumulates it for the opening
    /// sweep; any other admitted state routes it through continuous matching.
    pub(crate) fn add_order(
        &mut self,
        req: &OrderRequest,
        id: TradableId,
        state: MarketState,
    ) -> Result<(), ExchangeError> {
        let order = Tradable::new(
            id,
            &req.user,
            &req.product,
            req.price,
            req.volume,
            req.side,
            TradableKind::Order,
        )?;
        let index = self.arena.insert(order);
        self.submit(index, state);
        self.update_current_market();
        Ok(())
    }

    /// Admit (or replace) a two-sided quote. A user has at most one live
    /// quote: an existing one is cancelled, both legs with notifications,
    /// before the new legs are submitted buy-then-sell.
    pub(crate) fn add_quote(
        &mut self,
        req: &QuoteRequest,
        buy_id: TradableId,
        sell_id: TradableId,
        state: MarketState,
    ) -> Result<(), ExchangeError> {
        let (buy_cents, sell_cents) = match (req.buy_price.cents(), req.sell_price.cents()) {
            (Some(b), Some(s)) => (b, s),
            _ => {
                return Err(ExchangeError::Validation(
                    "quote prices must be limit prices".into(),
                ))
            }
        };
        if sell_cents <= buy_cents {
            return Err(ExchangeError::Validation(
                "quote sell price must exceed buy price".into(),
            ));
        }
        if buy_cents <= 0 {
            return Err(ExchangeError::Validation(
                "quote prices must be greater than zero".into(),
            ));
        }
        let buy_leg = Tradable::new(
            buy_id,
            &req.user,
            &req.product,
            req.buy_price,
            req.buy_volume,
            Side::Buy,
            TradableKind::QuoteLeg,
        )?;
        let sell_leg = Tradable::new(
            sell_id,
            &req.user,
            &req.product,
            req.sell_price,
            req.sell_volume,
            Side::Sell,
            TradableKind::QuoteLeg,
        )?;

        if self.quote_users.contains(&req.user) {
            self.cancel_quote(&req.user);
        }
        let buy_index = self.arena.insert(buy_leg);
        let sell_index = self.arena.insert(sell_leg);
        self.submit(buy_index, state);
        self.submit(sell_index, state);
        self.quote_users.insert(req.user.clone());
        self.update_current_market();
        Ok(())
    }

    /// Cancel a live order on the named side. A miss escalates to the
    /// too-late check before surfacing "order not found."
    pub(crate) fn cancel_order(&mut self, side: Side, id: TradableId) -> Result<(), ExchangeError> {
        let cancelled = match side {
            Side::Buy => {
                self.buy
                    .cancel_order(&mut self.arena, &mut self.archive, &*self.events, id)
            }
            Side::Sell => {
                self.sell
                    .cancel_order(&mut self.arena, &mut self.archive, &*self.events, id)
            }
        };
        if cancelled {
            self.update_current_market();
            Ok(())
        } else {
            self.too_late_to_cancel(id)
        }
    }

    /// Cancel both legs of `user`'s quote. A missing leg is a no-op.
    pub(crate) fn cancel_quote(&mut self, user: &str) {
        self.buy
            .cancel_quote(&mut self.arena, &mut self.archive, &*self.events, user);
        self.sell
            .cancel_quote(&mut self.arena, &mut self.archive, &*self.events, user);
        self.quote_users.remove(user);
        self.update_current_market();
    }

    /// Resolve a cancel that missed the live book: an archived non-quote id
    /// is a benign race, reported as a successful cancellation of nothing.
    pub(crate) fn too_late_to_cancel(&self, id: TradableId) -> Result<(), ExchangeError> {
        match self.archive.find(&self.arena, id) {
            Some(index) if !self.arena.get(index).is_quote() => {
                let t = self.arena.get(index);
                self.events.publish_cancel(CancelEvent {
                    user: t.user().to_string(),
                    product: t.product().to_string(),
                    price: t.price(),
                    volume: t.remaining_volume(),
                    details: "Too late to Cancel".to_string(),
                    side: t.side(),
                    id,
                });
                Ok(())
            }
            _ => Err(ExchangeError::OrderNotFound(id)),
        }
    }

    /// Opening sweep: while the tops cross, trade the entire best buy level
    /// as a batch against the sell side in arrival order, then republish
    /// market data and the batch's last sale. Deliberately batch-per-level
    /// rather than the continuous one-order path.
    pub(crate) fn open_market(&mut self) {
        loop {
            let (Some(buy_top), Some(sell_top)) =
                (self.buy.top_of_book_price(), self.sell.top_of_book_price())
            else {
                break;
            };
            let crosses =
                buy_top.is_market() || sell_top.is_market() || buy_top.greater_or_equal(sell_top);
            if !crosses {
                break;
            }
            debug!(product = %self.product, %buy_top, %sell_top, "opening sweep iteration");

            let batch: Vec<ArenaIndex> = self
                .buy
                .entries_at(buy_top)
                .map(|level| level.entries().to_vec())
                .unwrap_or_default();
            let mut batch_fills = Vec::new();
            for index in batch {
                let fills = self.sell.try_trade(&mut self.arena, &mut self.archive, index);
                matching::merge_all(&mut batch_fills, fills);
                if self.arena.get(index).remaining_volume() == 0 {
                    self.buy.remove_entry(&self.arena, index);
                    self.archive.insert(&mut self.arena, index);
                }
            }
            for fill in &batch_fills {
                self.events.publish_fill(fill.clone());
            }
            self.update_current_market();
            if let (Some(price), Some(volume)) = (
                last_sale_price(&batch_fills),
                last_sale_volume(&batch_fills),
            ) {
                self.events.publish_last_sale(LastSaleEvent {
                    product: self.product.clone(),
                    price,
                    volume,
                });
            }
        }
    }

    /// Close-of-market liquidation: cancel every live entry on both sides,
    /// then republish the (now empty) market.
    pub(crate) fn close_market(&mut self) {
        self.buy
            .cancel_all(&mut self.arena, &mut self.archive, &*self.events);
        self.sell
            .cancel_all(&mut self.arena, &mut self.archive, &*self.events);
        self.quote_users.clear();
        self.update_current_market();
    }

    /// Best-bid/best-ask snapshot. An empty side reports the zero price with
    /// zero volume.
    pub fn market_data(&self) -> CurrentMarketEvent {
        CurrentMarketEvent {
            product: self.product.clone(),
            buy_price: self.buy.top_of_book_price().unwrap_or_else(Price::zero),
            buy_volume: self.buy.top_of_book_volume(&self.arena),
            sell_price: self.sell.top_of_book_price().unwrap_or_else(Price::zero),
            sell_volume: self.sell.top_of_book_volume(&self.arena),
        }
    }

    /// Depth per side as "price x volume" lines, buy side first.
    pub fn book_depth(&self) -> [Vec<String>; 2] {
        [
            self.buy.book_depth(&self.arena),
            self.sell.book_depth(&self.arena),
        ]
    }

    /// Live non-quote orders with remaining volume for one user, buy side
    /// first.
    pub fn orders_with_remaining_qty(&self, user: &str) -> Vec<TradableSnapshot> {
        let mut result = self.buy.orders_with_remaining_qty(&self.arena, user);
        result.extend(self.sell.orders_with_remaining_qty(&self.arena, user));
        result
    }

    /// Route one admitted tradable. PREOPEN rests it directly; otherwise it
    /// is offered to the opposite side, fills are published with a derived
    /// last sale, and an unfilled remainder either rests (limit) or is
    /// cancelled and archived (market).
    fn submit(&mut self, index: ArenaIndex, state: MarketState) {
        let side = self.arena.get(index).side();
        if state == MarketState::Preopen {
            match side {
                Side::Buy => self.buy.add(&self.arena, index),
                Side::Sell => self.sell.add(&self.arena, index),
            }
            return;
        }

        let fills = match side {
            Side::Buy => self.sell.try_trade(&mut self.arena, &mut self.archive, index),
            Side::Sell => self.buy.try_trade(&mut self.arena, &mut self.archive, index),
        };
        for fill in &fills {
            self.events.publish_fill(fill.clone());
        }
        if !fills.is_empty() {
            self.update_current_market();
            let t = self.arena.get(index);
            let traded = t.original_volume() - t.remaining_volume();
            if let Some(price) = last_sale_price(&fills) {
                self.events.publish_last_sale(LastSaleEvent {
                    product: self.product.clone(),
                    price,
                    volume: traded,
                });
            }
        }

        let t = self.arena.get(index);
        let remaining = t.remaining_volume();
        if remaining == 0 {
            self.archive.insert(&mut self.arena, index);
        } else if t.price().is_market() {
            // Market orders never rest.
            self.events.publish_cancel(CancelEvent {
                user: t.user().to_string(),
                product: t.product().to_string(),
                price: t.price(),
                volume: remaining,
                details: "Cancelled".to_string(),
                side: t.side(),
                id: t.id(),
            });
            self.archive.insert(&mut self.arena, index);
        } else {
            match side {
                Side::Buy => self.buy.add(&self.arena, index),
                Side::Sell => self.sell.add(&self.arena, index),
            }
        }
    }

    /// Publish a current-market notification if top-of-book price or volume
    /// changed on either side since the last published snapshot.
    fn update_current_market(&mut self) {
        let snapshot = (
            self.buy.top_of_book_price().unwrap_or_else(Price::zero),
            self.buy.top_of_book_volume(&self.arena),
            self.sell.top_of_book_price().unwrap_or_else(Price::zero),
            self.sell.top_of_book_volume(&self.arena),
        );
        if self.last_market != Some(snapshot) {
            let (buy_price, buy_volume, sell_price, sell_volume) = snapshot;
            self.events.publish_current_market(CurrentMarketEvent {
                product: self.product.clone(),
                buy_price,
                buy_volume,
                sell_price,
                sell_volume,
            });
            self.last_market = Some(snapshot);
        }
    }
}

/// Sort fill records ascending by execution price; if the cheapest record is
/// buy-side take its price, otherwise take the most expensive record's.
fn last_sale_price(fills: &[FillEvent]) -> Option<Price> {
    let sorted = sorted_by_price(fills);
    let first = sorted.first()?;
    if first.side == Side::Buy {
        Some(first.price)
    } else {
        sorted.last().map(|f| f.price)
    }
}

/// Same selection rule as [`last_sale_price`], applied to volume. Used by
/// the opening sweep, where no single incoming order defines the traded
/// quantity.
fn last_sale_volume(fills: &[FillEvent]) -> Option<u32> {
    let sorted = sorted_by_price(fills);
    let first = sorted.first()?;
    if first.side == Side::Buy {
        Some(first.volume)
    } else {
        sorted.last().map(|f| f.volume)
    }
}

fn sorted_by_price(fills: &[FillEvent]) -> Vec<&FillEvent> {
    let mut sorted: Vec<&FillEvent> = fills.iter().collect();
    sorted.sort_by_key(|f| f.price.cents().unwrap_or(i64::MAX));
    sorted
}
