//! Book Side - One side (buy or sell) of a symbol's book.
//!
//! Owns the price -> level index and the id -> handle map for its side, and
//! drives the matching loop for incoming interest. Cross-side decisions
//! (whether an incoming tradable attempts to trade at all) belong to the
//! product book; this type never inspects the opposite side.

use rustc_hash::FxHashMap;

use crate::arena::{Arena, ArenaIndex};
use crate::events::{CancelEvent, EventSink, FillEvent};
use crate::matching;
use crate::price::Price;
use crate::price_level::PriceLevel;
use crate::product_book::Archive;
use crate::tradable::{Side, TradableId, TradableSnapshot};

/// Marker emitted by the book-depth query for a side with no resting levels.
pub const EMPTY_DEPTH: &str = "<Empty>";

pub struct BookSide {
    side: Side,
    entries: FxHashMap<Price, PriceLevel>,
    id_map: FxHashMap<TradableId, ArenaIndex>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            entries: FxHashMap::default(),
            id_map: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a tradable into the level for its price, creating the level if
    /// absent. Crossing against the opposite side is the caller's concern.
    pub(crate) fn add(&mut self, arena: &Arena, index: ArenaIndex) {
        let t = arena.get(index);
        self.entries.entry(t.price()).or_default().push_back(index);
        self.id_map.insert(t.id(), index);
    }

    /// Best resting price by this side's ordering rule: a market-price level
    /// is always best, otherwise max for buy and min for sell.
    pub fn top_of_book_price(&self) -> Option<Price> {
        if self.entries.is_empty() {
            return None;
        }
        if self.entries.contains_key(&Price::Market) {
            return Some(Price::Market);
        }
        let cents = self.entries.keys().filter_map(|p| p.cents());
        let best = match self.side {
            Side::Buy => cents.max(),
            Side::Sell => cents.min(),
        };
        best.map(Price::from_cents)
    }

    /// Sum of remaining volume at the best price, zero when empty.
    pub fn top_of_book_volume(&self, arena: &Arena) -> u32 {
        self.top_of_book_price()
            .and_then(|p| self.entries.get(&p))
            .map(|level| level.remaining_volume(arena))
            .unwrap_or(0)
    }

    pub(crate) fn entries_at(&self, price: Price) -> Option<&PriceLevel> {
        self.entries.get(&price)
    }

    /// Remove a live entry from its level and the id map. Drops the level
    /// when it empties.
    pub(crate) fn remove_entry(&mut self, arena: &Arena, index: ArenaIndex) {
        let t = arena.get(index);
        let price = t.price();
        if let Some(level) = self.entries.get_mut(&price) {
            level.remove(index);
        }
        self.id_map.remove(&t.id());
        self.clear_if_empty(price);
    }

    /// Drop the level at `price` if it has emptied.
    pub(crate) fn clear_if_empty(&mut self, price: Price) {
        if self.entries.get(&price).is_some_and(|l| l.is_empty()) {
            self.entries.remove(&price);
        }
    }

    /// Repeatedly invoke the matching step while the incoming tradable has
    /// remaining volume, this side is non-empty, and the incoming price
    /// crosses top of book (market on either end always crosses). Returns
    /// fills merged by counterparty id + execution price.
    pub(crate) fn try_trade(
        &mut self,
        arena: &mut Arena,
        archive: &mut Archive,
        incoming: ArenaIndex,
    ) -> Vec<FillEvent> {
        let mut fills = Vec::new();
        loop {
            let t = arena.get(incoming);
            if t.remaining_volume() == 0 {
                break;
            }
            let top = match self.top_of_book_price() {
                Some(p) => p,
                None => break,
            };
            let crosses = t.price().is_market()
                || top.is_market()
                || match self.side {
                    // Incoming sell matches the buy side: willing to accept <= best bid.
                    Side::Buy => t.price().less_or_equal(top),
                    // Incoming buy matches the sell side: willing to pay >= best offer.
                    Side::Sell => t.price().greater_or_equal(top),
                };
            if !crosses {
                break;
            }
            matching::match_at_top(self, arena, archive, incoming, &mut fills);
        }
        fills
    }

    /// Cancel the live non-quote order with this id. Returns false when no
    /// such live order exists on this side (the caller escalates to the
    /// too-late check).
    pub(crate) fn cancel_order(
        &mut self,
        arena: &mut Arena,
        archive: &mut Archive,
        events: &dyn EventSink,
        id: TradableId,
    ) -> bool {
        let index = match self.id_map.get(&id) {
            Some(&index) if !arena.get(index).is_quote() => index,
            _ => return false,
        };
        self.remove_entry(arena, index);
        let t = arena.get(index);
        events.publish_cancel(CancelEvent {
            user: t.user().to_string(),
            product: t.product().to_string(),
            price: t.price(),
            volume: t.remaining_volume(),
            details: format!("{} Order Cancelled", t.side()),
            side: t.side(),
            id,
        });
        archive.insert(arena, index);
        true
    }

    /// Cancel the quote leg owned by `user` on this side. Absence is a
    /// benign no-op, not an error.
    pub(crate) fn cancel_quote(
        &mut self,
        arena: &mut Arena,
        archive: &mut Archive,
        events: &dyn EventSink,
        user: &str,
    ) {
        let found = self.entries.values().flat_map(|l| l.entries()).copied().find(|&i| {
            let t = arena.get(i);
            t.is_quote() && t.user() == user
        });
        if let Some(index) = found {
            self.remove_entry(arena, index);
            let t = arena.get(index);
            events.publish_cancel(CancelEvent {
                user: t.user().to_string(),
                product: t.product().to_string(),
                price: t.price(),
                volume: t.remaining_volume(),
                details: format!("Quote {}-Side Cancelled", t.side()),
                side: t.side(),
                id: t.id(),
            });
            archive.insert(arena, index);
        }
    }

    /// Drain every level, routing each live entry through the same
    /// cancel-and-archive paths as single cancellation. Entries are taken
    /// one at a time so removal mutating the level index mid-drain is safe.
    pub(crate) fn cancel_all(
        &mut self,
        arena: &mut Arena,
        archive: &mut Archive,
        events: &dyn EventSink,
    ) {
        loop {
            let next = self
                .entries
                .values()
                .find_map(|level| level.front());
            let Some(index) = next else { break };
            let t = arena.get(index);
            if t.is_quote() {
                let user = t.user().to_string();
                self.cancel_quote(arena, archive, events, &user);
            } else {
                let id = t.id();
                self.cancel_order(arena, archive, events, id);
            }
        }
    }

    /// Snapshots of this side's live non-quote orders with remaining volume
    /// for one user.
    pub fn orders_with_remaining_qty(&self, arena: &Arena, user: &str) -> Vec<TradableSnapshot> {
        let mut result = Vec::new();
        for price in self.sorted_prices() {
            if let Some(level) = self.entries.get(&price) {
                for &index in level.entries() {
                    let t = arena.get(index);
                    if !t.is_quote() && t.remaining_volume() > 0 && t.user() == user {
                        result.push(TradableSnapshot::from(t));
                    }
                }
            }
        }
        result
    }

    /// "price x volume" per level, best to worst, or the explicit empty
    /// marker.
    pub fn book_depth(&self, arena: &Arena) -> Vec<String> {
        if self.entries.is_empty() {
            return vec![EMPTY_DEPTH.to_string()];
        }
        self.sorted_prices()
            .into_iter()
            .filter_map(|price| {
                self.entries
                    .get(&price)
                    .map(|level| format!("{} x {}", price, level.remaining_volume(arena)))
            })
            .collect()
    }

    /// Resting prices best to worst: market first, then by the side's
    /// ordering rule.
    fn sorted_prices(&self) -> Vec<Price> {
        let mut prices: Vec<Price> = self.entries.keys().copied().collect();
        let side = self.side;
        prices.sort_by_key(|p| match p.cents() {
            None => i64::MIN,
            Some(c) => match side {
                Side::Buy => -c,
                Side::Sell => c,
            },
        });
        prices
    }
}
