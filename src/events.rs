//! Notification boundary for market activity.
//!
//! The engine hands fills, cancels, last sales, current-market snapshots and
//! market-state changes to an [`EventSink`] synchronously within the call
//! that produced them. Delivery is fire-and-forget: a sink cannot fail the
//! triggering book operation. Fan-out to actual subscribers lives behind
//! this trait, outside the engine.

use std::sync::Mutex;

use serde::Serialize;

use crate::exchange::MarketState;
use crate::price::Price;
use crate::tradable::{Side, TradableId};

/// A fill (trade execution) attributed to one counterparty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FillEvent {
    pub user: String,
    pub product: String,
    /// Execution price: the resting entry's limit, or the incoming price
    /// when the resting entry is market-priced.
    pub price: Price,
    pub volume: u32,
    /// Human-readable remainder annotation, e.g. "leaving 50".
    pub details: String,
    pub side: Side,
    pub id: TradableId,
}

/// A cancellation of an order or quote leg.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CancelEvent {
    pub user: String,
    pub product: String,
    pub price: Price,
    /// Volume removed from the book; zero for a too-late cancel.
    pub volume: u32,
    pub details: String,
    pub side: Side,
    pub id: TradableId,
}

/// The most recent trade print for a symbol.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LastSaleEvent {
    pub product: String,
    pub price: Price,
    pub volume: u32,
}

/// Top-of-book snapshot for both sides of a symbol. An empty side is
/// published as the zero price with zero volume.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurrentMarketEvent {
    pub product: String,
    pub buy_price: Price,
    pub buy_volume: u32,
    pub sell_price: Price,
    pub sell_volume: u32,
}

/// Receiver for engine notifications.
pub trait EventSink: Send + Sync {
    fn publish_fill(&self, event: FillEvent);
    fn publish_cancel(&self, event: CancelEvent);
    fn publish_last_sale(&self, event: LastSaleEvent);
    fn publish_current_market(&self, event: CurrentMarketEvent);
    fn publish_market_state(&self, state: MarketState);
}

/// Sink that drops every notification.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish_fill(&self, _event: FillEvent) {}
    fn publish_cancel(&self, _event: CancelEvent) {}
    fn publish_last_sale(&self, _event: LastSaleEvent) {}
    fn publish_current_market(&self, _event: CurrentMarketEvent) {}
    fn publish_market_state(&self, _state: MarketState) {}
}

/// Every notification kind, in publication order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Event {
    Fill(FillEvent),
    Cancel(CancelEvent),
    LastSale(LastSaleEvent),
    CurrentMarket(CurrentMarketEvent),
    MarketState(MarketState),
}

/// Sink that records every notification, for tests and harnesses.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Drain and return recorded events.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn fills(&self) -> Vec<FillEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Fill(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn cancels(&self) -> Vec<CancelEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Cancel(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn last_sales(&self) -> Vec<LastSaleEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::LastSale(ls) => Some(ls),
                _ => None,
            })
            .collect()
    }

    pub fn current_markets(&self) -> Vec<CurrentMarketEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::CurrentMarket(cm) => Some(cm),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
    }
}

impl EventSink for EventLog {
    fn publish_fill(&self, event: FillEvent) {
        self.push(Event::Fill(event));
    }

    fn publish_cancel(&self, event: CancelEvent) {
        self.push(Event::Cancel(event));
    }

    fn publish_last_sale(&self, event: LastSaleEvent) {
        self.push(Event::LastSale(event));
    }

    fn publish_current_market(&self, event: CurrentMarketEvent) {
        self.push(Event::CurrentMarket(event));
    }

    fn publish_market_state(&self, state: MarketState) {
        self.push(Event::MarketState(state));
    }
}
