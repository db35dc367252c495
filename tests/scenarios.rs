//! End-to-end scenarios driven through the exchange facade, observing the
//! engine only through its published events and query surface.

use std::sync::Arc;

use matchbook::{
    Event, EventLog, Exchange, ExchangeError, MarketState, OrderRequest, Price, QuoteRequest,
    Side, EMPTY_DEPTH,
};

fn setup_open() -> (Arc<EventLog>, Exchange) {
    let log = Arc::new(EventLog::new());
    let exchange = Exchange::new(log.clone());
    exchange.create_product("IBM").unwrap();
    exchange.set_market_state(MarketState::Preopen).unwrap();
    exchange.set_market_state(MarketState::Open).unwrap();
    log.take();
    (log, exchange)
}

fn order(user: &str, price: Price, volume: u32, side: Side) -> OrderRequest {
    OrderRequest {
        user: user.to_string(),
        product: "IBM".to_string(),
        price,
        volume,
        side,
    }
}

#[test]
fn scenario_limit_cross_leaves_buy_remainder() {
    let (log, exchange) = setup_open();
    exchange
        .submit_order(&order("ANN", Price::from_cents(1000), 100, Side::Buy))
        .unwrap();
    exchange
        .submit_order(&order("REX", Price::from_cents(1000), 50, Side::Sell))
        .unwrap();

    let fills = log.fills();
    assert_eq!(fills.len(), 2);
    assert!(fills
        .iter()
        .all(|f| f.price == Price::from_cents(1000) && f.volume == 50));
    let buy_fill = fills.iter().find(|f| f.side == Side::Buy).unwrap();
    assert_eq!(buy_fill.details, "leaving 50");
    let sell_fill = fills.iter().find(|f| f.side == Side::Sell).unwrap();
    assert_eq!(sell_fill.details, "leaving 0");

    let market = exchange.market_data("IBM").unwrap();
    assert_eq!(market.buy_price, Price::from_cents(1000));
    assert_eq!(market.buy_volume, 50);
    assert_eq!(market.sell_volume, 0);
}

#[test]
fn scenario_preopen_accumulates_then_opening_sweep() {
    let log = Arc::new(EventLog::new());
    let exchange = Exchange::new(log.clone());
    exchange.create_product("IBM").unwrap();
    exchange.set_market_state(MarketState::Preopen).unwrap();

    exchange
        .submit_order(&order("ANN", Price::from_cents(1000), 100, Side::Buy))
        .unwrap();
    exchange
        .submit_order(&order("REX", Price::from_cents(900), 50, Side::Sell))
        .unwrap();
    assert!(log.fills().is_empty());
    let depth = exchange.book_depth("IBM").unwrap();
    assert_eq!(depth[0], vec!["$10.00 x 100"]);
    assert_eq!(depth[1], vec!["$9.00 x 50"]);

    exchange.set_market_state(MarketState::Open).unwrap();

    // The resting sell's limit sets the print.
    let fills = log.fills();
    assert_eq!(fills.len(), 2);
    assert!(fills.iter().all(|f| f.price == Price::from_cents(900)));

    let last_sales = log.last_sales();
    assert_eq!(last_sales.len(), 1);
    assert_eq!(last_sales[0].price, Price::from_cents(900));
    assert_eq!(last_sales[0].volume, 50);

    let market = exchange.market_data("IBM").unwrap();
    assert_eq!(market.buy_volume, 50);
    assert_eq!(market.sell_volume, 0);
}

#[test]
fn scenario_market_buy_sweeps_and_remainder_is_cancelled() {
    let (log, exchange) = setup_open();
    exchange
        .submit_order(&order("ANN", Price::from_cents(1000), 100, Side::Sell))
        .unwrap();
    exchange
        .submit_order(&order("BOB", Price::from_cents(1005), 200, Side::Sell))
        .unwrap();
    let id = exchange
        .submit_order(&order("REX", Price::Market, 1000, Side::Buy))
        .unwrap();

    let incoming: Vec<_> = log.fills().into_iter().filter(|f| f.id == id).collect();
    assert_eq!(incoming.len(), 2);
    assert_eq!((incoming[0].price, incoming[0].volume), (Price::from_cents(1000), 100));
    assert_eq!((incoming[1].price, incoming[1].volume), (Price::from_cents(1005), 200));

    let cancels = log.cancels();
    assert_eq!(cancels.len(), 1);
    assert_eq!(cancels[0].id, id);
    assert_eq!(cancels[0].volume, 700);
    assert_eq!(cancels[0].details, "Cancelled");

    // No resting buy entry was created.
    assert_eq!(exchange.book_depth("IBM").unwrap()[0], vec![EMPTY_DEPTH.to_string()]);
}

#[test]
fn scenario_cancel_after_fill_is_too_late_not_missing() {
    let (log, exchange) = setup_open();
    let resting = exchange
        .submit_order(&order("ANN", Price::from_cents(1000), 50, Side::Sell))
        .unwrap();
    exchange
        .submit_order(&order("REX", Price::from_cents(1000), 50, Side::Buy))
        .unwrap();

    exchange.cancel_order("IBM", Side::Sell, resting).unwrap();

    let cancels = log.cancels();
    assert_eq!(cancels.len(), 1);
    assert_eq!(cancels[0].details, "Too late to Cancel");
    assert_eq!(cancels[0].volume, 0);

    // An id that never existed is a genuine lookup failure.
    assert!(matches!(
        exchange.cancel_order("IBM", Side::Sell, 9999),
        Err(ExchangeError::OrderNotFound(9999))
    ));
}

#[test]
fn scenario_quote_replace_cancels_prior_legs_first() {
    let (log, exchange) = setup_open();
    let quote = QuoteRequest {
        user: "ANN".to_string(),
        product: "IBM".to_string(),
        buy_price: Price::from_cents(995),
        buy_volume: 100,
        sell_price: Price::from_cents(1005),
        sell_volume: 100,
    };
    let (first_buy, first_sell) = exchange.submit_quote(&quote).unwrap();

    let replacement = QuoteRequest {
        buy_price: Price::from_cents(996),
        sell_price: Price::from_cents(1004),
        ..quote
    };
    exchange.submit_quote(&replacement).unwrap();

    let cancels = log.cancels();
    assert_eq!(cancels.len(), 2);
    assert_eq!(cancels[0].id, first_buy);
    assert_eq!(cancels[0].details, "Quote BUY-Side Cancelled");
    assert_eq!(cancels[1].id, first_sell);
    assert_eq!(cancels[1].details, "Quote SELL-Side Cancelled");

    let market = exchange.market_data("IBM").unwrap();
    assert_eq!(market.buy_price, Price::from_cents(996));
    assert_eq!(market.sell_price, Price::from_cents(1004));
}

#[test]
fn scenario_halt_and_reopen_uncrosses_accumulated_interest() {
    let (log, exchange) = setup_open();
    exchange
        .submit_order(&order("ANN", Price::from_cents(1000), 100, Side::Buy))
        .unwrap();

    // Trading halt: back to PREOPEN. Resting interest survives the halt.
    exchange.set_market_state(MarketState::Preopen).unwrap();
    assert_eq!(exchange.market_state(), MarketState::Preopen);
    let market = exchange.market_data("IBM").unwrap();
    assert_eq!(market.buy_price, Price::from_cents(1000));
    assert_eq!(market.buy_volume, 100);

    // Crossed interest accumulates without matching while halted.
    exchange
        .submit_order(&order("REX", Price::from_cents(950), 60, Side::Sell))
        .unwrap();
    assert!(log.fills().is_empty());
    assert_eq!(exchange.book_depth("IBM").unwrap()[1], vec!["$9.50 x 60"]);

    // Re-opening sweeps the crossed book again.
    exchange.set_market_state(MarketState::Open).unwrap();

    let fills = log.fills();
    assert_eq!(fills.len(), 2);
    assert!(fills.iter().all(|f| f.price == Price::from_cents(950) && f.volume == 60));

    let last_sales = log.last_sales();
    assert_eq!(last_sales.len(), 1);
    assert_eq!(last_sales[0].volume, 60);

    let market = exchange.market_data("IBM").unwrap();
    assert_eq!(market.buy_volume, 40);
    assert_eq!(market.sell_volume, 0);
}

#[test]
fn fifo_fairness_within_a_level() {
    let (log, exchange) = setup_open();
    let first = exchange
        .submit_order(&order("ANN", Price::from_cents(1000), 60, Side::Sell))
        .unwrap();
    let second = exchange
        .submit_order(&order("BOB", Price::from_cents(1000), 60, Side::Sell))
        .unwrap();
    exchange
        .submit_order(&order("REX", Price::from_cents(1000), 80, Side::Buy))
        .unwrap();

    let fills = log.fills();
    let first_fill = fills.iter().find(|f| f.id == first).unwrap();
    assert_eq!(first_fill.volume, 60);
    let second_fill = fills.iter().find(|f| f.id == second).unwrap();
    assert_eq!(second_fill.volume, 20);
    assert_eq!(second_fill.details, "leaving 40");
}

#[test]
fn emptied_level_never_reappears_at_top() {
    let (_log, exchange) = setup_open();
    let id = exchange
        .submit_order(&order("ANN", Price::from_cents(1000), 100, Side::Buy))
        .unwrap();
    exchange
        .submit_order(&order("BOB", Price::from_cents(995), 50, Side::Buy))
        .unwrap();

    exchange.cancel_order("IBM", Side::Buy, id).unwrap();
    let market = exchange.market_data("IBM").unwrap();
    assert_eq!(market.buy_price, Price::from_cents(995));
    assert_eq!(market.buy_volume, 50);
}

#[test]
fn volume_conservation_across_mixed_flow() {
    let (log, exchange) = setup_open();
    let mut originals = Vec::new();
    for (user, cents, volume, side) in [
        ("ANN", 1000, 100, Side::Buy),
        ("BOB", 1005, 80, Side::Sell),
        ("CAL", 1005, 120, Side::Buy),
        ("DEE", 995, 40, Side::Sell),
        ("EVE", 990, 30, Side::Buy),
    ] {
        let id = exchange
            .submit_order(&order(user, Price::from_cents(cents), volume, side))
            .unwrap();
        originals.push((id, volume));
    }
    exchange.set_market_state(MarketState::Closed).unwrap();

    let fills = log.fills();
    let cancels = log.cancels();
    for (id, original) in originals {
        let filled: u32 = fills.iter().filter(|f| f.id == id).map(|f| f.volume).sum();
        let cancelled: u32 = cancels.iter().filter(|c| c.id == id).map(|c| c.volume).sum();
        assert_eq!(filled + cancelled, original, "id {id}");
    }
}

#[test]
fn state_transition_legality_through_facade() {
    use MarketState::*;
    let legal = [(Closed, Preopen), (Preopen, Open), (Open, Preopen), (Open, Closed)];
    let paths: &[(&[MarketState], MarketState)] = &[
        (&[], Closed),
        (&[Preopen], Preopen),
        (&[Preopen, Open], Open),
    ];
    for (path, from) in paths {
        for to in [Closed, Preopen, Open] {
            let exchange = Exchange::new(Arc::new(EventLog::new()));
            for step in *path {
                exchange.set_market_state(*step).unwrap();
            }
            let result = exchange.set_market_state(to);
            if legal.contains(&(*from, to)) {
                assert!(result.is_ok(), "{from} -> {to} should succeed");
            } else {
                assert!(result.is_err(), "{from} -> {to} should be rejected");
                assert_eq!(exchange.market_state(), *from);
            }
        }
    }
}

#[test]
fn notifications_arrive_in_publication_order() {
    let (log, exchange) = setup_open();
    exchange
        .submit_order(&order("ANN", Price::from_cents(1000), 50, Side::Sell))
        .unwrap();
    exchange
        .submit_order(&order("REX", Price::Market, 80, Side::Buy))
        .unwrap();

    let events = log.events();
    let fill = events.iter().position(|e| matches!(e, Event::Fill(_))).unwrap();
    let sale = events.iter().position(|e| matches!(e, Event::LastSale(_))).unwrap();
    let cancel = events.iter().position(|e| matches!(e, Event::Cancel(_))).unwrap();
    assert!(fill < sale, "fills precede the derived last sale");
    assert!(sale < cancel, "market remainder is cancelled after the trade settles");
}
