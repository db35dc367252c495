//! Matching-engine benchmarks: continuous crossing, multi-level market
//! sweeps, and the opening-auction uncross, all driven through the exchange
//! facade with a null event sink.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use matchbook::{Exchange, MarketState, NullSink, OrderRequest, Price, Side};

fn open_exchange() -> Exchange {
    let exchange = Exchange::new(Arc::new(NullSink));
    exchange.create_product("IBM").unwrap();
    exchange.set_market_state(MarketState::Preopen).unwrap();
    exchange.set_market_state(MarketState::Open).unwrap();
    exchange
}

fn order(price: Price, volume: u32, side: Side) -> OrderRequest {
    OrderRequest {
        user: "BEN".to_string(),
        product: "IBM".to_string(),
        price,
        volume,
        side,
    }
}

/// Benchmark: one resting fill plus replenishment per iteration.
fn bench_continuous_cross(c: &mut Criterion) {
    let mut group = c.benchmark_group("continuous_cross");
    group.throughput(Throughput::Elements(2));

    group.bench_function("limit_pair", |b| {
        let exchange = open_exchange();
        b.iter(|| {
            exchange
                .submit_order(&order(Price::from_cents(1000), 10, Side::Sell))
                .unwrap();
            let id = exchange
                .submit_order(&order(Price::from_cents(1000), 10, Side::Buy))
                .unwrap();
            black_box(id)
        })
    });

    group.finish();
}

/// Benchmark: a market order sweeping a growing number of price levels.
fn bench_market_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("market_sweep");

    for levels in [1u32, 5, 10, 20] {
        group.bench_with_input(BenchmarkId::from_parameter(levels), &levels, |b, &levels| {
            let exchange = open_exchange();
            b.iter(|| {
                for i in 0..levels {
                    exchange
                        .submit_order(&order(
                            Price::from_cents(1000 + i64::from(i) * 5),
                            10,
                            Side::Sell,
                        ))
                        .unwrap();
                }
                let id = exchange
                    .submit_order(&order(Price::Market, levels * 10, Side::Buy))
                    .unwrap();
                black_box(id)
            })
        });
    }

    group.finish();
}

/// Benchmark: uncrossing a PREOPEN book of random crossed interest.
fn bench_opening_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("opening_sweep");

    for orders in [100u32, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(orders), &orders, |b, &orders| {
            b.iter(|| {
                let exchange = Exchange::new(Arc::new(NullSink));
                exchange.create_product("IBM").unwrap();
                exchange.set_market_state(MarketState::Preopen).unwrap();

                let mut rng = ChaCha8Rng::seed_from_u64(9);
                for _ in 0..orders {
                    let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
                    let cents = 990 + rng.gen_range(0..21);
                    exchange
                        .submit_order(&order(Price::from_cents(cents), rng.gen_range(1..=50), side))
                        .unwrap();
                }

                exchange.set_market_state(MarketState::Open).unwrap();
                black_box(exchange.market_data("IBM").unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_continuous_cross,
    bench_market_sweep,
    bench_opening_sweep
);
criterion_main!(benches);
