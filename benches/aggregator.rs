//! Aggregation benchmarks

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kalshi_alpha::config::AggregatorConfig;
use kalshi_alpha::signal::{Direction, Signal, SignalAggregator};
use rust_decimal_macros::dec;
use std::collections::BTreeSet;

fn make_signals(count: usize) -> Vec<Signal> {
    (0..count)
        .map(|i| {
            let direction = if i % 4 == 0 { Direction::No } else { Direction::Yes };
            let features: BTreeSet<String> = (0..4)
                .map(|f| format!("feature_{}", (i + f) % 8))
                .collect();
            Signal::new(
                format!("gen_{i}"),
                direction,
                dec!(0.7),
                dec!(0.8),
                "bench",
                "MKT-1",
                Utc::now(),
                features,
            )
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let aggregator = SignalAggregator::new(AggregatorConfig::default());

    for count in [2usize, 8, 32] {
        let signals = make_signals(count);
        c.bench_function(&format!("aggregate_{count}_signals"), |b| {
            b.iter(|| aggregator.aggregate(black_box(&signals)))
        });
    }
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
