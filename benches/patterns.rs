//! Benchmarks for chart, candlestick, and level detection.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use patternscan::prelude::*;

/// Generate realistic deterministic bars.
fn generate_series(n: usize) -> Series {
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0;
        let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

        let open = price;
        let close = price + change;
        let high = open.max(close) + volatility * 0.5;
        let low = open.min(close) - volatility * 0.5;

        bars.push(Bar::new(i as i64, open, high, low, close));
        price = close;
    }

    Series::from_bars(bars).unwrap()
}

fn bench_chart_scan(c: &mut Criterion) {
    let series = generate_series(1000);
    let detector = ChartPatternDetector::default();

    c.bench_function("chart_scan_1000_bars", |b| {
        b.iter(|| {
            let _ = black_box(detector.scan(black_box(&series)));
        })
    });
}

fn bench_candlestick_scan(c: &mut Criterion) {
    let series = generate_series(1000);
    let detector = CandlestickPatternDetector::default();

    c.bench_function("candlestick_scan_1000_bars", |b| {
        b.iter(|| {
            let _ = black_box(detector.scan(black_box(&series)));
        })
    });
}

fn bench_levels(c: &mut Criterion) {
    let series = generate_series(1000);
    let detector = SupportResistanceDetector::default();

    c.bench_function("support_resistance_1000_bars", |b| {
        b.iter(|| {
            let _ = black_box(detector.find_levels_with_strength(black_box(&series)));
        })
    });
}

fn bench_full_scan(c: &mut Criterion) {
    let series = generate_series(1000);
    let scanner = PatternScanner::default();

    c.bench_function("full_scan_1000_bars", |b| {
        b.iter(|| {
            let _ = black_box(scanner.scan(black_box(&series)));
        })
    });
}

criterion_group!(
    benches,
    bench_chart_scan,
    bench_candlestick_scan,
    bench_levels,
    bench_full_scan
);
criterion_main!(benches);
