//! Latency benchmarks for per-trade and per-bar operations.
//!
//! Run with: `cargo bench --bench latency`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use backtester::{
    aggregate, AtrSignalSource, RunInfo, SignalSource, SimulationParams, TradeLedger,
    TradeSimulator,
};
use market_core::{BacktestConfig, Candle, Direction, ExitReason, Signal, Trade};
use risk_manager::{TrailingStop, VolatilityFilter};

/// Random-walk candles with a fixed seed.
fn generate_candles(count: usize, seed: u64) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 100.0;
    (0..count)
        .map(|i| {
            let open = price;
            price *= 1.0 + rng.gen_range(-0.01..0.01);
            let high = open.max(price) * (1.0 + rng.gen_range(0.0..0.004));
            let low = open.min(price) * (1.0 - rng.gen_range(0.0..0.004));
            let volume = rng.gen_range(50.0..150.0);
            Candle::new(i as i64 * 900_000, open, high, low, price, volume)
        })
        .collect()
}

fn generate_signal(entry: f64) -> Signal {
    Signal::new(
        Direction::Buy,
        entry,
        entry - 1.0,
        &[(entry + 1.0, 30), (entry + 2.0, 30), (entry + 4.0, 40)],
    )
}

/// Benchmark single-trade simulation over different forward horizons.
fn bench_trade_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("trade_simulation");

    let config = BacktestConfig::new("BTCUSDT", "15m", "breakout_master");
    let single = TradeSimulator::new(SimulationParams::from_config(&config));
    let partial = TradeSimulator::new(SimulationParams {
        partial_exits: true,
        ..SimulationParams::from_config(&config)
    });
    let signal = generate_signal(100.0);

    for horizon in [10, 50, 200].iter() {
        let forward = generate_candles(*horizon, 7);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("single", horizon), &forward, |b, forward| {
            b.iter(|| black_box(single.simulate(black_box(&signal), black_box(forward))))
        });
        group.bench_with_input(BenchmarkId::new("partial", horizon), &forward, |b, forward| {
            b.iter(|| black_box(partial.simulate(black_box(&signal), black_box(forward))))
        });
    }

    group.finish();
}

/// Benchmark signal generation over different window sizes.
fn bench_signal_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_generation");
    let source = AtrSignalSource::default();

    for window in [100, 200, 500].iter() {
        let candles = generate_candles(*window, 11);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("breakout_master", window), &candles, |b, candles| {
            b.iter(|| black_box(source.generate_signal(black_box(candles), "breakout_master")))
        });
    }

    group.finish();
}

/// Benchmark per-bar entry filter and trailing stop checks.
fn bench_bar_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("bar_checks");
    let candles = generate_candles(200, 13);
    let bar = candles[candles.len() - 1];

    let filter = VolatilityFilter::new(0.1, 5.0);
    group.bench_function("volatility_filter", |b| {
        b.iter(|| black_box(filter.allows(black_box(&candles), black_box(&bar))))
    });

    group.bench_function("trailing_stop_update", |b| {
        b.iter(|| {
            let mut trail = TrailingStop::new(Direction::Buy, 100.0, 1.0);
            for candle in &candles[..50] {
                trail.observe(candle);
                trail.update();
                if trail.breached(candle).is_some() {
                    break;
                }
            }
            black_box(trail.is_armed())
        })
    });

    group.finish();
}

/// Benchmark statistics aggregation over different ledger sizes.
fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics");
    let mut rng = StdRng::seed_from_u64(17);

    for count in [10, 100, 1000].iter() {
        let trades: Vec<Trade> = (0..*count)
            .map(|i| {
                let profit = rng.gen_range(-100.0..150.0);
                Trade {
                    direction: Direction::Buy,
                    entry: 100.0,
                    exit: 100.0 + profit / 30.0,
                    stop_loss: 99.0,
                    exit_reason: if profit > 0.0 {
                        ExitReason::Target3
                    } else {
                        ExitReason::StopLoss
                    },
                    candles_held: 5,
                    profit,
                    profit_percent: profit / 30.0 * 100.0,
                    rr: profit / 30.0,
                    balance_after: 0.0,
                    entry_index: i * 6,
                    entry_time: (i * 6) as i64 * 900_000,
                }
            })
            .collect();

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("aggregate", count), &trades, |b, trades| {
            b.iter(|| {
                let mut ledger = TradeLedger::new(10_000.0);
                for trade in trades {
                    ledger.record(trade.clone());
                }
                black_box(aggregate(ledger, RunInfo::default()))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_trade_simulation,
    bench_signal_generation,
    bench_bar_checks,
    bench_statistics,
);

criterion_main!(benches);
