//! Benchmarks for invalidation and flushing.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ripple_core::reactive::{flush, Observer, Reactive, ReactiveValue};

/// One value read by `n` Observers, each through its own Reactive.
fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for n in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("write_and_flush", n), &n, |b, &n| {
            let source = ReactiveValue::new(0u64);
            let observers: Vec<Observer> = (0..n)
                .map(|i| {
                    let derived = Reactive::new({
                        let source = source.clone();
                        move || source.read() + i
                    });
                    Observer::new(move || {
                        black_box(derived.invoke().unwrap_or_default());
                    })
                })
                .collect();
            let _ = flush();

            b.iter(|| {
                source.update(|v| v + 1);
                let _ = flush();
            });

            for observer in &observers {
                observer.dispose();
            }
        });
    }

    group.finish();
}

/// A linear chain of `n` Reactives feeding one Observer.
fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");

    for n in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("write_and_flush", n), &n, |b, &n| {
            let source = ReactiveValue::new(0u64);
            let mut tail = Reactive::new({
                let source = source.clone();
                move || source.read()
            });
            for _ in 0..n {
                let prev = tail.clone();
                tail = Reactive::new(move || prev.invoke().unwrap_or_default() + 1);
            }
            let observer = Observer::new(move || {
                black_box(tail.invoke().unwrap_or_default());
            });
            let _ = flush();

            b.iter(|| {
                source.update(|v| v + 1);
                let _ = flush();
            });

            observer.dispose();
        });
    }

    group.finish();
}

/// Flushing with nothing pending.
fn bench_steady_state(c: &mut Criterion) {
    let source = ReactiveValue::new(0u64);
    let observer = Observer::new(move || {
        black_box(source.read());
    });
    let _ = flush();

    c.bench_function("steady_state_flush", |b| {
        b.iter(|| {
            let _ = flush();
        });
    });

    observer.dispose();
}

criterion_group!(benches, bench_fan_out, bench_chain, bench_steady_state);
criterion_main!(benches);
