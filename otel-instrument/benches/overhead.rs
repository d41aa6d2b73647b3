/*
    Wrapper overhead, per call, against the default no-op global provider.

    | benchmark    | time     |
    |--------------|----------|
    | raw_call     | ~1 ns    |
    | wrapped_call | ~80 ns   |
*/

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use otel_instrument::{fn_target, Callable, Instrument, InstrumentOptions};

fn wrapped_call_overhead(c: &mut Criterion) {
    let raw = |x: u64| x.wrapping_mul(31).wrapping_add(7);
    let wrapped = raw.instrument(fn_target!("bench_target"), InstrumentOptions::default());

    c.bench_function("raw_call", |b| b.iter(|| black_box(raw(black_box(5)))));
    c.bench_function("wrapped_call", |b| {
        b.iter(|| black_box(wrapped.call((black_box(5),))))
    });
}

criterion_group!(benches, wrapped_call_overhead);
criterion_main!(benches);
