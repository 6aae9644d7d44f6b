//! Command-grammar parsing benchmarks.
//!
//! The intake thread parses one line per inbound message; parsing must stay
//! comfortably sub-microsecond so it never contributes to stop latency.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use arm_common::command::Command;

fn bench_parse_servo(c: &mut Criterion) {
    c.bench_function("parse_servo_command", |b| {
        b.iter(|| Command::parse(black_box("SERVO 2 135")).unwrap());
    });
}

fn bench_parse_stop(c: &mut Criterion) {
    c.bench_function("parse_stop_command", |b| {
        b.iter(|| Command::parse(black_box("STOP")).unwrap());
    });
}

fn bench_parse_reject(c: &mut Criterion) {
    c.bench_function("parse_rejected_command", |b| {
        b.iter(|| Command::parse(black_box("SERVO 9 450")).unwrap_err());
    });
}

criterion_group!(
    benches,
    bench_parse_servo,
    bench_parse_stop,
    bench_parse_reject
);
criterion_main!(benches);
