use criterion::{criterion_group, criterion_main, Criterion, black_box};
use bigdecimal::BigDecimal;
use std::str::FromStr;

use common_money::{parse_amount_lenient, round_half_up, round_with, Money, RoundingMode};

fn amounts(n: usize) -> Vec<BigDecimal> {
    (0..n)
        .map(|i| BigDecimal::from_str(&format!("{}.{:04}", i * 37 % 5000, i * 7919 % 10_000)).unwrap())
        .collect()
}

fn bench_percent_and_cents(c: &mut Criterion) {
    let values = amounts(500);
    c.bench_function("round_half_up_one_place", |b| {
        b.iter(|| values.iter().map(|v| round_half_up(v, 1)).for_each(|r| { black_box(r); }));
    });
    c.bench_function("money_from_decimal", |b| {
        b.iter(|| values.iter().map(Money::from_decimal).for_each(|m| { black_box(m); }));
    });
}

fn bench_each_mode(c: &mut Criterion) {
    let values = amounts(500);
    for mode in [RoundingMode::HalfUp, RoundingMode::Bankers, RoundingMode::Truncate] {
        c.bench_function(&format!("round_cents_{}", mode.as_str()), |b| {
            b.iter(|| values.iter().map(|v| round_with(mode, v, 2)).for_each(|r| { black_box(r); }));
        });
    }
}

fn bench_lenient_parse(c: &mut Criterion) {
    let inputs = ["12,50", " 7.25 ", "abc", "-3", "", "1000000.999"];
    c.bench_function("parse_amount_lenient", |b| {
        b.iter(|| inputs.iter().map(|s| parse_amount_lenient(s)).for_each(|v| { black_box(v); }));
    });
}

criterion_group!(rounding, bench_percent_and_cents, bench_each_mode, bench_lenient_parse);
criterion_main!(rounding);
