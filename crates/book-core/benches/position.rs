use std::hint::black_box;

use book_core::position::Position;
use book_core::symmetry::canonicalize;
use criterion::{Criterion, criterion_group, criterion_main};

fn midgame() -> Position {
    Position::from_board_string(
        "--OOOO--\
         X-OOOX--\
         XXXOXXXX\
         XXOXOXXX\
         XXXOOXXX\
         X-OOOO-X\
         --O-O---\
         --------",
    )
    .unwrap_or_default()
}

fn position_benchmark(c: &mut Criterion) {
    let position = midgame();

    c.bench_function("moves", |b| b.iter(|| black_box(black_box(position).moves())));
    c.bench_function("canonicalize", |b| {
        b.iter(|| canonicalize(black_box(&position)))
    });
    c.bench_function("children", |b| {
        b.iter(|| black_box(position).children().count())
    });
}

criterion_group!(benches, position_benchmark);
criterion_main!(benches);
