#![allow(dead_code)]

use std::collections::BTreeSet;

use book_core::level::Level;
use book_core::symmetry::canonical;
use book_core::{Confidence, Evaluation, Position};
use book_server::EvaluationStore;
use sqlx::sqlite::SqlitePoolOptions;

/// Fresh in-memory store. A single connection keeps every query on the same database.
pub async fn test_store() -> EvaluationStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create test database");
    let store = EvaluationStore::from_pool(pool);
    store.migrate().await.expect("Failed to apply schema");
    store
}

/// `count` distinct canonical positions with `discs` discs and a legal move,
/// found depth first from the start position.
pub fn positions_at(discs: u32, count: usize) -> Vec<Position> {
    fn walk(position: Position, discs: u32, count: usize, seen: &mut BTreeSet<Position>, out: &mut Vec<Position>) {
        if out.len() >= count {
            return;
        }
        if position.count_discs() == discs {
            let key = canonical(&position);
            if seen.insert(key) {
                out.push(key);
            }
            return;
        }
        for (_, child) in position.children() {
            if child.has_moves() {
                walk(child, discs, count, seen, out);
            }
        }
    }

    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(count);
    walk(Position::start(), discs, count, &mut seen, &mut out);
    out
}

pub fn evaluation(position: Position, level: Level) -> Evaluation {
    Evaluation::new(position, level, level, Confidence::P73, 0, Vec::new())
        .expect("valid evaluation")
}

/// Side to move has no move, the opponent can take A1.
pub fn small_pass_position() -> Position {
    Position::from_board_string(
        "-XOOOOOO\
         --------\
         --------\
         --------\
         --------\
         --------\
         --------\
         --------",
    )
    .unwrap()
}
