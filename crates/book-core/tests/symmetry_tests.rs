//! Properties of canonicalization and cache lookups over random games.

use book_core::cache::EvaluationCache;
use book_core::evaluation::{Confidence, Evaluation};
use book_core::moves::Move;
use book_core::position::Position;
use book_core::square::Square;
use book_core::symmetry::{
    Symmetry, canonicalize, rotate, rotate_move, unrotate, unrotate_move,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Plays random games and collects every position along the way, including
/// positions that must pass and finished games.
fn random_positions(seed: u64, games: usize) -> Vec<Position> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut positions = Vec::new();

    for _ in 0..games {
        let mut position = Position::start();
        loop {
            positions.push(position);
            if position.is_game_end() {
                break;
            }
            let moves: Vec<Square> = position.moves().iter().collect();
            position = if moves.is_empty() {
                position.apply(Move::Pass).unwrap()
            } else {
                let sq = moves[rng.random_range(0..moves.len())];
                position.apply(Move::Play(sq)).unwrap()
            };
        }
    }
    positions
}

#[test]
fn test_canonicalize_then_unrotate_restores_position() {
    for position in random_positions(1, 20) {
        let (canonical, symmetry) = canonicalize(&position);
        assert_eq!(unrotate(&canonical, symmetry), position);
        assert!(canonical <= position);
    }
}

#[test]
fn test_every_image_has_the_same_canonical_form() {
    for position in random_positions(2, 20) {
        let (canonical, _) = canonicalize(&position);
        for symmetry in Symmetry::all() {
            let image = rotate(&position, symmetry);
            let (image_canonical, image_symmetry) = canonicalize(&image);
            assert_eq!(image_canonical, canonical);
            assert_eq!(unrotate(&image_canonical, image_symmetry), image);
        }
    }
}

#[test]
fn test_rotate_move_round_trip_on_legal_moves() {
    for position in random_positions(3, 10) {
        for sq in position.moves() {
            for symmetry in Symmetry::all() {
                let mv = Move::Play(sq);
                let rotated = rotate_move(mv, symmetry);
                assert_eq!(unrotate_move(rotated, symmetry), mv);
                // The rotated move is legal in the rotated position.
                let image = rotate(&position, symmetry);
                assert_eq!(
                    image.apply(rotated).unwrap(),
                    rotate(&position.apply(mv).unwrap(), symmetry)
                );
            }
        }
    }
}

#[test]
fn test_full_board_lookup() {
    let me = (1u64 << 40) - 1;
    let position = Position::new(me, !me).unwrap();
    let evaluation = EvaluationCache::new().lookup(&position).unwrap();
    assert_eq!(evaluation.score(), 16);
    assert_eq!(evaluation.confidence(), Confidence::P100);
    assert!(evaluation.best_moves().is_empty());
}

#[test]
fn test_pass_positions_from_random_games() {
    let positions = random_positions(4, 200);
    let pass_positions: Vec<&Position> =
        positions.iter().filter(|p| p.is_pass_position()).collect();
    assert!(!pass_positions.is_empty());

    for position in pass_positions {
        let passed = position.pass();
        let mut cache = EvaluationCache::new();
        let score = (passed.count_discs() % 64) as i8 - 32;
        let level = 20;
        let stored = Evaluation::new(passed, level, 12, Confidence::P98, score, vec![]).unwrap();
        cache.add_any(&stored).unwrap();

        let evaluation = cache.lookup(position).unwrap();
        assert_eq!(evaluation.score(), -cache.lookup(&passed).unwrap().score());
        assert_eq!(evaluation.best_moves()[0], Move::Pass);
        assert_eq!(evaluation.depth(), 12);
        assert_eq!(evaluation.level(), level);
    }
}
