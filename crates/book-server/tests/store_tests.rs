mod common;

use book_core::symmetry::{Symmetry, canonical, rotate};
use book_core::{Confidence, Evaluation, Move, Position, Square};
use book_server::SaveOutcome;
use common::{evaluation, positions_at, small_pass_position, test_store};

#[tokio::test]
async fn test_save_only_upgrades() {
    let store = test_store().await;
    let position = positions_at(8, 1)[0];

    assert_eq!(store.save(&evaluation(position, 16)).await.unwrap(), SaveOutcome::Inserted);
    assert_eq!(store.save(&evaluation(position, 16)).await.unwrap(), SaveOutcome::Kept);
    assert_eq!(store.save(&evaluation(position, 20)).await.unwrap(), SaveOutcome::Upgraded);
    assert_eq!(store.save(&evaluation(position, 18)).await.unwrap(), SaveOutcome::Kept);
    assert_eq!(store.count().await.unwrap(), 1);

    let cache = store.lookup(&[position]).await.unwrap();
    assert_eq!(cache.lookup(&position).unwrap().level(), 20);
}

#[tokio::test]
async fn test_depth_outranks_confidence() {
    let store = test_store().await;
    let position = positions_at(8, 1)[0];

    let shallow_exact =
        Evaluation::new(position, 16, 8, Confidence::P100, 2, Vec::new()).unwrap();
    let deep = Evaluation::new(position, 16, 10, Confidence::P95, 4, Vec::new()).unwrap();
    store.save(&deep).await.unwrap();
    assert_eq!(store.save(&shallow_exact).await.unwrap(), SaveOutcome::Kept);

    let deeper_exact =
        Evaluation::new(position, 16, 12, Confidence::P100, 6, Vec::new()).unwrap();
    assert_eq!(store.save(&deeper_exact).await.unwrap(), SaveOutcome::Upgraded);
}

#[tokio::test]
async fn test_not_savable() {
    let store = test_store().await;
    let position = positions_at(8, 1)[0];
    assert_eq!(store.save(&evaluation(position, 14)).await.unwrap(), SaveOutcome::NotSavable);

    let crowded = positions_at(31, 1)[0];
    assert_eq!(store.save(&evaluation(crowded, 36)).await.unwrap(), SaveOutcome::NotSavable);
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_symmetric_images_share_a_row() {
    let store = test_store().await;
    let position = positions_at(9, 1)[0];
    let best = position.moves().iter().next().map(Move::Play).unwrap();
    let original = Evaluation::new(position, 18, 18, Confidence::P73, -4, vec![best]).unwrap();
    store.save(&original).await.unwrap();

    let image = rotate(&position, Symmetry::new(5).unwrap());
    let rotated = original.rotated(Symmetry::new(5).unwrap());
    assert_eq!(store.save(&rotated).await.unwrap(), SaveOutcome::Kept);
    assert_eq!(store.count().await.unwrap(), 1);

    let cache = store.lookup(&[image]).await.unwrap();
    let found = cache.lookup(&image).unwrap();
    assert_eq!(found.position(), &image);
    assert_eq!(found.score(), -4);
    assert_eq!(found.best_moves().len(), 1);
}

#[tokio::test]
async fn test_lookup_derives_pass_and_game_end() {
    let store = test_store().await;
    let pass = small_pass_position();
    assert!(pass.is_pass_position());

    let passed = pass.pass();
    let stored = Evaluation::new(passed, 20, 20, Confidence::P87, 12, vec![Move::Play(Square::A1)])
        .unwrap();
    store.save(&stored).await.unwrap();

    let full_board = Position::from_board_string(&format!("{}{}", "X".repeat(40), "O".repeat(24))).unwrap();
    let cache = store.lookup(&[pass, full_board]).await.unwrap();
    assert_eq!(cache.len(), 1);

    let found = cache.lookup(&pass).unwrap();
    assert_eq!(found.score(), -12);
    assert_eq!(found.best_moves(), &[Move::Pass, Move::Play(Square::A1)]);

    let end = cache.lookup(&full_board).unwrap();
    assert_eq!(end.score(), 16);
    assert_eq!(end.confidence(), Confidence::P100);
}

#[tokio::test]
async fn test_lookup_missing() {
    let store = test_store().await;
    let position = positions_at(6, 1)[0];
    let cache = store.lookup(&[position]).await.unwrap();
    assert!(cache.is_empty());
    assert!(cache.lookup(&position).is_err());
}

#[tokio::test]
async fn test_lookup_many_chunks() {
    let store = test_store().await;
    let positions = positions_at(12, 700);
    assert_eq!(positions.len(), 700);
    let evaluations: Vec<Evaluation> = positions.iter().map(|p| evaluation(*p, 16)).collect();
    assert_eq!(store.save_all(&evaluations).await.unwrap(), 700);

    let cache = store.lookup(&positions).await.unwrap();
    assert_eq!(cache.len(), 700);
}

#[tokio::test]
async fn test_positions_below_level_order() {
    let store = test_store().await;
    let positions = positions_at(10, 3);
    store.save(&evaluation(positions[0], 30)).await.unwrap();
    store.save(&evaluation(positions[1], 16)).await.unwrap();
    store.save(&evaluation(positions[2], 36)).await.unwrap();
    let exact = Evaluation::new(positions_at(10, 4)[3], 16, 16, Confidence::P100, 0, Vec::new())
        .unwrap();
    store.save(&exact).await.unwrap();

    let below = store.positions_below_level(10, 36).await.unwrap();
    assert_eq!(below, vec![positions[1], positions[0]]);
    assert!(store.positions_below_level(11, 36).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_priority_and_book_stats() {
    let store = test_store().await;
    let early = positions_at(6, 2);
    let late = positions_at(22, 1)[0];
    store.save(&evaluation(early[0], 16)).await.unwrap();
    store.save(&evaluation(early[1], 36)).await.unwrap();
    store.save(&evaluation(late, 16)).await.unwrap();

    let jobs = store.positions_by_priority(10).await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].position, canonical(&early[0]));
    assert_eq!(jobs[0].level, 36);
    assert_eq!(jobs[1].position, late);
    assert_eq!(jobs[1].level, 32);

    let stats = store.book_stats().await.unwrap();
    let total: u64 = stats.iter().map(|row| row.count).sum();
    assert_eq!(total, 3);
    assert_eq!(stats[0].disc_count, 6);
    assert_eq!(stats[0].level, 16);
}
