//! Fills the book with every missing savable position up to a disc count.

use std::collections::BTreeSet;

use book_core::api::MAX_BATCH_SIZE;
use book_core::cache::LookupRule;
use book_core::level::{Level, MAX_SAVABLE_DISCS, MIN_DISCS};
use book_core::{Evaluation, EvaluationCache, Position};
use tracing::{info, warn};

use crate::api_client::BookApi;
use crate::engine::Engine;
use crate::error::Result;

/// Evaluations sent per submit request.
const SUBMIT_BATCH: usize = 20;

/// Per disc count totals reported by [`seed`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub disc_count: u32,
    pub positions: usize,
    pub found: usize,
    pub computed: usize,
}

/// Canonical positions that store a separate evaluation, for every disc count
/// from the start position up to `max_discs`.
///
/// A child that must pass is represented by its passed position, and
/// finished games are left out.
pub fn positions_by_disc_count(max_discs: u32) -> Vec<(u32, Vec<Position>)> {
    let max_discs = max_discs.min(MAX_SAVABLE_DISCS);
    let mut levels = Vec::new();
    let mut frontier: BTreeSet<Position> = LookupRule::storage_key(&Position::start())
        .into_iter()
        .collect();

    for disc_count in MIN_DISCS..=max_discs {
        if disc_count > MIN_DISCS {
            frontier = frontier
                .iter()
                .flat_map(|position| position.children())
                .filter_map(|(_, child)| LookupRule::storage_key(&child))
                .collect();
        }
        levels.push((disc_count, frontier.iter().copied().collect()));
    }
    levels
}

/// Looks up every position from the start up to `max_discs` discs and
/// evaluates the ones the book lacks at `level`.
pub fn seed<A: BookApi + ?Sized, E: Engine>(
    api: &A,
    engine: &mut E,
    max_discs: u32,
    level: Level,
) -> Result<Vec<SeedReport>> {
    let mut reports = Vec::new();
    for (disc_count, positions) in positions_by_disc_count(max_discs) {
        let mut known = EvaluationCache::new();
        for chunk in positions.chunks(MAX_BATCH_SIZE) {
            for evaluation in api.lookup(chunk)? {
                known.add_any(&evaluation)?;
            }
        }

        let missing: Vec<Position> = positions
            .iter()
            .filter(|position| !known.contains(position))
            .copied()
            .collect();
        info!(
            disc_count,
            all = positions.len(),
            found = known.len(),
            missing = missing.len(),
            "checking missing positions"
        );

        let mut pending: Vec<Evaluation> = Vec::with_capacity(SUBMIT_BATCH);
        for position in &missing {
            pending.push(engine.evaluate(position, level)?);
            if pending.len() == SUBMIT_BATCH {
                submit(api, &mut pending)?;
            }
        }
        submit(api, &mut pending)?;

        reports.push(SeedReport {
            disc_count,
            positions: positions.len(),
            found: known.len(),
            computed: missing.len(),
        });
    }
    Ok(reports)
}

fn submit<A: BookApi + ?Sized>(api: &A, pending: &mut Vec<Evaluation>) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    let saved = api.submit_evaluations(pending)?;
    if saved < pending.len() {
        warn!(sent = pending.len(), saved, "server kept some existing evaluations");
    }
    pending.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_by_disc_count() {
        let levels = positions_by_disc_count(7);
        let counts: Vec<(u32, usize)> = levels.iter().map(|(dc, positions)| (*dc, positions.len())).collect();
        // All four opening moves are symmetric images of each other.
        assert_eq!(counts[0], (4, 1));
        assert_eq!(counts[1], (5, 1));
        assert_eq!(counts[2], (6, 3));
        assert_eq!(counts.len(), 4);
        for (disc_count, positions) in &levels {
            assert!(positions.iter().all(|p| p.count_discs() == *disc_count && p.has_moves()));
        }
    }

    #[test]
    fn test_positions_by_disc_count_caps_at_savable_limit() {
        assert!(positions_by_disc_count(3).is_empty());
        assert_eq!(positions_by_disc_count(5).len(), 2);
    }
}
