//! In-memory evaluation cache keyed by canonical position.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{BookError, Result};
use crate::evaluation::Evaluation;
use crate::position::Position;
use crate::symmetry::{canonicalize, is_canonical};

/// How a position's evaluation is obtained.
///
/// Rules are tried in declaration order: a finished game is always derived
/// from the discs, a forced pass is derived from the passed position, and
/// everything else must be stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupRule {
    GameEnd,
    Pass,
    Stored,
}

impl LookupRule {
    pub fn of(position: &Position) -> LookupRule {
        if position.has_moves() {
            LookupRule::Stored
        } else if position.pass().has_moves() {
            LookupRule::Pass
        } else {
            LookupRule::GameEnd
        }
    }

    /// The position whose stored evaluation answers a lookup of `position`,
    /// or `None` when the answer needs no storage.
    pub fn storage_key(position: &Position) -> Option<Position> {
        match LookupRule::of(position) {
            LookupRule::GameEnd => None,
            LookupRule::Pass => Some(canonicalize(&position.pass()).0),
            LookupRule::Stored => Some(canonicalize(position).0),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct EvaluationCache {
    entries: FxHashMap<Position, Evaluation>,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored evaluation of a canonical position, without derivation.
    pub fn get(&self, canonical: &Position) -> Option<&Evaluation> {
        self.entries.get(canonical)
    }

    pub fn contains(&self, canonical: &Position) -> bool {
        self.entries.contains_key(canonical)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Evaluation> {
        self.entries.values()
    }

    /// Looks up the evaluation of any reachable position.
    ///
    /// The result is expressed in the orientation of `position`.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::NotFound`] when the position, or for a forced pass
    /// the passed position, has no stored evaluation.
    pub fn lookup(&self, position: &Position) -> Result<Evaluation> {
        match LookupRule::of(position) {
            LookupRule::GameEnd => Ok(Evaluation::for_game_end(position)),
            // The passed position always has a move, so it resolves as stored.
            LookupRule::Pass => Ok(self.lookup_stored(&position.pass())?.for_pass_parent()),
            LookupRule::Stored => self.lookup_stored(position),
        }
    }

    fn lookup_stored(&self, position: &Position) -> Result<Evaluation> {
        let (canonical, symmetry) = canonicalize(position);
        self.entries
            .get(&canonical)
            .map(|evaluation| evaluation.unrotated(symmetry))
            .ok_or(BookError::NotFound(*position))
    }

    /// Adds an evaluation of a canonical position, keeping the better of
    /// the new and the stored one. Ties keep the stored one.
    ///
    /// # Returns
    ///
    /// `true` if the cache changed.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::InvalidEvaluation`] if `position` is not canonical
    /// or the evaluation belongs to another position.
    pub fn add(&mut self, position: Position, evaluation: Evaluation) -> Result<bool> {
        if !is_canonical(&position) {
            return Err(BookError::InvalidEvaluation(format!(
                "position {position} is not canonical"
            )));
        }
        if *evaluation.position() != position {
            return Err(BookError::InvalidEvaluation(format!(
                "evaluation of {} added under {position}",
                evaluation.position()
            )));
        }

        match self.entries.get(&position) {
            Some(found) if !evaluation.is_better_than(found) => Ok(false),
            _ => {
                self.entries.insert(position, evaluation);
                Ok(true)
            }
        }
    }

    /// Adds an evaluation given in any orientation.
    pub fn add_any(&mut self, evaluation: &Evaluation) -> Result<bool> {
        let canonical = evaluation.canonicalized();
        self.add(*canonical.position(), canonical)
    }

    /// Merges every entry of `other` with [`EvaluationCache::add`] semantics.
    pub fn update(&mut self, other: EvaluationCache) {
        for (position, evaluation) in other.entries {
            match self.entries.get(&position) {
                Some(found) if !evaluation.is_better_than(found) => {}
                _ => {
                    self.entries.insert(position, evaluation);
                }
            }
        }
    }

    /// Canonical positions needed to evaluate every child of `position` and
    /// not yet in the cache.
    ///
    /// Finished children need nothing; a child that must pass needs its
    /// passed position. The result is deduplicated and sorted.
    pub fn missing_children(&self, position: &Position) -> Vec<Position> {
        let keys: FxHashSet<Position> = position
            .children()
            .filter_map(|(_, child)| LookupRule::storage_key(&child))
            .filter(|key| !self.entries.contains_key(key))
            .collect();

        let mut missing: Vec<Position> = keys.into_iter().collect();
        missing.sort();
        missing
    }
}

impl FromIterator<Evaluation> for EvaluationCache {
    /// Builds a cache from evaluations in any orientation. Invalid entries
    /// cannot occur since every `Evaluation` is validated on construction.
    fn from_iter<I: IntoIterator<Item = Evaluation>>(iter: I) -> Self {
        let mut cache = EvaluationCache::new();
        for evaluation in iter {
            let canonical = evaluation.canonicalized();
            let position = *canonical.position();
            match cache.entries.get(&position) {
                Some(found) if !canonical.is_better_than(found) => {}
                _ => {
                    cache.entries.insert(position, canonical);
                }
            }
        }
        cache
    }
}
