//! Durable evaluation store on SQLite.

use std::str::FromStr;

use book_core::api::{BookStatsRow, Job};
use book_core::cache::{EvaluationCache, LookupRule};
use book_core::evaluation::{Confidence, Evaluation};
use book_core::level::{
    Level, MAX_SAVABLE_DISCS, MIN_DISCS, is_savable_position, learn_level, search_floor,
};
use book_core::moves::Move;
use book_core::position::Position;
use book_core::BookError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use thiserror::Error;
use tracing::debug;

/// Keys per `IN (...)` query, well below SQLite's bound parameter limit.
pub const LOOKUP_CHUNK_SIZE: usize = 500;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS evaluations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        position BLOB NOT NULL,
        disc_count INTEGER NOT NULL,
        level INTEGER NOT NULL,
        depth INTEGER NOT NULL,
        confidence INTEGER NOT NULL,
        score INTEGER NOT NULL,
        best_moves BLOB NOT NULL,
        learn_priority INTEGER NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS evaluations_position ON evaluations (position)",
    "CREATE INDEX IF NOT EXISTS evaluations_disc_count ON evaluations (disc_count)",
    "CREATE INDEX IF NOT EXISTS evaluations_level ON evaluations (level)",
    "CREATE INDEX IF NOT EXISTS evaluations_disc_count_level ON evaluations (disc_count, level)",
    "CREATE INDEX IF NOT EXISTS evaluations_learn_priority ON evaluations (learn_priority)",
];

const SELECT_COLUMNS: &str = "SELECT position, level, depth, confidence, score, best_moves FROM evaluations";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt stored evaluation: {0}")]
    Corrupt(#[from] BookError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// What [`EvaluationStore::save`] did with an evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Below the learn level or past the disc limit.
    NotSavable,
    Inserted,
    Upgraded,
    /// The stored evaluation is at least as good.
    Kept,
}

/// Read-side priority of a row: lower is handed out first.
pub fn learn_priority(level: Level, disc_count: u32) -> i64 {
    3 * level as i64 + disc_count as i64
}

#[derive(Clone, Debug)]
pub struct EvaluationStore {
    pool: SqlitePool,
}

impl EvaluationStore {
    /// Opens (creating if missing) the database at `url` and applies the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let store = EvaluationStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        EvaluationStore { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Fetches what is needed to answer a lookup of each position.
    ///
    /// Finished games are left out since they are derived, and a forced pass
    /// fetches its passed position. Call [`EvaluationCache::lookup`] on the
    /// result to resolve each position in its own orientation.
    pub async fn lookup(&self, positions: &[Position]) -> Result<EvaluationCache> {
        let mut keys: Vec<Position> = positions.iter().filter_map(LookupRule::storage_key).collect();
        keys.sort();
        keys.dedup();

        let mut cache = EvaluationCache::new();
        for chunk in keys.chunks(LOOKUP_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("{SELECT_COLUMNS} WHERE position IN ("));
            let mut separated = builder.separated(", ");
            for position in chunk {
                separated.push_bind(position.to_bytes().to_vec());
            }
            separated.push_unseparated(")");

            let rows = builder.build().fetch_all(&self.pool).await?;
            for row in &rows {
                let evaluation = row_to_evaluation(row)?;
                cache.add(*evaluation.position(), evaluation)?;
            }
        }

        debug!(requested = positions.len(), found = cache.len(), "looked up positions");
        Ok(cache)
    }

    /// Persists an evaluation if it is savable and better than the stored one.
    ///
    /// Concurrent writers of the same position are resolved by the conditional
    /// update: only a strictly better `(depth, confidence, level)` replaces a row.
    pub async fn save(&self, evaluation: &Evaluation) -> Result<SaveOutcome> {
        if !evaluation.is_savable() {
            return Ok(SaveOutcome::NotSavable);
        }

        let evaluation = evaluation.canonicalized();
        let position = evaluation.position().to_bytes().to_vec();
        let disc_count = evaluation.position().count_discs();
        let best_moves: Vec<u8> = evaluation
            .best_moves()
            .iter()
            .map(|mv| mv.to_i8() as u8)
            .collect();
        let priority = learn_priority(evaluation.level(), disc_count);

        let inserted = sqlx::query(
            "INSERT INTO evaluations
                (position, disc_count, level, depth, confidence, score, best_moves, learn_priority)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (position) DO NOTHING",
        )
        .bind(position.clone())
        .bind(disc_count as i64)
        .bind(evaluation.level() as i64)
        .bind(evaluation.depth() as i64)
        .bind(evaluation.confidence().percent() as i64)
        .bind(evaluation.score() as i64)
        .bind(best_moves.clone())
        .bind(priority)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            return Ok(SaveOutcome::Inserted);
        }

        let updated = sqlx::query(
            "UPDATE evaluations
             SET level = ?, depth = ?, confidence = ?, score = ?, best_moves = ?, learn_priority = ?
             WHERE position = ? AND (depth, confidence, level) < (?, ?, ?)",
        )
        .bind(evaluation.level() as i64)
        .bind(evaluation.depth() as i64)
        .bind(evaluation.confidence().percent() as i64)
        .bind(evaluation.score() as i64)
        .bind(best_moves.clone())
        .bind(priority)
        .bind(position.clone())
        .bind(evaluation.depth() as i64)
        .bind(evaluation.confidence().percent() as i64)
        .bind(evaluation.level() as i64)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() > 0 {
            Ok(SaveOutcome::Upgraded)
        } else {
            Ok(SaveOutcome::Kept)
        }
    }

    /// Saves each evaluation and returns how many rows changed.
    pub async fn save_all(&self, evaluations: &[Evaluation]) -> Result<usize> {
        let mut changed = 0;
        for evaluation in evaluations {
            match self.save(evaluation).await? {
                SaveOutcome::Inserted | SaveOutcome::Upgraded => changed += 1,
                SaveOutcome::NotSavable | SaveOutcome::Kept => {}
            }
        }
        Ok(changed)
    }

    /// Stored positions with `disc_count` discs whose evaluation is below the
    /// [`search_floor`] of `level` and not solved exactly, lowest level first.
    ///
    /// The floor uses the same key as [`EvaluationStore::save`], so saving any
    /// result of a search at `level` removes the position from this list.
    pub async fn positions_below_level(&self, disc_count: u32, level: Level) -> Result<Vec<Position>> {
        let (depth, confidence, level) = search_floor(disc_count, level);
        let rows = sqlx::query(
            "SELECT position FROM evaluations
             WHERE disc_count = ? AND confidence < 100
               AND (depth, confidence, level) < (?, ?, ?)
             ORDER BY level, learn_priority, id",
        )
        .bind(disc_count as i64)
        .bind(depth as i64)
        .bind(confidence.percent() as i64)
        .bind(level as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut positions = Vec::with_capacity(rows.len());
        for row in &rows {
            let bytes: Vec<u8> = row.try_get("position")?;
            let position = Position::from_bytes(&bytes)?;
            if is_savable_position(&position) {
                positions.push(position);
            }
        }
        Ok(positions)
    }

    /// Book-wide work list: positions below the [`search_floor`] of their
    /// disc count's learn level, ordered by [`learn_priority`].
    pub async fn positions_by_priority(&self, limit: u32) -> Result<Vec<Job>> {
        let level = learn_level_sql();
        let sql = format!(
            "SELECT position, disc_count FROM evaluations
             WHERE confidence < 100
               AND (depth, confidence, level) < (MIN({level}, 64 - disc_count), {floor}, {level})
             ORDER BY learn_priority, id
             LIMIT ?",
            floor = Confidence::P73.percent(),
        );
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut jobs = Vec::with_capacity(rows.len());
        for row in &rows {
            let bytes: Vec<u8> = row.try_get("position")?;
            let disc_count: i64 = row.try_get("disc_count")?;
            jobs.push(Job {
                position: Position::from_bytes(&bytes)?,
                level: learn_level(disc_count as u32),
            });
        }
        Ok(jobs)
    }

    /// Row counts grouped by disc count and level.
    pub async fn book_stats(&self) -> Result<Vec<BookStatsRow>> {
        let rows = sqlx::query(
            "SELECT disc_count, level, COUNT(*) AS count FROM evaluations
             GROUP BY disc_count, level
             ORDER BY disc_count, level",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = Vec::with_capacity(rows.len());
        for row in &rows {
            let disc_count: i64 = row.try_get("disc_count")?;
            let level: i64 = row.try_get("level")?;
            let count: i64 = row.try_get("count")?;
            stats.push(BookStatsRow {
                disc_count: disc_count as u32,
                level: level as Level,
                count: count as u64,
            });
        }
        Ok(stats)
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM evaluations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

fn row_to_evaluation(row: &SqliteRow) -> Result<Evaluation> {
    let position: Vec<u8> = row.try_get("position")?;
    let level: i64 = row.try_get("level")?;
    let depth: i64 = row.try_get("depth")?;
    let confidence: i64 = row.try_get("confidence")?;
    let score: i64 = row.try_get("score")?;
    let best_moves: Vec<u8> = row.try_get("best_moves")?;

    let corrupt = |what: &str, value: i64| {
        BookError::InvalidEvaluation(format!("stored {what} {value} out of range"))
    };
    let best_moves = best_moves
        .into_iter()
        .map(|byte| Move::from_i8(byte as i8))
        .collect::<std::result::Result<Vec<Move>, BookError>>()?;

    let evaluation = Evaluation::new(
        Position::from_bytes(&position)?,
        u8::try_from(level).map_err(|_| corrupt("level", level))?,
        u8::try_from(depth).map_err(|_| corrupt("depth", depth))?,
        u8::try_from(confidence)
            .map_err(|_| corrupt("confidence", confidence))
            .and_then(Confidence::try_from)?,
        i8::try_from(score).map_err(|_| corrupt("score", score))?,
        best_moves,
    )?;
    Ok(evaluation)
}

/// SQL expression computing the learn level from the `disc_count` column.
fn learn_level_sql() -> String {
    let mut sql = String::from("CASE");
    let mut disc_count = MIN_DISCS;
    while disc_count < MAX_SAVABLE_DISCS {
        let level = learn_level(disc_count);
        let mut last = disc_count;
        while last < MAX_SAVABLE_DISCS && learn_level(last + 1) == level {
            last += 1;
        }
        if last < MAX_SAVABLE_DISCS {
            sql.push_str(&format!(" WHEN disc_count <= {last} THEN {level}"));
        }
        disc_count = last + 1;
    }
    sql.push_str(&format!(" ELSE {} END", learn_level(MAX_SAVABLE_DISCS)));
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learn_priority() {
        assert_eq!(learn_priority(16, 10), 58);
        assert!(learn_priority(16, 30) < learn_priority(18, 30));
    }

    #[test]
    fn test_learn_level_sql() {
        assert_eq!(
            learn_level_sql(),
            "CASE WHEN disc_count <= 12 THEN 36 WHEN disc_count <= 20 THEN 34 ELSE 32 END"
        );
    }
}
