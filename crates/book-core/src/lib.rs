pub mod api;
pub mod bitboard;
pub mod cache;
pub mod error;
pub mod evaluation;
pub mod flip;
pub mod level;
pub mod moves;
pub mod perft;
pub mod position;
pub mod square;
pub mod symmetry;

pub use cache::{EvaluationCache, LookupRule};
pub use error::BookError;
pub use evaluation::{Confidence, Evaluation};
pub use moves::Move;
pub use position::Position;
pub use square::Square;
pub use symmetry::{Symmetry, canonicalize, unrotate_move};
