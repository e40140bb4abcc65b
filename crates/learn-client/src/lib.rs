pub mod api_client;
pub mod config;
pub mod engine;
pub mod error;
pub mod learn_client;
pub mod parser;
pub mod seed;

pub use api_client::{ApiClient, BookApi};
pub use engine::{EdaxEngine, Engine, EngineCommand};
pub use error::{ClientError, EngineError};
pub use learn_client::{Heartbeat, LearnClient, LearnConfig, Step};
