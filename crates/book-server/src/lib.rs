pub mod api;
pub mod config;
pub mod error;
pub mod state;
pub mod store;

pub use api::{AppState, AuthConfig, router};
pub use error::ApiError;
pub use state::{BookState, SchedulerConfig};
pub use store::{EvaluationStore, SaveOutcome, StoreError};
