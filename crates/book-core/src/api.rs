//! JSON bodies exchanged between the book server and learn clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluation::Evaluation;
use crate::level::Level;
use crate::position::Position;

/// Shared secret sent with every learn request.
pub const TOKEN_HEADER: &str = "x-token";

/// Identity returned by `/register`, sent with every later request.
pub const CLIENT_ID_HEADER: &str = "client-id";

/// Largest number of positions accepted in one lookup or submit request.
pub const MAX_BATCH_SIZE: usize = 1000;

/// A unit of search work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Job {
    pub position: Position,
    pub level: Level,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub hostname: String,
    pub build_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub client_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResponse {
    pub job: Option<Job>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub evaluation: Evaluation,
    pub computation_time_seconds: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRequest {
    pub positions: Vec<Position>,
}

/// Evaluations found for a [`LookupRequest`], each in the orientation it was
/// requested in. Positions without an evaluation are left out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub evaluations: Vec<Evaluation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitEvaluationsRequest {
    pub evaluations: Vec<Evaluation>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitEvaluationsResponse {
    /// Evaluations that were inserted or upgraded an existing entry.
    pub saved: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStats {
    pub id: String,
    pub hostname: String,
    pub build_id: String,
    pub positions_computed: u64,
    pub last_active: DateTime<Utc>,
    pub job: Option<Job>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub active_clients: usize,
    pub disc_count: Option<u32>,
    pub queue_length: usize,
    pub client_stats: Vec<ClientStats>,
}

/// Number of stored positions for one disc count and level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookStatsRow {
    pub disc_count: u32,
    pub level: Level,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
