//! HTTP routes of the book server.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use book_core::api::{
    BookStatsRow, CLIENT_ID_HEADER, Job, JobResponse, JobResult, LookupRequest, LookupResponse,
    MAX_BATCH_SIZE, RegisterRequest, RegisterResponse, StatsResponse, SubmitEvaluationsRequest,
    SubmitEvaluationsResponse, TOKEN_HEADER,
};
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::state::{BookState, SchedulerConfig};
use crate::store::EvaluationStore;

/// Credentials checked by the middleware.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Shared secret expected in the `x-token` header of learn requests.
    pub token: String,
    pub stats_user: String,
    pub stats_password: String,
}

#[derive(Clone)]
pub struct AppState {
    book: Arc<Mutex<BookState>>,
    store: EvaluationStore,
    auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(store: EvaluationStore, auth: AuthConfig, scheduler: SchedulerConfig) -> Self {
        AppState {
            book: Arc::new(Mutex::new(BookState::new(scheduler))),
            store,
            auth: Arc::new(auth),
        }
    }

    pub fn store(&self) -> &EvaluationStore {
        &self.store
    }
}

pub fn router(state: AppState) -> Router {
    let learn_routes = Router::new()
        .route("/register", post(register))
        .route("/heartbeat", post(heartbeat))
        .route("/job", get(get_job))
        .route("/job/result", post(submit_result))
        .route("/positions/lookup", post(lookup_positions))
        .route("/evaluations", post(submit_evaluations))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    let stats_routes = Router::new()
        .route("/stats", get(stats))
        .route("/book/stats", get(book_stats))
        .route("/book/priority", get(book_priority))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_stats_credentials,
        ));

    Router::new()
        .merge(learn_routes)
        .merge(stats_routes)
        .with_state(state)
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Result<Response> {
    let token = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if token != Some(state.auth.token.as_str()) {
        return Err(ApiError::InvalidToken);
    }
    Ok(next.run(request).await)
}

async fn require_stats_credentials(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let credentials = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok());

    let expected = format!("{}:{}", state.auth.stats_user, state.auth.stats_password);
    if credentials.as_deref() != Some(expected.as_str()) {
        return Err(ApiError::InvalidStatsCredentials);
    }
    Ok(next.run(request).await)
}

/// JSON body whose rejections are reported as [`ApiError::BadRequest`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Identity from the `client-id` header. Missing or malformed identities are
/// rejected like unknown ones so the client registers again.
pub struct ClientId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for ClientId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let value = parts
            .headers
            .get(CLIENT_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        Uuid::parse_str(value)
            .map(ClientId)
            .map_err(|_| ApiError::UnknownClient(value.to_string()))
    }
}

async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Json<RegisterResponse> {
    let id = state
        .book
        .lock()
        .await
        .register(request.hostname, request.build_id, Utc::now());
    Json(RegisterResponse {
        client_id: id.to_string(),
    })
}

async fn heartbeat(State(state): State<AppState>, ClientId(id): ClientId) -> Result<()> {
    state.book.lock().await.heartbeat(id, Utc::now())
}

async fn get_job(State(state): State<AppState>, ClientId(id): ClientId) -> Result<Json<JobResponse>> {
    let mut book = state.book.lock().await;
    let job = book.next_job(id, &state.store, Utc::now()).await?;
    Ok(Json(JobResponse { job }))
}

async fn submit_result(
    State(state): State<AppState>,
    ClientId(id): ClientId,
    AppJson(result): AppJson<JobResult>,
) -> Result<()> {
    let mut book = state.book.lock().await;
    book.submit_result(
        id,
        &result.evaluation,
        result.computation_time_seconds,
        &state.store,
        Utc::now(),
    )
    .await?;
    Ok(())
}

async fn lookup_positions(
    State(state): State<AppState>,
    AppJson(request): AppJson<LookupRequest>,
) -> Result<Json<LookupResponse>> {
    if request.positions.len() > MAX_BATCH_SIZE {
        return Err(ApiError::BadRequest(format!(
            "at most {MAX_BATCH_SIZE} positions per request"
        )));
    }

    let cache = state.store.lookup(&request.positions).await?;
    let evaluations = request
        .positions
        .iter()
        .filter_map(|position| cache.lookup(position).ok())
        .collect();
    Ok(Json(LookupResponse { evaluations }))
}

async fn submit_evaluations(
    State(state): State<AppState>,
    AppJson(request): AppJson<SubmitEvaluationsRequest>,
) -> Result<Json<SubmitEvaluationsResponse>> {
    if request.evaluations.len() > MAX_BATCH_SIZE {
        return Err(ApiError::BadRequest(format!(
            "at most {MAX_BATCH_SIZE} evaluations per request"
        )));
    }
    let saved = state.store.save_all(&request.evaluations).await?;
    Ok(Json(SubmitEvaluationsResponse { saved }))
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.book.lock().await.stats())
}

async fn book_stats(State(state): State<AppState>) -> Result<Json<Vec<BookStatsRow>>> {
    Ok(Json(state.store.book_stats().await?))
}

#[derive(Debug, Deserialize)]
struct PriorityQuery {
    limit: Option<u32>,
}

async fn book_priority(
    State(state): State<AppState>,
    Query(query): Query<PriorityQuery>,
) -> Result<Json<Vec<Job>>> {
    let limit = query.limit.unwrap_or(100).min(MAX_BATCH_SIZE as u32);
    Ok(Json(state.store.positions_by_priority(limit).await?))
}
