//! Client side of the book server API.

use std::time::Duration;

use book_core::api::{
    CLIENT_ID_HEADER, Job, JobResponse, JobResult, LookupRequest, LookupResponse,
    RegisterRequest, RegisterResponse, SubmitEvaluationsRequest, SubmitEvaluationsResponse,
    TOKEN_HEADER,
};
use book_core::{Evaluation, Position};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ClientError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations of the book server used by workers.
///
/// Implementations must be shareable with the heartbeat thread.
pub trait BookApi: Send + Sync {
    /// Registers this worker and returns its identity.
    fn register(&self, request: &RegisterRequest) -> Result<String>;

    fn heartbeat(&self, client_id: &str) -> Result<()>;

    /// Next job, `None` when the server has no work.
    fn get_job(&self, client_id: &str) -> Result<Option<Job>>;

    fn submit_result(&self, client_id: &str, result: &JobResult) -> Result<()>;

    /// Evaluations found for `positions`, in their requested orientation.
    fn lookup(&self, positions: &[Position]) -> Result<Vec<Evaluation>>;

    /// Returns how many evaluations were stored.
    fn submit_evaluations(&self, evaluations: &[Evaluation]) -> Result<usize>;
}

/// [`BookApi`] over HTTP.
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(ApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{path}", self.base_url))
            .header(TOKEN_HEADER, &self.token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(format!("{}{path}", self.base_url))
            .header(TOKEN_HEADER, &self.token)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send()?;
        let status = response.status();
        debug!(url = %response.url(), %status, "server response");
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        Ok(self.send(request)?.json()?)
    }
}

impl BookApi for ApiClient {
    fn register(&self, request: &RegisterRequest) -> Result<String> {
        let response: RegisterResponse = self.send_json(self.post("/register").json(request))?;
        Ok(response.client_id)
    }

    fn heartbeat(&self, client_id: &str) -> Result<()> {
        self.send(self.post("/heartbeat").header(CLIENT_ID_HEADER, client_id))?;
        Ok(())
    }

    fn get_job(&self, client_id: &str) -> Result<Option<Job>> {
        let response: JobResponse =
            self.send_json(self.get("/job").header(CLIENT_ID_HEADER, client_id))?;
        Ok(response.job)
    }

    fn submit_result(&self, client_id: &str, result: &JobResult) -> Result<()> {
        self.send(
            self.post("/job/result")
                .header(CLIENT_ID_HEADER, client_id)
                .json(result),
        )?;
        Ok(())
    }

    fn lookup(&self, positions: &[Position]) -> Result<Vec<Evaluation>> {
        let request = LookupRequest {
            positions: positions.to_vec(),
        };
        let response: LookupResponse =
            self.send_json(self.post("/positions/lookup").json(&request))?;
        Ok(response.evaluations)
    }

    fn submit_evaluations(&self, evaluations: &[Evaluation]) -> Result<usize> {
        let request = SubmitEvaluationsRequest {
            evaluations: evaluations.to_vec(),
        };
        let response: SubmitEvaluationsResponse =
            self.send_json(self.post("/evaluations").json(&request))?;
        Ok(response.saved)
    }
}
