//! Errors returned by request handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use book_core::BookError;
use book_core::api::ErrorBody;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Unknown or expired client identity; the client should register again.
    #[error("unknown client: {0}")]
    UnknownClient(String),

    #[error("invalid token")]
    InvalidToken,

    #[error("invalid stats credentials")]
    InvalidStatsCredentials,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<BookError> for ApiError {
    fn from(err: BookError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownClient(_) | ApiError::InvalidStatsCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::InvalidToken => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        let mut response = (status, body).into_response();
        if matches!(self, ApiError::InvalidStatsCredentials) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"book\""),
            );
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
