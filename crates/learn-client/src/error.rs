//! Error types of the learn client.

use std::io;

use book_core::BookError;
use thiserror::Error;

/// Failures of the engine subprocess.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to talk to the engine: {0}")]
    Io(#[from] io::Error),

    #[error("engine command is empty")]
    EmptyCommand,

    #[error("engine exited")]
    Exited,

    #[error("unexpected engine output {line:?}: {reason}")]
    Output { line: String, reason: String },

    #[error("engine finished without a search result")]
    NoResult,

    #[error(transparent)]
    Book(#[from] BookError),
}

/// Failures while talking to the book server or running a job.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server does not know this client; register again.
    #[error("client identity rejected by the server")]
    Unauthorized,

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Book(#[from] BookError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
