//! Worker-side error taxonomy. Mirrors the broker's `DomainError` variants
//! that a caller outside the store can actually observe, plus the
//! transport/execution failures that only make sense on this side.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("no ready job")]
    EmptyQueue,

    #[error("request to broker failed: {0}")]
    TransportFailure(#[from] reqwest::Error),

    #[error("job execution failed: {0}")]
    ExecutionFailure(String),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("broker returned {status}: {body}")]
    BrokerError {
        status: reqwest::StatusCode,
        body: String,
    },
}

pub type WorkerResult<T> = Result<T, WorkerError>;
