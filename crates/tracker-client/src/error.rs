//! Client error types.

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure (connect, read, TLS).
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the credential. Retrying will not help.
    #[error("Credential rejected: {0}")]
    Rejected(StatusCode),

    /// Any other non-success status.
    #[error("Server returned {0}")]
    Status(StatusCode),

    /// A query fetch failed.
    #[error("Fetch failed: {0}")]
    Fetch(String),
}

impl ClientError {
    /// Whether the subscription loop should stop instead of reconnecting.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClientError::Rejected(_))
    }

    pub(crate) fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Rejected(status),
            other => ClientError::Status(other),
        }
    }
}
