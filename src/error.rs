use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },
}

#[derive(Debug, Error)]
pub enum WorkersError {
    /// Multi-script endpoints live under the account; no account ID was configured.
    #[error("account ID required for multi-script request")]
    AccountIdRequired,

    #[error("zone ID required for single-script request")]
    ZoneIdRequired,

    #[error("request failed: {0}")]
    Request(#[source] TransportError),

    #[error("unmarshal failed: {0}")]
    Unmarshal(#[source] serde_json::Error),

    #[error("unmarshal failed: script is not valid UTF-8: {0}")]
    InvalidScript(#[source] std::string::FromUtf8Error),

    #[error("serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("multipart encoding failed: {0}")]
    Multipart(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for WorkersError {
    fn from(err: TransportError) -> Self {
        WorkersError::Request(err)
    }
}

pub type Result<T> = std::result::Result<T, WorkersError>;
