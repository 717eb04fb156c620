//! Error types for sink deliveries

use std::fmt;

use reqwest::StatusCode;

/// Result type alias for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors that can occur while pushing a sample to a sink
#[derive(Debug)]
pub enum SinkError {
    /// Connection, TLS or timeout failure
    Transport(reqwest::Error),

    /// The sink answered with a non-2xx status
    Rejected { status: StatusCode, body: String },

    /// The sample could not be encoded for this sink
    Encoding(String),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Transport(err) => write!(f, "transport error: {}", err),
            SinkError::Rejected { status, body } if body.is_empty() => {
                write!(f, "rejected with status {}", status)
            }
            SinkError::Rejected { status, body } => {
                write!(f, "rejected with status {}: {}", status, body)
            }
            SinkError::Encoding(msg) => write!(f, "encoding error: {}", msg),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        SinkError::Transport(err)
    }
}

impl SinkError {
    /// Turn a non-2xx response into [`SinkError::Rejected`].
    pub(crate) async fn check(response: reqwest::Response) -> SinkResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Rejected { status, body })
    }
}
