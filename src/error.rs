//! Error handling for requester

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// Boxed error source carried by transport and codec failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for requester operations
#[derive(Error, Debug)]
pub enum RequesterError {
    /// Connection, protocol or body-stream failure reported by the transport.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// The response body did not match the expected structure.
    #[error("Decode error: {0}")]
    Decode(#[source] BoxError),

    #[error("Encode error: {0}")]
    Encode(#[source] BoxError),

    /// The caller-supplied cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("HTTP status {status} for {url}")]
    Status { status: StatusCode, url: Url },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Proxy error: {0}")]
    Proxy(String),
}

impl RequesterError {
    pub fn transport(err: impl Into<BoxError>) -> Self {
        RequesterError::Transport(err.into())
    }

    pub fn decode(err: impl Into<BoxError>) -> Self {
        RequesterError::Decode(err.into())
    }

    pub fn encode(err: impl Into<BoxError>) -> Self {
        RequesterError::Encode(err.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, RequesterError::Transport(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, RequesterError::Decode(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequesterError::Cancelled)
    }
}

impl From<reqwest::Error> for RequesterError {
    fn from(err: reqwest::Error) -> Self {
        RequesterError::Transport(Box::new(err))
    }
}

/// Result type alias for requester operations
pub type Result<T> = std::result::Result<T, RequesterError>;
