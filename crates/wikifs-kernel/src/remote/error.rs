//! Remote wiki error types.

use thiserror::Error;

/// Error talking to a wiki over HTTP.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The wiki answered with a non-success status.
    #[error("unexpected HTTP status {status} from {path}")]
    Status { status: u16, path: String },

    /// The edit form could not be scanned.
    #[error("malformed edit form: {0}")]
    Parse(String),

    /// The site record does not form a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl RemoteError {
    /// Create a Transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a Status error.
    pub fn status(status: u16, path: impl Into<String>) -> Self {
        Self::Status {
            status,
            path: path.into(),
        }
    }

    /// Create a Parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an InvalidUrl error.
    pub fn invalid_url(msg: impl Into<String>) -> Self {
        Self::InvalidUrl(msg.into())
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Remote result type.
pub type RemoteResult<T> = Result<T, RemoteError>;
