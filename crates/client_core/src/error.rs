use std::{path::PathBuf, time::Duration};

use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid api base url '{0}'")]
    InvalidBaseUrl(String),
    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("server rejected request: {0}")]
    Rejected(ApiError),
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidBaseUrl(_) | Self::InvalidUrl(_) => ErrorCode::Validation,
            Self::Network(err) if err.is_timeout() => ErrorCode::Timeout,
            Self::Network(_) => ErrorCode::Transport,
            Self::Status { status, .. } => ErrorCode::from_status(*status),
            Self::Rejected(error) => error.code,
            Self::Decode(_) => ErrorCode::Internal,
            Self::Timeout(_) => ErrorCode::Timeout,
        }
    }
}

impl From<&TransportError> for ApiError {
    fn from(value: &TransportError) -> Self {
        match value {
            TransportError::Rejected(error) => error.clone(),
            other => ApiError::new(other.code(), other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to access session storage at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode session snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}
