//! Error types shared by the data layer.
//!
//! Transport failures are classified exactly once, at the HTTP boundary,
//! into an [`ErrorKind`]. Everything above the client only looks at the
//! kind, its user-facing message and whether a retry makes sense.

use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    Network,
    NotFound,
    RateLimited,
    Server,
    /// Any other non-success status.
    Http(u16),
    Unknown,
}

impl ErrorKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            404 => ErrorKind::NotFound,
            429 => ErrorKind::RateLimited,
            500 | 502 | 503 | 504 => ErrorKind::Server,
            other => ErrorKind::Http(other),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorKind::Timeout
            | ErrorKind::Network
            | ErrorKind::RateLimited
            | ErrorKind::Server
            | ErrorKind::Unknown => true,
            ErrorKind::NotFound | ErrorKind::Http(_) => false,
        }
    }

    /// Message shown to the user.
    pub fn message(&self) -> String {
        match self {
            ErrorKind::Timeout => {
                "The request took too long. Check your internet connection.".to_string()
            }
            ErrorKind::Network => "Connection error. Check your internet connection.".to_string(),
            ErrorKind::NotFound => "The requested resource was not found.".to_string(),
            ErrorKind::RateLimited => "Too many requests. Try again in a few moments.".to_string(),
            ErrorKind::Server => "Server error. Try again later.".to_string(),
            ErrorKind::Http(status) => format!("Server error ({}). Try again.", status),
            ErrorKind::Unknown => "Unexpected error. Try again.".to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "TIMEOUT_ERROR",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::RateLimited => "RATE_LIMIT",
            ErrorKind::Server => "SERVER_ERROR",
            ErrorKind::Http(_) => "HTTP_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified failure talking to the remote API.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    /// Text of the underlying transport error, kept for logs only.
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            message: kind.message(),
            kind,
            detail: None,
        }
    }

    pub fn from_status(status: StatusCode) -> Self {
        Self::new(ErrorKind::from_status(status))
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if let Some(status) = err.status() {
            ErrorKind::from_status(status)
        } else if err.is_connect() || err.is_request() {
            ErrorKind::Network
        } else {
            ErrorKind::Unknown
        };
        ApiError::new(kind).with_detail(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::new(ErrorKind::Unknown).with_detail(err.to_string())
    }
}

/// Failures of the local key-value persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
