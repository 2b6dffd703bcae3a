use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of transport errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// HTTP 401; the session has already been invalidated when this is seen
    Unauthorized,
    /// Any other non-2xx status
    HttpStatus,
    /// Connection or request timeout
    Timeout,
    /// Could not reach the backend
    Connection,
    /// Request could not be built or sent
    Request,
    /// Response body did not match the expected shape
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Unauthorized => write!(f, "unauthorized"),
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Connection => write!(f, "connection"),
            ApiErrorKind::Request => write!(f, "request"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Transport-level failure from the HTTP client adapter.
///
/// Domain rejections (`responseCode != "00"`) are not errors; they come back
/// as [`BankResponse`](super::types::BankResponse) data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// HTTP status when one was received
    pub status: Option<u16>,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            details: None,
        }
    }

    /// Creates the error for a 401 response.
    pub fn unauthorized(body: &str) -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            status: Some(401),
            message: "HTTP 401: session expired or not authorized".to_string(),
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    /// Creates an HTTP status error.
    ///
    /// Pulls a readable message out of JSON bodies when the backend sends one
    /// (`responseMessage`, `message` or `error`).
    pub fn http_status(status: u16, body: &str) -> Self {
        let details = (!body.is_empty()).then(|| body.to_string());
        let message = match extract_message(body) {
            Some(msg) => format!("HTTP {status}: {msg}"),
            None => format!("HTTP {status}"),
        };
        Self {
            kind: ApiErrorKind::HttpStatus,
            status: Some(status),
            message,
            details,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    /// Classifies a reqwest error into an `ApiError`.
    pub(crate) fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::new(ApiErrorKind::Timeout, format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::new(ApiErrorKind::Connection, format!("Connection failed: {e}"))
        } else if e.is_decode() {
            Self::parse(format!("Failed to decode response: {e}"))
        } else {
            Self::new(ApiErrorKind::Request, format!("Request error: {e}"))
        }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    ["responseMessage", "message", "error"]
        .iter()
        .find_map(|key| json.get(*key).and_then(Value::as_str))
        .filter(|msg| !msg.trim().is_empty())
        .map(str::to_string)
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
