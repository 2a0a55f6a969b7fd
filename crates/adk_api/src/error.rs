use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Error as JsonError, Value};

#[derive(Debug)]
pub enum AdkApiError {
    Request(reqwest::Error),
    Status(StatusCode, String),
    StreamTransport {
        status: Option<StatusCode>,
        message: String,
    },
    Serde(JsonError),
    Cancelled,
}

impl AdkApiError {
    /// True for the 404-equivalent outcome of a session call.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status(status, _) if *status == StatusCode::NOT_FOUND)
    }
}

/// Error body shape emitted by the gateway's HTTP layer.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub detail: Option<Value>,
}

impl fmt::Display for AdkApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::StreamTransport { status, message } => match status {
                Some(status) => write!(f, "streaming request failed (HTTP {status}): {message}"),
                None => write!(f, "streaming request failed: {message}"),
            },
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for AdkApiError {}

impl From<reqwest::Error> for AdkApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for AdkApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Extract a displayable message from a gateway error body.
///
/// The gateway wraps failures as `{"detail": ...}`; a string detail is used
/// verbatim, any other non-null detail is rendered as JSON, and unparseable
/// or empty bodies fall back to the HTTP status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        match payload.detail {
            Some(Value::String(message)) if !message.trim().is_empty() => return message,
            Some(Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
