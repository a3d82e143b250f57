use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;
use tokio_tungstenite::tungstenite::Error as WsError;

#[derive(Debug)]
pub enum ApiError {
    InvalidUrl(String),
    InvalidHeader(String),
    Connect(String),
    WebSocket(WsError),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
    Timeout,
    /// Socket closed before any terminal event arrived.
    ClosedBeforeTerminal,
    PollExhausted {
        attempts: u32,
        last_status: Option<String>,
    },
    Cancelled,
    Unknown(String),
}

/// Lookup error bodies come in a few shapes depending on the handler.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorPayload {
    Nested { error: ErrorPayloadFields },
    Flat { error: String },
    Message { message: String },
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
    pub code: Option<String>,
}

impl ErrorPayload {
    fn message(&self) -> Option<&str> {
        let message = match self {
            Self::Nested { error } => error.message.as_deref().or(error.code.as_deref()),
            Self::Flat { error } => Some(error.as_str()),
            Self::Message { message } => Some(message.as_str()),
        };
        message.and_then(non_empty_string)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(message) => write!(f, "invalid URL: {message}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Connect(message) => write!(f, "connection failed: {message}"),
            Self::WebSocket(error) => write!(f, "websocket error: {error}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::Timeout => write!(f, "timed out"),
            Self::ClosedBeforeTerminal => {
                write!(f, "connection closed before the stream finished")
            }
            Self::PollExhausted {
                attempts,
                last_status,
            } => {
                let last_status = last_status.as_deref().unwrap_or("n/a");
                write!(
                    f,
                    "job did not finish after {attempts} attempts (last status: {last_status})"
                )
            }
            Self::Cancelled => write!(f, "request was cancelled"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::WebSocket(error) => Some(error),
            Self::Request(error) => Some(error),
            Self::Serde(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for ApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

impl From<WsError> for ApiError {
    fn from(error: WsError) -> Self {
        Self::WebSocket(error)
    }
}

pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload.message() {
            return message.to_owned();
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

fn non_empty_string(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
