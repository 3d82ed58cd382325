//! Error types for the Clarify API client.
//!
//! # Design
//! There are two runtime failure classes. Transport failures (DNS, connect,
//! timeout) come straight from reqwest and are wrapped without modification.
//! Any response with status >= 400 is reclassified into `ApiError`, even
//! though the transport itself succeeded. Configuration errors only occur at
//! construction time.

use std::fmt;

use reqwest::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by `Client` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The client could not be constructed (missing token, bad header text).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The HTTP layer failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with status >= 400.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl Error {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(err) => Some(err.status),
            Error::Transport(err) => err.status().map(|s| s.as_u16()),
            Error::Configuration(_) | Error::Serialization(_) => None,
        }
    }

    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// Application-level failure reported by the Clarify service.
///
/// `message` is taken from the body's `status` field, falling back to its
/// `message` field and then to the canonical reason phrase of the HTTP status.
/// Every field of the error body is captured in `extra` so callers can read
/// service-specific details without this crate knowing the full schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub extra: Map<String, Value>,
    pub body: Value,
}

impl ApiError {
    /// Build an `ApiError` from a status code and the raw response body.
    pub fn from_response(status: u16, raw: &str) -> Self {
        let body = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| {
            if raw.is_empty() {
                Value::Null
            } else {
                Value::String(raw.to_string())
            }
        });

        let extra = match &body {
            Value::Object(fields) => fields.clone(),
            _ => Map::new(),
        };

        let message = ["status", "message"]
            .iter()
            .find_map(|key| extra.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| canonical_reason(status));

        Self {
            status,
            message,
            extra,
            body,
        }
    }

    /// Read a field captured from the error body.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.extra.get(field)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

fn canonical_reason(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
