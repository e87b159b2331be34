//! API error handling
//!
//! Provides typed errors for requests against the service, with helpers
//! that classify an error (transport, timeout, stale page, task outcome)
//! so callers can decide how to present or recover from it.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Detail string the service returns when a requested page no longer exists
pub const INVALID_PAGE_DETAIL: &str = "Invalid page.";

/// Errors that can occur while talking to the service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network failure before a response was received
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Request was aborted because its deadline passed
    #[error("Request timed out after {}s. Please try again.", after.as_secs())]
    Timeout { after: Duration },

    /// Non-success status without a structured error body
    #[error("HTTP error! Status: {status} - {raw_body}")]
    Http {
        status: u16,
        raw_body: String,
        parsed_body: Option<Value>,
    },

    /// Structured error body returned by the service
    #[error("Request rejected ({status}): {detail}")]
    Validation {
        status: u16,
        detail: String,
        body: Value,
    },

    /// The service reported a terminal failure for a polled task
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// The poll budget ran out before the task reached a terminal state
    #[error("Task timed out after {attempts} status checks")]
    TaskTimedOut { attempts: u32 },

    /// The caller stopped waiting for a task
    #[error("Task polling was cancelled")]
    TaskCancelled,

    /// No session credential could be produced
    #[error("Authentication unavailable: {0}")]
    Auth(String),

    /// A success body did not have the expected shape
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Base URL and path could not be combined into a request URL
    #[error("Invalid request target '{0}'")]
    InvalidTarget(String),
}

impl ApiError {
    /// Build an error from a non-success response
    ///
    /// The body is decoded as JSON when possible. JSON objects are treated as
    /// structured validation errors; anything else is kept as a plain HTTP
    /// error with the raw text.
    pub fn from_response(status: u16, raw_body: String) -> Self {
        let parsed_body = serde_json::from_str::<Value>(&raw_body).ok();

        match parsed_body {
            Some(Value::Object(map)) => {
                let detail = match map.get("detail") {
                    Some(Value::String(detail)) => detail.clone(),
                    _ => summarize_fields(&map),
                };
                ApiError::Validation {
                    status,
                    detail,
                    body: Value::Object(map),
                }
            }
            parsed_body => ApiError::Http {
                status,
                raw_body,
                parsed_body,
            },
        }
    }

    /// Check if the service said the requested page does not exist
    pub fn is_stale_page(&self) -> bool {
        match self {
            ApiError::Validation { detail, .. } => {
                detail.trim_end_matches('.') == INVALID_PAGE_DETAIL.trim_end_matches('.')
            }
            _ => false,
        }
    }

    /// Check if this error happened below the HTTP layer
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Timeout { .. })
    }

    /// Check if this error is a client-side deadline abort
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }

    /// Check if this error describes the outcome of a polled task
    pub fn is_task_outcome(&self) -> bool {
        matches!(
            self,
            ApiError::TaskFailed(_) | ApiError::TaskTimedOut { .. } | ApiError::TaskCancelled
        )
    }

    /// HTTP status reported by the service, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::Validation { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Flatten a field-error object (`{"name": ["required"]}`) into one line
fn summarize_fields(map: &serde_json::Map<String, Value>) -> String {
    let parts: Vec<String> = map
        .iter()
        .map(|(field, value)| {
            let message = match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}: {}", field, message)
        })
        .collect();

    if parts.is_empty() {
        "empty error body".to_string()
    } else {
        parts.join("; ")
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
