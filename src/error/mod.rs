// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types and the response classifier.
//!
//! Every non-2xx response coming back from the Linode API is normalised into an
//! [`ApiError`] by [`classify`]. The retry engine inspects that value to decide
//! whether a request is worth repeating, and callers receive it unchanged once
//! retries are exhausted.
//!
//! # Example
//!
//! ```
//! use linode_api_rs::error::{classify, RawResponse};
//! use http::{HeaderMap, StatusCode};
//!
//! let response = RawResponse::new(
//!     StatusCode::BAD_GATEWAY,
//!     HeaderMap::new(),
//!     "<html><body>502 Bad Gateway</body></html>",
//! );
//!
//! let err = classify(&response).expect("non-2xx responses always classify");
//! assert_eq!(err.code(), 502);
//! assert_eq!(err.message(), "Bad Gateway");
//! ```

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resources::Event;

/// Upper bound on the body text kept in [`ApiError::raw_message`].
pub const MAX_RAW_MESSAGE_LEN: usize = 4096;

#[allow(clippy::result_large_err)]
#[derive(Debug, Error)]
pub enum LinodeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Request hook failed: {0}")]
    Hook(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timed out after {timeout:?} waiting for {what}")]
    PollTimeout { what: String, timeout: Duration },

    #[error("Cancelled while waiting for {0}")]
    Cancelled(String),

    #[error("{message}")]
    EventFailed { message: String, event: Box<Event> },
}

impl LinodeError {
    /// HTTP status of a classified API error, if this is one.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LinodeError::Api(err) => Some(err.code()),
            LinodeError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The classified API error, if this is one.
    #[must_use]
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            LinodeError::Api(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LinodeError>;

/// Returns `true` when `err` is an API error with status 404.
#[must_use]
pub fn is_not_found(err: &LinodeError) -> bool {
    has_status(err, &[StatusCode::NOT_FOUND.as_u16()])
}

/// Returns `true` when `err` is an API error whose status is one of `codes`.
#[must_use]
pub fn has_status(err: &LinodeError, codes: &[u16]) -> bool {
    match err.as_api_error() {
        Some(api) => codes.contains(&api.code()),
        None => false,
    }
}

// =============================================================================
// ApiError
// =============================================================================

/// A single entry of the `errors` array in an API error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReason {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub reason: String,
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) if !field.is_empty() => write!(f, "[{}] {}", field, self.reason),
            _ => f.write_str(&self.reason),
        }
    }
}

/// Normalised representation of a failed HTTP call.
///
/// Built once per failed response and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    code: u16,
    message: String,
    reasons: Vec<ErrorReason>,
    raw_message: Option<String>,
}

impl ApiError {
    /// Build an error from a status and its reasons.
    #[must_use]
    pub fn new(code: u16, reasons: Vec<ErrorReason>) -> Self {
        let message = match reasons.first() {
            Some(reason) => reason.to_string(),
            None => status_text(code).to_string(),
        };
        Self {
            code,
            message,
            reasons,
            raw_message: None,
        }
    }

    /// Build an error that only carries the status line.
    #[must_use]
    pub fn from_status(code: u16) -> Self {
        Self::new(code, Vec::new())
    }

    /// HTTP status code.
    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Human readable message: the first reason, or the raw fallback.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// All reasons returned by the API, in order.
    #[must_use]
    pub fn reasons(&self) -> &[ErrorReason] {
        &self.reasons
    }

    /// Truncated body text, set when the body was JSON without an `errors` array.
    #[must_use]
    pub fn raw_message(&self) -> Option<&str> {
        self.raw_message.as_deref()
    }

    /// Returns `true` if any reason contains `needle`, ignoring ASCII case.
    #[must_use]
    pub fn has_reason_containing(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.reasons
            .iter()
            .any(|r| r.reason.to_ascii_lowercase().contains(&needle))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:03}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Classifier
// =============================================================================

/// A fully-read HTTP response, independent of the transport that produced it.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    /// Create a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Value of a header as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    errors: Option<Vec<ErrorReason>>,
}

/// Classify a response.
///
/// Returns `None` for 2xx responses and a populated [`ApiError`] for anything
/// else. Never fails: bodies that are not JSON fall back to the status text,
/// JSON bodies without an `errors` array keep a truncated copy of the body.
#[must_use]
pub fn classify(response: &RawResponse) -> Option<ApiError> {
    if response.status.is_success() {
        return None;
    }

    let code = response.status.as_u16();
    if response.body.is_empty() {
        return Some(ApiError::from_status(code));
    }

    match serde_json::from_slice::<serde_json::Value>(&response.body) {
        Err(_) => Some(ApiError::from_status(code)),
        Ok(value) => match serde_json::from_value::<ErrorBody>(value) {
            Ok(ErrorBody {
                errors: Some(reasons),
            }) if !reasons.is_empty() => Some(ApiError::new(code, reasons)),
            Ok(ErrorBody {
                errors: Some(_), ..
            }) => Some(ApiError::from_status(code)),
            _ => {
                let text = String::from_utf8_lossy(&response.body);
                let raw = truncate(&text, MAX_RAW_MESSAGE_LEN).to_string();
                Some(ApiError {
                    code,
                    message: raw.clone(),
                    reasons: Vec::new(),
                    raw_message: Some(raw),
                })
            }
        },
    }
}

/// Standard reason phrase for a status code.
#[must_use]
pub fn status_text(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status")
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
