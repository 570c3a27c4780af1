// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Error types for the Cal.com integration.
//!
//! [`ClassifiedError`] is the terminal form of a failed upstream call.
//! [`CalComError`] is what the client and service return; its
//! [`code`](CalComError::code) is the machine-readable kind shown to callers.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Which side of the wire an upstream failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamKind {
    /// No response was received (connect failure, timeout, broken body).
    Network,
    /// 4xx, the request itself was wrong.
    Client,
    /// 5xx, the service failed.
    Server,
    /// Any other non-2xx status.
    Other,
}

impl UpstreamKind {
    pub fn from_status(status: Option<u16>) -> Self {
        match status {
            None => Self::Network,
            Some(400..=499) => Self::Client,
            Some(500..=599) => Self::Server,
            Some(_) => Self::Other,
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "upstream_network_error",
            Self::Client => "upstream_client_error",
            Self::Server => "upstream_server_error",
            Self::Other => "upstream_error",
        }
    }
}

impl fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal upstream failure.  Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ClassifiedError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Error code supplied by Cal.com in the response body, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ClassifiedError {
    /// Failure with no response at all.
    pub fn network(detail: impl fmt::Display) -> Self {
        Self {
            message: format!("network error: {detail}"),
            status_code: None,
            code: None,
        }
    }

    /// Failure carrying a non-2xx status.  The message and code are lifted
    /// from the body when Cal.com supplied them.
    pub fn from_response(status: u16, body: &str) -> Self {
        let (message, code) = upstream_error_fields(body);
        Self {
            message: message.unwrap_or_else(|| format!("HTTP {status} error")),
            status_code: Some(status),
            code,
        }
    }

    pub fn kind(&self) -> UpstreamKind {
        UpstreamKind::from_status(self.status_code)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Pull `(message, code)` out of the error shapes Cal.com uses:
/// `{"error":{"code":..,"message":..}}`, `{"error":"..."}` and
/// `{"message":"..","code":..}`.
fn upstream_error_fields(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, None);
    };

    let (mut message, mut code) = match value.get("error") {
        Some(Value::Object(err)) => (
            err.get("message").and_then(non_empty_str),
            err.get("code").and_then(scalar_string),
        ),
        Some(other) => (non_empty_str(other), None),
        None => (None, None),
    };
    if message.is_none() {
        message = value.get("message").and_then(non_empty_str);
    }
    if code.is_none() {
        code = value.get("code").and_then(scalar_string);
    }
    (message, code)
}

fn non_empty_str(v: &Value) -> Option<String> {
    v.as_str().filter(|s| !s.trim().is_empty()).map(str::to_string)
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Everything the Cal.com client and service can fail with.
#[derive(Debug, Clone, Error)]
pub enum CalComError {
    /// Caller input was malformed or incomplete.  Never retried.
    #[error("{0}")]
    Validation(String),

    /// The upstream call failed terminally (after retries where applicable).
    #[error(transparent)]
    Upstream(#[from] ClassifiedError),

    /// A referenced id is absent from a freshly fetched list.
    #[error("{0}")]
    NotFound(String),

    /// A 2xx body that could not be parsed into the expected shape.
    #[error("invalid response from Cal.com: {0}")]
    InvalidResponse(String),
}

impl CalComError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Machine-readable error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Upstream(e) => e.kind().as_str(),
            Self::NotFound(_) => "not_found",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Upstream(e) => e.status_code,
            _ => None,
        }
    }

    /// Structured payload returned to tool callers.
    pub fn to_payload(&self) -> Value {
        let mut error = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Self::Upstream(e) = self {
            if let Some(status) = e.status_code {
                error["statusCode"] = json!(status);
            }
            if let Some(code) = &e.code {
                error["upstreamCode"] = json!(code);
            }
        }
        json!({ "error": error })
    }
}
