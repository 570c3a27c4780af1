// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! HTTP plumbing: a single-attempt [`HttpTransport`] and the
//! [`RetryableHttpClient`] that wraps it with classification and backoff.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ClassifiedError;
use crate::retry::RetryPolicy;

/// One outbound request, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was obtained.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Performs exactly one attempt.  Retrying is the caller's business.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by `reqwest`.
pub struct ReqwestTransport {
    base_url: String,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("slotline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.send().await.map_err(describe_reqwest_error)?;
        let status = resp.status().as_u16();
        // The status line has arrived, so classification follows it even if
        // the body is cut short.
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %url, status, error = %e, "failed to read upstream response body");
                String::new()
            }
        };
        Ok(HttpResponse { status, body })
    }
}

fn describe_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError(format!("request timed out: {e}"))
    } else if e.is_connect() {
        TransportError(format!("connection failed: {e}"))
    } else {
        TransportError(e.to_string())
    }
}

/// Sends requests through a transport, retrying transient failures.
///
/// 2xx returns the body.  4xx and other non-2xx statuses fail at once.
/// 5xx and network failures are retried per the [`RetryPolicy`]; once the
/// attempts run out the last failure is returned.  Dropping the returned
/// future abandons any pending backoff.
#[derive(Clone)]
pub struct RetryableHttpClient {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl RetryableHttpClient {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute(&self, request: &HttpRequest) -> Result<String, ClassifiedError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;
        loop {
            debug!(method = %request.method, path = %request.path, attempt, "upstream request");

            let failure = match self.transport.send(request).await {
                Ok(resp) if resp.is_success() => return Ok(resp.body),
                Ok(resp) => ClassifiedError::from_response(resp.status, &resp.body),
                Err(e) => ClassifiedError::network(e),
            };

            if !failure.is_retryable() {
                debug!(path = %request.path, status = ?failure.status_code, "non-retryable upstream failure");
                return Err(failure);
            }
            if attempt >= max_attempts {
                warn!(
                    path = %request.path,
                    attempts = attempt,
                    status = ?failure.status_code,
                    error = %failure,
                    "upstream request failed; retries exhausted"
                );
                return Err(failure);
            }

            let delay = self.policy.delay_for_attempt(attempt);
            warn!(
                path = %request.path,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                status = ?failure.status_code,
                error = %failure,
                "upstream request failed; retrying after backoff"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
