// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// Serde default helper returning `true`.
///
/// `#[serde(default)]` on a `bool` always falls back to `false`, so a named
/// function is required for fields that are on unless switched off.
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub calcom: CalComConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Copy of the config that is safe to print: the explicit API key, if any,
    /// is replaced by a placeholder.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.calcom.api_key.is_some() {
            cfg.calcom.api_key = Some("<redacted>".to_string());
        }
        cfg
    }
}

/// How the token is attached to `GET /v1/event-types`.
///
/// The v1 and v2 Cal.com APIs historically authenticate differently; the
/// slots endpoints always use a bearer header, only the event-type listing is
/// configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventTypesAuth {
    /// `Authorization: Bearer <token>`
    #[default]
    Bearer,
    /// `?apiKey=<token>`
    Query,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalComConfig {
    /// Set to false to keep the integration out of the server even when an
    /// API key is available.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base URL of the Cal.com API.  Overridden by `CALCOM_API_URL`.
    #[serde(default = "CalComConfig::default_api_url")]
    pub api_url: String,
    /// Environment variable that holds the API key (read at runtime)
    #[serde(default = "CalComConfig::default_api_key_env")]
    pub api_key_env: String,
    /// Explicit API key; prefer api_key_env in config files to avoid secrets
    /// in version-controlled files
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "CalComConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub event_types_auth: EventTypesAuth,
}

impl CalComConfig {
    pub const DEFAULT_API_URL: &'static str = "https://api.cal.com";
    pub const DEFAULT_API_KEY_ENV: &'static str = "CALCOM_API_KEY";

    fn default_api_url() -> String {
        Self::DEFAULT_API_URL.to_string()
    }

    fn default_api_key_env() -> String {
        Self::DEFAULT_API_KEY_ENV.to_string()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    /// Resolve the bearer token: the explicit `api_key` wins, otherwise the
    /// variable named by `api_key_env`.  Blank values count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

impl Default for CalComConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: Self::default_api_url(),
            api_key_env: Self::default_api_key_env(),
            api_key: None,
            timeout_secs: Self::default_timeout_secs(),
            event_types_auth: EventTypesAuth::default(),
        }
    }
}

/// Raw retry settings.  Validated into a policy by the HTTP client crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "RetryConfig::default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "RetryConfig::default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryConfig {
    fn default_max_attempts() -> u32 {
        3
    }
    fn default_base_delay_ms() -> u64 {
        1_000
    }
    fn default_max_delay_ms() -> u64 {
        10_000
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            base_delay_ms: Self::default_base_delay_ms(),
            max_delay_ms: Self::default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Name reported in the startup log line
    #[serde(default = "ServerConfig::default_name")]
    pub name: String,
    /// Replaces the built-in MCP `instructions` string when set
    #[serde(default)]
    pub instructions: Option<String>,
}

impl ServerConfig {
    fn default_name() -> String {
        "slotline".to_string()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            instructions: None,
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
