// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Availability facade used by the tools.
//!
//! Inputs arrive as loosely typed JSON.  They are validated here, before any
//! upstream traffic, so a malformed call always costs zero requests.

use chrono::{DateTime, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::client::CalComClient;
use crate::error::CalComError;
use crate::types::{EventTypeSlots, SelectionOption, SlotSet};

pub const DEFAULT_TIME_ZONE: &str = "UTC";

const MISSING_TARGET: &str = "Either username/typeSlug or typeId must be provided";

/// Arguments of the guided flow: one event type and a window.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsForTypeInput {
    #[serde(alias = "typeId")]
    pub event_type_id: i64,
    #[serde(alias = "startISO")]
    pub start: String,
    #[serde(alias = "endISO")]
    pub end: String,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Arguments of the older calling convention, addressed either by
/// username and slug or by type id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySlotsInput {
    #[serde(alias = "startISO")]
    pub start: String,
    #[serde(alias = "endISO")]
    pub end: String,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "typeSlug")]
    pub event_type_slug: Option<String>,
    #[serde(default, alias = "typeId")]
    pub event_type_id: Option<i64>,
}

enum SlotTarget<'a> {
    User { username: &'a str, slug: &'a str },
    EventType(i64),
}

impl LegacySlotsInput {
    fn target(&self) -> Result<SlotTarget<'_>, CalComError> {
        let username = non_blank(self.username.as_deref());
        let slug = non_blank(self.event_type_slug.as_deref());
        match (username, slug, self.event_type_id) {
            (Some(username), Some(slug), _) => Ok(SlotTarget::User { username, slug }),
            (_, _, Some(id)) => Ok(SlotTarget::EventType(id)),
            _ => Err(CalComError::validation(MISSING_TARGET)),
        }
    }
}

pub struct AvailabilityService {
    client: CalComClient,
}

impl AvailabilityService {
    pub fn new(client: CalComClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CalComClient {
        &self.client
    }

    pub async fn get_selection_options(&self) -> Result<Vec<SelectionOption>, CalComError> {
        self.client.list_selection_options().await
    }

    pub async fn get_slots_for_type(&self, args: Value) -> Result<EventTypeSlots, CalComError> {
        self.slots_for_type(parse_args(args)?).await
    }

    pub async fn get_available_slots_legacy(&self, args: Value) -> Result<SlotSet, CalComError> {
        self.available_slots_legacy(parse_args(args)?).await
    }

    pub async fn slots_for_type(
        &self,
        input: SlotsForTypeInput,
    ) -> Result<EventTypeSlots, CalComError> {
        let start = validate_datetime("start", &input.start)?;
        let end = validate_datetime("end", &input.end)?;
        let tz = resolve_time_zone(input.time_zone.as_deref());
        self.client
            .resolve_type_and_slots(input.event_type_id, start, end, tz)
            .await
    }

    pub async fn available_slots_legacy(
        &self,
        input: LegacySlotsInput,
    ) -> Result<SlotSet, CalComError> {
        let start = validate_datetime("start", &input.start)?;
        let end = validate_datetime("end", &input.end)?;
        let target = input.target()?;
        let tz = resolve_time_zone(input.time_zone.as_deref());
        match target {
            SlotTarget::User { username, slug } => {
                debug!(username, slug, "legacy slots lookup by user");
                self.client
                    .list_slots_by_user(username, slug, start, end, tz)
                    .await
            }
            SlotTarget::EventType(id) => {
                debug!(event_type_id = id, "legacy slots lookup by type");
                self.client
                    .list_slots_by_type(id, start, end, tz)
                    .await
            }
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, CalComError> {
    let args = if args.is_null() { Value::Object(Default::default()) } else { args };
    serde_json::from_value(args)
        .map_err(|e| CalComError::validation(format!("invalid arguments: {e}")))
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn resolve_time_zone(tz: Option<&str>) -> &str {
    non_blank(tz).unwrap_or(DEFAULT_TIME_ZONE)
}

/// Accept RFC 3339 or a naive `YYYY-MM-DDTHH:MM[:SS[.fff]]`, returning the
/// trimmed value that was checked.
fn validate_datetime<'a>(field: &str, value: &'a str) -> Result<&'a str, CalComError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CalComError::validation(format!("{field} is required")));
    }
    let valid = DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok();
    if valid {
        Ok(value)
    } else {
        Err(CalComError::validation(format!(
            "{field} must be an ISO-8601 datetime, got '{value}'"
        )))
    }
}
