// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::fmt;

use slotline_config::EventTypesAuth;
use tracing::{debug, info};

use crate::error::CalComError;
use crate::http::{HttpRequest, RetryableHttpClient};
use crate::types::{
    parse_event_types, parse_slots, EventType, EventTypeSlots, SelectionOption, SlotSet,
};

/// Version pinned on every `/v2/slots` call.
pub const API_VERSION: &str = "2024-09-04";

const EVENT_TYPES_PATH: &str = "/v1/event-types";
const SLOTS_PATH: &str = "/v2/slots";

/// Typed access to the Cal.com endpoints used for availability.
///
/// Stateless apart from its configuration; every call goes to the network.
pub struct CalComClient {
    http: RetryableHttpClient,
    api_key: String,
    event_types_auth: EventTypesAuth,
}

impl fmt::Debug for CalComClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalComClient")
            .field("api_key", &"[redacted]")
            .field("event_types_auth", &self.event_types_auth)
            .finish_non_exhaustive()
    }
}

impl CalComClient {
    pub fn new(http: RetryableHttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            event_types_auth: EventTypesAuth::default(),
        }
    }

    /// How the key is presented to the event-types endpoint.
    pub fn with_event_types_auth(mut self, auth: EventTypesAuth) -> Self {
        self.event_types_auth = auth;
        self
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// All event types visible to the key, hidden ones included.
    pub async fn list_event_types(&self) -> Result<Vec<EventType>, CalComError> {
        let req = HttpRequest::get(EVENT_TYPES_PATH).header("Content-Type", "application/json");
        let req = match self.event_types_auth {
            EventTypesAuth::Bearer => req.header("Authorization", self.bearer()),
            EventTypesAuth::Query => req.query("apiKey", self.api_key.as_str()),
        };
        let body = self.http.execute(&req).await?;
        let list = parse_event_types(&body)?;
        debug!(count = list.len(), "fetched event types");
        Ok(list)
    }

    fn slots_request(&self) -> HttpRequest {
        HttpRequest::get(SLOTS_PATH)
            .header("cal-api-version", API_VERSION)
            .header("Accept", "application/json")
            .header("Authorization", self.bearer())
    }

    /// Open slots for one event type in `[start, end]`.
    pub async fn list_slots_by_type(
        &self,
        event_type_id: i64,
        start: &str,
        end: &str,
        time_zone: &str,
    ) -> Result<SlotSet, CalComError> {
        let req = self
            .slots_request()
            .query("eventTypeId", event_type_id.to_string())
            .query("start", start)
            .query("end", end)
            .query("timeZone", time_zone);
        let body = self.http.execute(&req).await?;
        parse_slots(&body)
    }

    /// Open slots for a user's event type addressed by slug.
    pub async fn list_slots_by_user(
        &self,
        username: &str,
        event_type_slug: &str,
        start: &str,
        end: &str,
        time_zone: &str,
    ) -> Result<SlotSet, CalComError> {
        let req = self
            .slots_request()
            .query("username", username)
            .query("eventTypeSlug", event_type_slug)
            .query("start", start)
            .query("end", end)
            .query("timeZone", time_zone);
        let body = self.http.execute(&req).await?;
        parse_slots(&body)
    }

    /// Visible event types as selection options, ordered by title.
    pub async fn list_selection_options(&self) -> Result<Vec<SelectionOption>, CalComError> {
        let mut options: Vec<SelectionOption> = self
            .list_event_types()
            .await?
            .iter()
            .filter(|et| !et.hidden)
            .map(SelectionOption::from)
            .collect();
        options.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(options)
    }

    /// Look the type up in a fresh listing, then fetch its slots.
    ///
    /// The two calls are not atomic: the type can change upstream between
    /// them.  Hidden types are still resolvable by id.
    pub async fn resolve_type_and_slots(
        &self,
        event_type_id: i64,
        start: &str,
        end: &str,
        time_zone: &str,
    ) -> Result<EventTypeSlots, CalComError> {
        let event_type = self
            .list_event_types()
            .await?
            .into_iter()
            .find(|et| et.id == event_type_id)
            .ok_or_else(|| {
                CalComError::NotFound(format!("event type {event_type_id} not found"))
            })?;

        let slots = self
            .list_slots_by_type(event_type_id, start, end, time_zone)
            .await?;
        info!(
            event_type_id,
            days = slots.len(),
            slots = slots.values().map(Vec::len).sum::<usize>(),
            "resolved event type slots"
        );
        Ok(EventTypeSlots { event_type, slots })
    }
}
