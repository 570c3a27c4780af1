// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use slotline_tools::{PromptTemplate, Resource, Tool, ToolCall, ToolOutput};
use tracing::{debug, warn};

use crate::error::CalComError;
use crate::service::AvailabilityService;

pub const LIST_EVENT_TYPES: &str = "calcom_list_event_types";
pub const GET_EVENT_TYPE_SLOTS: &str = "calcom_get_event_type_slots";
pub const GET_AVAILABLE_SLOTS: &str = "calcom_get_available_slots";
pub const EVENT_TYPES_URI: &str = "calcom://event-types";
pub const SCHEDULE_PROMPT: &str = "calcom_schedule_meeting";

fn render<T: Serialize>(call: &ToolCall, result: Result<T, CalComError>) -> ToolOutput {
    match result.and_then(|v| {
        serde_json::to_value(v).map_err(|e| CalComError::InvalidResponse(e.to_string()))
    }) {
        Ok(value) => ToolOutput::json(&call.id, &value),
        Err(e) => {
            if e.is_validation() {
                debug!(tool = %call.name, error = %e, "rejected tool arguments");
            } else {
                warn!(tool = %call.name, code = e.code(), error = %e, "tool call failed");
            }
            let text = serde_json::to_string_pretty(&e.to_payload())
                .unwrap_or_else(|_| e.to_string());
            ToolOutput::err(&call.id, text)
        }
    }
}

fn window_properties() -> serde_json::Map<String, Value> {
    let mut props = serde_json::Map::new();
    props.insert(
        "start".into(),
        json!({
            "type": "string",
            "description": "Window start, ISO-8601 datetime (e.g. 2025-05-01T00:00:00Z)"
        }),
    );
    props.insert(
        "end".into(),
        json!({
            "type": "string",
            "description": "Window end, ISO-8601 datetime (e.g. 2025-05-07T23:59:59Z)"
        }),
    );
    props.insert(
        "timeZone".into(),
        json!({
            "type": "string",
            "description": "IANA time zone for the returned slots (default UTC)"
        }),
    );
    props
}

// ─── calcom_list_event_types ─────────────────────────────────────────────────

pub struct ListEventTypesTool {
    service: Arc<AvailabilityService>,
}

impl ListEventTypesTool {
    pub fn new(service: Arc<AvailabilityService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for ListEventTypesTool {
    fn name(&self) -> &str { LIST_EVENT_TYPES }

    fn description(&self) -> &str {
        "Lists the bookable Cal.com event types as selection options, sorted by title. \
         Step 1 of scheduling: show these to the user, then pass the chosen id to \
         calcom_get_event_type_slots."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let result = self
            .service
            .get_selection_options()
            .await
            .map(|options| json!({ "count": options.len(), "eventTypes": options }));
        render(call, result)
    }
}

// ─── calcom_get_event_type_slots ─────────────────────────────────────────────

pub struct GetEventTypeSlotsTool {
    service: Arc<AvailabilityService>,
}

impl GetEventTypeSlotsTool {
    pub fn new(service: Arc<AvailabilityService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for GetEventTypeSlotsTool {
    fn name(&self) -> &str { GET_EVENT_TYPE_SLOTS }

    fn description(&self) -> &str {
        "Returns the event type with the given id together with its open slots in the \
         requested window, grouped by date. Step 2 of scheduling."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = window_properties();
        props.insert(
            "eventTypeId".into(),
            json!({
                "type": "integer",
                "description": "Id from calcom_list_event_types"
            }),
        );
        json!({
            "type": "object",
            "properties": props,
            "required": ["eventTypeId", "start", "end"]
        })
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let result = self.service.get_slots_for_type(call.args.clone()).await;
        render(call, result)
    }
}

// ─── calcom_get_available_slots ──────────────────────────────────────────────

pub struct GetAvailableSlotsTool {
    service: Arc<AvailabilityService>,
}

impl GetAvailableSlotsTool {
    pub fn new(service: Arc<AvailabilityService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for GetAvailableSlotsTool {
    fn name(&self) -> &str { GET_AVAILABLE_SLOTS }

    fn description(&self) -> &str {
        "Returns open slots in a window, addressed either by username and eventTypeSlug \
         or by eventTypeId. Username and slug take precedence when both are given. \
         Prefer calcom_list_event_types followed by calcom_get_event_type_slots."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = window_properties();
        props.insert(
            "username".into(),
            json!({ "type": "string", "description": "Cal.com username owning the event type" }),
        );
        props.insert(
            "eventTypeSlug".into(),
            json!({ "type": "string", "description": "Event type slug, used with username" }),
        );
        props.insert(
            "eventTypeId".into(),
            json!({ "type": "integer", "description": "Event type id, used when no username/slug" }),
        );
        json!({
            "type": "object",
            "properties": props,
            "required": ["start", "end"]
        })
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let result = self
            .service
            .get_available_slots_legacy(call.args.clone())
            .await
            .map(|slots| json!({ "slots": slots }));
        render(call, result)
    }
}

// ─── calcom://event-types ────────────────────────────────────────────────────

/// The selection list as a readable resource.
pub struct EventTypesResource {
    service: Arc<AvailabilityService>,
}

impl EventTypesResource {
    pub fn new(service: Arc<AvailabilityService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Resource for EventTypesResource {
    fn uri(&self) -> &str { EVENT_TYPES_URI }
    fn name(&self) -> &str { "Cal.com event types" }
    fn description(&self) -> &str { "Bookable event types, sorted by title" }

    async fn read(&self) -> anyhow::Result<String> {
        let options = self.service.get_selection_options().await?;
        Ok(serde_json::to_string_pretty(&options)?)
    }
}

// ─── calcom_schedule_meeting ─────────────────────────────────────────────────

pub fn schedule_prompt() -> PromptTemplate {
    PromptTemplate::new(
        SCHEDULE_PROMPT,
        "Guide the user through picking an event type and an open slot",
        format!(
            "Help the user find a time to meet.\n\
             \n\
             1. Call `{LIST_EVENT_TYPES}` and present the event types as a numbered list \
             using each title and description.\n\
             2. Ask which one they want and for which dates.\n\
             3. Call `{GET_EVENT_TYPE_SLOTS}` with the chosen eventTypeId, an ISO-8601 \
             start and end, and the user's time zone if known.\n\
             4. Present the open slots grouped by day in the user's time zone.\n\
             \n\
             If a call returns an error payload, explain the message to the user. \
             Do not retry validation errors without changing the input."
        ),
    )
}
