// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Cal.com wire types and the caller-facing selection view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CalComError;

/// A bookable meeting template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    /// Duration in minutes.
    #[serde(alias = "lengthInMinutes")]
    pub length: u32,
    #[serde(default)]
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_confirmation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl EventType {
    pub fn is_team_event(&self) -> bool {
        self.team_id.is_some() || self.team.is_some()
    }

    pub fn team_name(&self) -> Option<&str> {
        self.team
            .as_ref()
            .and_then(|t| t.name.as_deref())
            .filter(|n| !n.trim().is_empty())
    }
}

/// One bookable start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(alias = "time")]
    pub start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(alias = "attendees", skip_serializing_if = "Option::is_none")]
    pub attendees_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
}

impl Slot {
    pub fn at(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: None,
            attendees_count: None,
            booking_uid: None,
            users: None,
        }
    }
}

/// Slots grouped by date key (`YYYY-MM-DD`), in upstream order within a day.
pub type SlotSet = BTreeMap<String, Vec<Slot>>;

/// Presentation view of an [`EventType`] for choosing what to book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionOption {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Duration in minutes.
    pub duration: u32,
}

impl From<&EventType> for SelectionOption {
    fn from(et: &EventType) -> Self {
        Self {
            id: et.id,
            title: et.title.clone(),
            description: describe(et),
            duration: et.length,
        }
    }
}

const SEPARATOR: &str = " • ";

fn describe(et: &EventType) -> String {
    let mut parts = vec![format_duration(et.length)];
    if et.requires_confirmation == Some(true) {
        parts.push("Requires confirmation".to_string());
    }
    if let Some(name) = et.team_name() {
        parts.push(format!("Team: {name}"));
    } else if et.is_team_event() {
        parts.push("Team event".to_string());
    }
    if let Some(price) = et.price.filter(|p| *p > 0.0) {
        let amount = format_amount(price);
        match et.currency.as_deref().filter(|c| !c.is_empty()) {
            Some(cur) => parts.push(format!("Price: {amount} {}", cur.to_uppercase())),
            None => parts.push(format!("Price: {amount}")),
        }
    }
    parts.join(SEPARATOR)
}

fn format_amount(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{price:.0}")
    } else {
        format!("{price:.2}")
    }
}

/// Human-readable duration: `45 minutes`, `1 hour`, `1 hour 30 minutes`.
pub fn format_duration(minutes: u32) -> String {
    fn unit(n: u32, singular: &str) -> String {
        if n == 1 {
            format!("1 {singular}")
        } else {
            format!("{n} {singular}s")
        }
    }
    let (hours, rest) = (minutes / 60, minutes % 60);
    match (hours, rest) {
        (0, m) => unit(m, "minute"),
        (h, 0) => unit(h, "hour"),
        (h, m) => format!("{} {}", unit(h, "hour"), unit(m, "minute")),
    }
}

/// Result of the two-step lookup: the chosen type and its open slots.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeSlots {
    pub event_type: EventType,
    pub slots: SlotSet,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventTypesBody {
    Bare(Vec<EventType>),
    Wrapped { event_types: Vec<EventType> },
    Data { data: Vec<EventType> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SlotsBody {
    Wrapped { slots: SlotSet },
    Data { data: SlotSet },
}

/// Parse a `/event-types` body.  Accepts a bare array, `{"event_types":[..]}`
/// and `{"data":[..]}`.
pub fn parse_event_types(body: &str) -> Result<Vec<EventType>, CalComError> {
    let parsed: EventTypesBody = serde_json::from_str(body)
        .map_err(|e| CalComError::InvalidResponse(format!("event types: {e}")))?;
    Ok(match parsed {
        EventTypesBody::Bare(list)
        | EventTypesBody::Wrapped { event_types: list }
        | EventTypesBody::Data { data: list } => list,
    })
}

/// Parse a `/slots` body.  Accepts `{"slots":{..}}` and `{"data":{..}}`.
pub fn parse_slots(body: &str) -> Result<SlotSet, CalComError> {
    let parsed: SlotsBody = serde_json::from_str(body)
        .map_err(|e| CalComError::InvalidResponse(format!("slots: {e}")))?;
    Ok(match parsed {
        SlotsBody::Wrapped { slots } | SlotsBody::Data { data: slots } => slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_type(id: i64, title: &str, length: u32) -> EventType {
        EventType {
            id,
            title: title.into(),
            slug: title.to_lowercase().replace(' ', "-"),
            length,
            hidden: false,
            requires_confirmation: None,
            team_id: None,
            team: None,
            price: None,
            currency: None,
        }
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(1), "1 minute");
        assert_eq!(format_duration(45), "45 minutes");
        assert_eq!(format_duration(60), "1 hour");
        assert_eq!(format_duration(90), "1 hour 30 minutes");
        assert_eq!(format_duration(120), "2 hours");
        assert_eq!(format_duration(121), "2 hours 1 minute");
        assert_eq!(format_duration(0), "0 minutes");
    }

    #[test]
    fn plain_description_is_just_duration() {
        let opt = SelectionOption::from(&event_type(1, "Intro", 30));
        assert_eq!(opt.description, "30 minutes");
        assert_eq!(opt.duration, 30);
        assert_eq!(opt.id, 1);
        assert_eq!(opt.title, "Intro");
    }

    #[test]
    fn description_lists_confirmation_team_and_price() {
        let mut et = event_type(7, "Consult", 90);
        et.requires_confirmation = Some(true);
        et.team = Some(TeamInfo { id: Some(3), name: Some("Sales".into()), slug: None });
        et.price = Some(50.0);
        et.currency = Some("usd".into());
        let opt = SelectionOption::from(&et);
        assert_eq!(
            opt.description,
            "1 hour 30 minutes • Requires confirmation • Team: Sales • Price: 50 USD"
        );
    }

    #[test]
    fn team_id_without_name_is_a_team_event() {
        let mut et = event_type(7, "Standup", 15);
        et.team_id = Some(12);
        assert_eq!(SelectionOption::from(&et).description, "15 minutes • Team event");
    }

    #[test]
    fn zero_price_is_omitted() {
        let mut et = event_type(7, "Free", 20);
        et.price = Some(0.0);
        et.currency = Some("eur".into());
        assert_eq!(SelectionOption::from(&et).description, "20 minutes");
    }

    #[test]
    fn fractional_price_keeps_cents() {
        let mut et = event_type(7, "Paid", 60);
        et.price = Some(12.5);
        assert_eq!(SelectionOption::from(&et).description, "1 hour • Price: 12.50");
    }

    #[test]
    fn event_types_bare_array() {
        let list = parse_event_types(r#"[{"id":1,"title":"A","slug":"a","length":30}]"#).unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list[0].hidden);
    }

    #[test]
    fn event_types_v1_envelope() {
        let body = r#"{"event_types":[
            {"id":1,"title":"A","slug":"a","length":30,"hidden":true,"requiresConfirmation":true},
            {"id":2,"title":"B","slug":"b","length":60,"teamId":4,"price":0,"currency":"usd"}
        ]}"#;
        let list = parse_event_types(body).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].hidden);
        assert_eq!(list[0].requires_confirmation, Some(true));
        assert_eq!(list[1].team_id, Some(4));
    }

    #[test]
    fn event_types_data_envelope_with_length_in_minutes() {
        let body = r#"{"status":"success","data":[{"id":5,"title":"C","slug":"c","lengthInMinutes":45}]}"#;
        let list = parse_event_types(body).unwrap();
        assert_eq!(list[0].length, 45);
    }

    #[test]
    fn event_types_garbage_is_invalid_response() {
        let err = parse_event_types(r#"{"unexpected":true}"#).unwrap_err();
        assert_eq!(err.code(), "invalid_response");
        assert!(parse_event_types("not json").is_err());
    }

    #[test]
    fn slots_v2_data_envelope() {
        let body = r#"{"status":"success","data":{
            "2050-09-06":[{"start":"2050-09-06T09:00:00.000Z"}],
            "2050-09-05":[{"start":"2050-09-05T09:00:00.000Z"},{"start":"2050-09-05T10:00:00.000Z"}]
        }}"#;
        let slots = parse_slots(body).unwrap();
        let days: Vec<_> = slots.keys().cloned().collect();
        assert_eq!(days, vec!["2050-09-05", "2050-09-06"]);
        assert_eq!(slots["2050-09-05"][1].start, "2050-09-05T10:00:00.000Z");
    }

    #[test]
    fn slots_v1_envelope_uses_time_alias() {
        let body = r#"{"slots":{"2024-01-15":[{"time":"2024-01-15T09:00:00Z","attendees":2,"bookingUid":"abc"}]}}"#;
        let slots = parse_slots(body).unwrap();
        let slot = &slots["2024-01-15"][0];
        assert_eq!(slot.start, "2024-01-15T09:00:00Z");
        assert_eq!(slot.attendees_count, Some(2));
        assert_eq!(slot.booking_uid.as_deref(), Some("abc"));
    }

    #[test]
    fn empty_slots_object_is_valid() {
        assert!(parse_slots(r#"{"slots":{}}"#).unwrap().is_empty());
    }

    #[test]
    fn slots_missing_envelope_is_invalid_response() {
        assert_eq!(parse_slots("[]").unwrap_err().code(), "invalid_response");
    }

    #[test]
    fn slot_serializes_without_empty_optionals() {
        let v = serde_json::to_value(Slot::at("2050-01-01T00:00:00Z")).unwrap();
        assert_eq!(v, serde_json::json!({ "start": "2050-01-01T00:00:00Z" }));
    }
}
