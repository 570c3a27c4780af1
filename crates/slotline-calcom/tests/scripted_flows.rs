// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Retry, client and service behaviour against a scripted in-memory transport.
//!
//! The transport replays a fixed list of outcomes and records every request
//! together with the (paused) tokio clock, so backoff timing is asserted
//! exactly and without real waiting.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use slotline_calcom::tools::{GetAvailableSlotsTool, GetEventTypeSlotsTool, ListEventTypesTool};
use slotline_calcom::{
    AvailabilityService, CalComClient, CalComError, HttpRequest, HttpResponse, HttpTransport,
    RetryPolicy, RetryableHttpClient, TransportError,
};
use slotline_config::EventTypesAuth;
use slotline_tools::{Tool, ToolCall};
use tokio::time::Instant;

// ── Scripted transport ────────────────────────────────────────────────────────

type Outcome = Result<HttpResponse, TransportError>;

#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<Outcome>>,
    seen: Mutex<Vec<(HttpRequest, Instant)>>,
}

impl ScriptedTransport {
    fn new(outcomes: Vec<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }

    fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Gaps between consecutive attempts.
    fn gaps(&self) -> Vec<Duration> {
        let seen = self.seen.lock().unwrap();
        seen.windows(2).map(|w| w[1].1 - w[0].1).collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push((request.clone(), Instant::now()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("script exhausted".into())))
    }
}

fn ok(body: &str) -> Outcome {
    Ok(HttpResponse::new(200, body))
}

fn status(code: u16, body: &str) -> Outcome {
    Ok(HttpResponse::new(code, body))
}

fn refused() -> Outcome {
    Err(TransportError("connection refused".into()))
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn retry_client(transport: Arc<ScriptedTransport>, attempts: u32) -> RetryableHttpClient {
    let policy = RetryPolicy::new(attempts, ms(100), ms(1000)).unwrap();
    RetryableHttpClient::new(transport, policy)
}

fn service(outcomes: Vec<Outcome>) -> (AvailabilityService, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new(outcomes);
    let client = CalComClient::new(retry_client(transport.clone(), 3), "cal_test_key");
    (AvailabilityService::new(client), transport)
}

const EVENT_TYPES: &str = r#"{"event_types":[
    {"id":3,"title":"Zebra sync","slug":"zebra","length":30},
    {"id":1,"title":"Intro call","slug":"intro","length":15},
    {"id":2,"title":"Secret","slug":"secret","length":60,"hidden":true},
    {"id":4,"title":"Deep dive","slug":"deep-dive","length":90,"requiresConfirmation":true}
]}"#;

const SLOTS: &str = r#"{"status":"success","data":{
    "2050-09-05":[{"start":"2050-09-05T09:00:00.000Z"},{"start":"2050-09-05T10:00:00.000Z"}]
}}"#;

fn slots_request() -> HttpRequest {
    HttpRequest::get("/v2/slots").query("eventTypeId", "1")
}

// ── Retry client ──────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn server_errors_are_retried_with_exponential_backoff() {
    let transport = ScriptedTransport::new(vec![
        status(503, ""),
        status(503, ""),
        ok(r#"{"slots":{}}"#),
    ]);
    let client = retry_client(transport.clone(), 3);

    let body = client.execute(&slots_request()).await.unwrap();

    assert_eq!(body, r#"{"slots":{}}"#);
    assert_eq!(transport.call_count(), 3);
    assert_eq!(transport.gaps(), vec![ms(100), ms(200)]);
}

#[tokio::test(start_paused = true)]
async fn client_error_is_attempted_exactly_once() {
    let transport = ScriptedTransport::new(vec![
        status(400, r#"{"error":{"code":"BAD_REQUEST","message":"Invalid parameters"}}"#),
        ok("{}"),
    ]);
    let client = retry_client(transport.clone(), 3);

    let err = client.execute(&slots_request()).await.unwrap_err();

    assert_eq!(transport.call_count(), 1);
    assert_eq!(err.message, "Invalid parameters");
    assert_eq!(err.code.as_deref(), Some("BAD_REQUEST"));
    assert_eq!(err.status_code, Some(400));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_report_last_status() {
    let transport = ScriptedTransport::new(vec![
        status(503, ""),
        status(502, ""),
        status(500, r#"{"message":"boom"}"#),
        ok("{}"),
    ]);
    let client = retry_client(transport.clone(), 3);

    let err = client.execute(&slots_request()).await.unwrap_err();

    assert_eq!(transport.call_count(), 3);
    assert_eq!(err.status_code, Some(500));
    assert_eq!(err.message, "boom");
}

#[tokio::test(start_paused = true)]
async fn network_errors_are_retried_like_server_errors() {
    let transport = ScriptedTransport::new(vec![refused(), refused(), ok("[]")]);
    let client = retry_client(transport.clone(), 3);

    assert_eq!(client.execute(&slots_request()).await.unwrap(), "[]");
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn network_exhaustion_has_no_status() {
    let transport = ScriptedTransport::new(vec![refused(), refused()]);
    let client = retry_client(transport.clone(), 2);

    let err = client.execute(&slots_request()).await.unwrap_err();
    assert_eq!(err.status_code, None);
    assert!(err.message.starts_with("network error"), "{}", err.message);
    assert_eq!(transport.gaps(), vec![ms(100)]);
}

#[tokio::test(start_paused = true)]
async fn redirect_status_is_not_retried() {
    let transport = ScriptedTransport::new(vec![status(302, ""), ok("{}")]);
    let client = retry_client(transport.clone(), 3);

    let err = client.execute(&slots_request()).await.unwrap_err();
    assert_eq!(transport.call_count(), 1);
    assert_eq!(err.message, "HTTP 302 error");
}

#[tokio::test(start_paused = true)]
async fn dropping_the_call_stops_further_attempts() {
    let transport = ScriptedTransport::new((0..10).map(|_| status(503, "")).collect());
    let policy = RetryPolicy::new(10, ms(1000), ms(10_000)).unwrap();
    let client = RetryableHttpClient::new(transport.clone(), policy);

    // Attempts at t=0 and t=1000; the third would be at t=3000.
    let res = tokio::time::timeout(ms(1500), client.execute(&slots_request())).await;
    assert!(res.is_err());
    assert_eq!(transport.call_count(), 2);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_calls_keep_separate_attempt_counters() {
    let transport = ScriptedTransport::new(vec![
        status(503, ""),
        status(503, ""),
        ok("a"),
        ok("b"),
    ]);
    let client = retry_client(transport.clone(), 3);

    let req_a = slots_request();
    let req_b = slots_request();
    let (a, b) = tokio::join!(client.execute(&req_a), client.execute(&req_b));
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(transport.call_count(), 4);
}

// ── Client ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn selection_options_hide_hidden_and_sort_by_title() {
    let (svc, transport) = service(vec![ok(EVENT_TYPES)]);

    let options = svc.get_selection_options().await.unwrap();

    let titles: Vec<_> = options.iter().map(|o| o.title.as_str()).collect();
    assert_eq!(titles, vec!["Deep dive", "Intro call", "Zebra sync"]);
    assert_eq!(options[0].description, "1 hour 30 minutes • Requires confirmation");
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn selection_order_does_not_depend_on_upstream_order() {
    let reversed = r#"[
        {"id":4,"title":"Deep dive","slug":"deep-dive","length":90},
        {"id":2,"title":"Secret","slug":"secret","length":60,"hidden":true},
        {"id":1,"title":"Intro call","slug":"intro","length":15},
        {"id":3,"title":"Zebra sync","slug":"zebra","length":30}
    ]"#;
    let shuffled = r#"[
        {"id":1,"title":"Intro call","slug":"intro","length":15},
        {"id":3,"title":"Zebra sync","slug":"zebra","length":30},
        {"id":4,"title":"Deep dive","slug":"deep-dive","length":90}
    ]"#;

    let mut orders = Vec::new();
    for body in [EVENT_TYPES, reversed, shuffled] {
        let (svc, _) = service(vec![ok(body)]);
        let options = svc.get_selection_options().await.unwrap();
        orders.push(options.iter().map(|o| o.id).collect::<Vec<_>>());
    }

    assert_eq!(orders[0], vec![4, 1, 3]);
    assert_eq!(orders[1], orders[0]);
    assert_eq!(orders[2], orders[0]);
}

#[tokio::test]
async fn equal_titles_keep_upstream_order() {
    let body = r#"[
        {"id":7,"title":"Sync","slug":"sync-a","length":30},
        {"id":9,"title":"Alpha","slug":"alpha","length":30},
        {"id":5,"title":"Sync","slug":"sync-b","length":45},
        {"id":6,"title":"Sync","slug":"sync-c","length":60}
    ]"#;
    let (svc, _) = service(vec![ok(body)]);

    let ids: Vec<_> = svc
        .get_selection_options()
        .await
        .unwrap()
        .iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(ids, vec![9, 7, 5, 6]);
}

#[tokio::test]
async fn event_types_request_uses_bearer_by_default() {
    let (svc, transport) = service(vec![ok("[]")]);
    svc.get_selection_options().await.unwrap();

    let req = &transport.requests()[0];
    assert_eq!(req.path, "/v1/event-types");
    assert_eq!(req.header_value("Content-Type"), Some("application/json"));
    assert_eq!(req.header_value("Authorization"), Some("Bearer cal_test_key"));
    assert!(req.query.is_empty());
}

#[tokio::test]
async fn event_types_request_can_use_query_key() {
    let transport = ScriptedTransport::new(vec![ok("[]")]);
    let client = CalComClient::new(retry_client(transport.clone(), 1), "cal_test_key")
        .with_event_types_auth(EventTypesAuth::Query);
    client.list_event_types().await.unwrap();

    let req = &transport.requests()[0];
    assert_eq!(req.query_value("apiKey"), Some("cal_test_key"));
    assert_eq!(req.header_value("Authorization"), None);
}

#[tokio::test]
async fn unknown_type_is_not_found_without_slots_request() {
    let (svc, transport) = service(vec![ok(EVENT_TYPES), ok(SLOTS)]);

    let err = svc
        .get_slots_for_type(json!({
            "eventTypeId": 99999,
            "start": "2050-09-05T00:00:00Z",
            "end": "2050-09-06T00:00:00Z"
        }))
        .await
        .unwrap_err();

    assert!(matches!(err, CalComError::NotFound(_)));
    assert_eq!(err.code(), "not_found");
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn known_type_returns_type_and_slots() {
    let (svc, transport) = service(vec![ok(EVENT_TYPES), ok(SLOTS)]);

    let result = svc
        .get_slots_for_type(json!({
            "typeId": 1,
            "startISO": "2050-09-05T00:00:00Z",
            "endISO": "2050-09-06T00:00:00Z"
        }))
        .await
        .unwrap();

    assert_eq!(result.event_type.title, "Intro call");
    assert_eq!(result.slots["2050-09-05"].len(), 2);

    let reqs = transport.requests();
    assert_eq!(reqs.len(), 2);
    let slots = &reqs[1];
    assert_eq!(slots.path, "/v2/slots");
    assert_eq!(
        slots.query,
        vec![
            ("eventTypeId".to_string(), "1".to_string()),
            ("start".to_string(), "2050-09-05T00:00:00Z".to_string()),
            ("end".to_string(), "2050-09-06T00:00:00Z".to_string()),
            ("timeZone".to_string(), "UTC".to_string()),
        ]
    );
    assert_eq!(slots.header_value("cal-api-version"), Some("2024-09-04"));
    assert_eq!(slots.header_value("Accept"), Some("application/json"));
    assert_eq!(slots.header_value("Authorization"), Some("Bearer cal_test_key"));
}

#[tokio::test]
async fn window_is_sent_upstream_trimmed() {
    let (svc, transport) = service(vec![ok(SLOTS)]);

    svc.get_available_slots_legacy(json!({
        "eventTypeId": 1,
        "start": " 2050-09-05T00:00:00Z",
        "end": "2050-09-06T00:00:00Z\t"
    }))
    .await
    .unwrap();

    let req = &transport.requests()[0];
    assert_eq!(req.query_value("start"), Some("2050-09-05T00:00:00Z"));
    assert_eq!(req.query_value("end"), Some("2050-09-06T00:00:00Z"));
}

#[tokio::test]
async fn hidden_type_is_still_resolvable_by_id() {
    let (svc, _) = service(vec![ok(EVENT_TYPES), ok(SLOTS)]);
    let result = svc
        .get_slots_for_type(json!({
            "eventTypeId": 2,
            "start": "2050-09-05T00:00:00Z",
            "end": "2050-09-06T00:00:00Z",
            "timeZone": "Europe/Stockholm"
        }))
        .await
        .unwrap();
    assert!(result.event_type.hidden);
}

#[tokio::test]
async fn malformed_slots_body_is_invalid_response() {
    let (svc, _) = service(vec![ok(EVENT_TYPES), ok(r#"{"nope":1}"#)]);
    let err = svc
        .get_slots_for_type(json!({
            "eventTypeId": 1,
            "start": "2050-09-05T00:00:00Z",
            "end": "2050-09-06T00:00:00Z"
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_response");
}

// ── Service validation ───────────────────────────────────────────────────────

#[tokio::test]
async fn legacy_without_identifiers_makes_no_requests() {
    let (svc, transport) = service(vec![ok(SLOTS)]);

    let err = svc
        .get_available_slots_legacy(json!({
            "start": "2050-09-05T00:00:00Z",
            "end": "2050-09-06T00:00:00Z"
        }))
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(err.to_string(), "Either username/typeSlug or typeId must be provided");
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn legacy_prefers_username_and_slug() {
    let (svc, transport) = service(vec![ok(SLOTS)]);

    let slots = svc
        .get_available_slots_legacy(json!({
            "start": "2050-09-05T00:00:00Z",
            "end": "2050-09-06T00:00:00Z",
            "timeZone": "America/New_York",
            "username": "alice",
            "typeSlug": "intro",
            "typeId": 7
        }))
        .await
        .unwrap();

    assert_eq!(slots.len(), 1);
    let req = &transport.requests()[0];
    assert_eq!(req.query_value("username"), Some("alice"));
    assert_eq!(req.query_value("eventTypeSlug"), Some("intro"));
    assert_eq!(req.query_value("eventTypeId"), None);
    assert_eq!(req.query_value("timeZone"), Some("America/New_York"));
}

#[tokio::test]
async fn legacy_by_type_id_goes_straight_to_slots() {
    let (svc, transport) = service(vec![ok(SLOTS)]);

    svc.get_available_slots_legacy(json!({
        "start": "2050-09-05T00:00:00Z",
        "end": "2050-09-06T00:00:00Z",
        "eventTypeId": 7,
        "timeZone": ""
    }))
    .await
    .unwrap();

    let reqs = transport.requests();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].path, "/v2/slots");
    assert_eq!(reqs[0].query_value("eventTypeId"), Some("7"));
    assert_eq!(reqs[0].query_value("timeZone"), Some("UTC"));
}

#[tokio::test]
async fn bad_datetime_is_rejected_before_any_request() {
    let (svc, transport) = service(vec![ok(EVENT_TYPES), ok(SLOTS)]);

    let err = svc
        .get_slots_for_type(json!({
            "eventTypeId": 1,
            "start": "next tuesday",
            "end": "2050-09-06T00:00:00Z"
        }))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "validation_error");
    assert!(err.to_string().contains("start"));
    assert_eq!(transport.call_count(), 0);
}

// ── Tools ─────────────────────────────────────────────────────────────────────

fn call(name: &str, args: Value) -> ToolCall {
    ToolCall { id: "call-1".into(), name: name.into(), args }
}

#[tokio::test]
async fn list_tool_renders_options_as_json() {
    let (svc, _) = service(vec![ok(EVENT_TYPES)]);
    let tool = ListEventTypesTool::new(Arc::new(svc));

    let out = tool.execute(&call(tool.name(), json!({}))).await;

    assert!(!out.is_error, "{}", out.content);
    let v: Value = serde_json::from_str(&out.content).unwrap();
    assert_eq!(v["count"], 3);
    assert_eq!(v["eventTypes"][0]["id"], 4);
    assert_eq!(v["eventTypes"][1]["duration"], 15);
}

#[tokio::test(start_paused = true)]
async fn slots_tool_returns_structured_upstream_error() {
    let (svc, _) = service(vec![
        ok(EVENT_TYPES),
        status(400, r#"{"error":{"code":"BAD_REQUEST","message":"Invalid parameters"}}"#),
    ]);
    let tool = GetEventTypeSlotsTool::new(Arc::new(svc));

    let out = tool
        .execute(&call(
            tool.name(),
            json!({
                "eventTypeId": 1,
                "start": "2050-09-05T00:00:00Z",
                "end": "2050-09-06T00:00:00Z"
            }),
        ))
        .await;

    assert!(out.is_error);
    assert_eq!(out.call_id, "call-1");
    let v: Value = serde_json::from_str(&out.content).unwrap();
    assert_eq!(v["error"]["code"], "upstream_client_error");
    assert_eq!(v["error"]["message"], "Invalid parameters");
    assert_eq!(v["error"]["statusCode"], 400);
    assert_eq!(v["error"]["upstreamCode"], "BAD_REQUEST");
}

#[tokio::test]
async fn legacy_tool_reports_validation_error_payload() {
    let (svc, transport) = service(vec![]);
    let tool = GetAvailableSlotsTool::new(Arc::new(svc));

    let out = tool
        .execute(&call(
            tool.name(),
            json!({ "start": "2050-09-05T00:00:00Z", "end": "2050-09-06T00:00:00Z" }),
        ))
        .await;

    assert!(out.is_error);
    let v: Value = serde_json::from_str(&out.content).unwrap();
    assert_eq!(v["error"]["code"], "validation_error");
    assert!(v["error"].get("statusCode").is_none());
    assert_eq!(transport.call_count(), 0);
}
