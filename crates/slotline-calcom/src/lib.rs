// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! `slotline-calcom` — Cal.com scheduling availability.
//!
//! Layers, leaves first:
//!
//! ```text
//! HttpTransport (ReqwestTransport)     one attempt, no interpretation
//!       │
//! RetryableHttpClient                  backoff on 5xx / network, 4xx terminal
//!       │
//! CalComClient                         /v1/event-types, /v2/slots
//!       │
//! AvailabilityService                  input validation, two-step flow
//!       │
//! tools / resource / prompt            bound by CalComFeature::register
//! ```
//!
//! Nothing is cached: every call re-fetches from Cal.com.

pub mod client;
pub mod error;
pub mod feature;
pub mod http;
pub mod retry;
pub mod service;
pub mod tools;
pub mod types;

pub use client::{CalComClient, API_VERSION};
pub use error::{CalComError, ClassifiedError, UpstreamKind};
pub use feature::{CalComFeature, FEATURE_NAME};
pub use http::{
    HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, RetryableHttpClient,
    TransportError,
};
pub use retry::{InvalidRetryPolicy, RetryPolicy};
pub use service::{AvailabilityService, LegacySlotsInput, SlotsForTypeInput, DEFAULT_TIME_ZONE};
pub use types::{EventType, EventTypeSlots, SelectionOption, Slot, SlotSet, TeamInfo};
