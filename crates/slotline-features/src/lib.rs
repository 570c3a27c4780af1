// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! `slotline-features` — the conditional capability registry.
//!
//! An integration ("feature") reports whether it can load, and if so binds
//! its tools, resources and prompts into a [`CapabilitySink`].  The
//! [`CapabilityRegistry`] runs every feature once, in insertion order, and
//! keeps one [`RegistrationOutcome`] per feature.  A feature that fails or
//! panics while registering is recorded as failed; its siblings still load.
//!
//! ```text
//! add(feature) ─► Unregistered ──can_load=false──► Skipped
//!                      │
//!                  can_load=true
//!                      ▼
//!                 Registering ──Ok──► Registered(success)
//!                      └──────Err/panic──► Registered(failure)
//! ```
//!
//! [`CapabilitySink`]: slotline_tools::CapabilitySink

mod feature;
mod registry;

pub use feature::{Feature, FeatureDescriptor, RegisteredCapabilities};
pub use registry::{
    CapabilityRegistry, FeatureState, OutcomeStatus, RegistrationOutcome, SKIPPED_MESSAGE,
};
