// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use slotline_tools::{BindError, CapabilitySink, PromptTemplate, Resource, Tool};
use tracing::{debug, info, warn};

use crate::feature::{Feature, FeatureDescriptor, RegisteredCapabilities};

/// Error recorded for a feature whose `can_load` returned false.
pub const SKIPPED_MESSAGE: &str = "missing configuration or dependencies";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Registered,
    Skipped,
    Failed,
}

/// Result of running one feature through the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationOutcome {
    pub status: OutcomeStatus,
    pub success: bool,
    pub error: Option<String>,
    pub tools: Vec<String>,
    pub resources: Vec<String>,
    pub prompts: Vec<String>,
    pub feature: FeatureDescriptor,
}

impl RegistrationOutcome {
    fn registered(feature: FeatureDescriptor, caps: RegisteredCapabilities) -> Self {
        Self {
            status: OutcomeStatus::Registered,
            success: true,
            error: None,
            tools: caps.tools,
            resources: caps.resources,
            prompts: caps.prompts,
            feature,
        }
    }

    fn unsuccessful(feature: FeatureDescriptor, status: OutcomeStatus, error: String) -> Self {
        Self {
            status,
            success: false,
            error: Some(error),
            tools: Vec::new(),
            resources: Vec::new(),
            prompts: Vec::new(),
            feature,
        }
    }
}

/// Lifecycle of a single feature inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureState {
    Unregistered,
    Registering,
    Skipped,
    Registered { success: bool },
}

impl FeatureState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Unregistered | Self::Registering)
    }
}

struct Entry<F> {
    name: String,
    feature: F,
    state: FeatureState,
    outcome: Option<RegistrationOutcome>,
    cleaned: bool,
}

/// Ordered set of optional integrations and what became of each.
pub struct CapabilityRegistry<F> {
    entries: Vec<Entry<F>>,
}

impl<F> Default for CapabilityRegistry<F> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<F: Feature> CapabilityRegistry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature keyed by its descriptor name.
    ///
    /// Names are expected to be unique.  On a collision the later feature
    /// replaces the earlier one but keeps its position in the run order.
    /// Once a feature has been run, its name is final: a later feature with
    /// the same name is dropped, so nothing registers twice in a process.
    pub fn add(&mut self, feature: F) {
        let name = feature.info().name;
        let entry = Entry {
            name: name.clone(),
            feature,
            state: FeatureState::Unregistered,
            outcome: None,
            cleaned: false,
        };
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) if existing.state.is_terminal() => {
                warn!(feature = %name, "feature already ran; ignoring later entry with the same name");
            }
            Some(existing) => {
                warn!(feature = %name, "feature name registered twice; replacing earlier entry");
                *existing = entry;
            }
            None => self.entries.push(entry),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn state(&self, name: &str) -> Option<FeatureState> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.state)
    }

    pub fn descriptors(&self) -> Vec<FeatureDescriptor> {
        self.entries.iter().map(|e| e.feature.info()).collect()
    }

    /// Run every feature that has not been run yet, in insertion order, and
    /// return the outcomes of all features run so far.
    pub fn register_all(&mut self, sink: &mut dyn CapabilitySink) -> Vec<RegistrationOutcome> {
        for entry in &mut self.entries {
            if entry.state != FeatureState::Unregistered {
                continue;
            }
            let descriptor = entry.feature.info();

            if !entry.feature.can_load() {
                info!(feature = %descriptor.name, "feature skipped: {SKIPPED_MESSAGE}");
                entry.state = FeatureState::Skipped;
                entry.outcome = Some(RegistrationOutcome::unsuccessful(
                    descriptor,
                    OutcomeStatus::Skipped,
                    SKIPPED_MESSAGE.to_string(),
                ));
                continue;
            }

            entry.state = FeatureState::Registering;
            let feature = &entry.feature;
            let mut staged = RollbackSink::new(&mut *sink);
            let result = catch_unwind(AssertUnwindSafe(|| feature.register(&mut staged)));
            if !matches!(result, Ok(Ok(_))) {
                let removed = staged.roll_back();
                if removed > 0 {
                    debug!(feature = %descriptor.name, removed, "rolled back partial registration");
                }
            }

            let outcome = match result {
                Ok(Ok(caps)) => {
                    info!(
                        feature = %descriptor.name,
                        version = %descriptor.version,
                        tools = caps.tools.len(),
                        resources = caps.resources.len(),
                        prompts = caps.prompts.len(),
                        "feature registered"
                    );
                    RegistrationOutcome::registered(descriptor, caps)
                }
                Ok(Err(e)) => {
                    warn!(feature = %descriptor.name, error = %format!("{e:#}"), "feature registration failed");
                    RegistrationOutcome::unsuccessful(
                        descriptor,
                        OutcomeStatus::Failed,
                        format!("{e:#}"),
                    )
                }
                Err(payload) => {
                    let msg = panic_message(payload.as_ref());
                    warn!(feature = %descriptor.name, error = %msg, "feature registration panicked");
                    RegistrationOutcome::unsuccessful(
                        descriptor,
                        OutcomeStatus::Failed,
                        format!("registration panicked: {msg}"),
                    )
                }
            };

            entry.state = FeatureState::Registered { success: outcome.success };
            entry.outcome = Some(outcome);
        }

        self.outcomes()
    }

    /// Outcomes of every feature run so far, in insertion order.
    pub fn outcomes(&self) -> Vec<RegistrationOutcome> {
        self.entries.iter().filter_map(|e| e.outcome.clone()).collect()
    }

    pub fn successful(&self) -> Vec<RegistrationOutcome> {
        self.with_status(OutcomeStatus::Registered)
    }

    pub fn failed(&self) -> Vec<RegistrationOutcome> {
        self.with_status(OutcomeStatus::Failed)
    }

    pub fn skipped(&self) -> Vec<RegistrationOutcome> {
        self.with_status(OutcomeStatus::Skipped)
    }

    fn with_status(&self, status: OutcomeStatus) -> Vec<RegistrationOutcome> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref())
            .filter(|o| o.status == status)
            .cloned()
            .collect()
    }

    /// Give every successfully registered feature a chance to release its
    /// resources.  Safe to call more than once; each feature is cleaned once.
    pub fn cleanup_all(&mut self) {
        for entry in &mut self.entries {
            if entry.state == (FeatureState::Registered { success: true }) && !entry.cleaned {
                debug!(feature = %entry.name, "cleaning up feature");
                entry.feature.cleanup();
                entry.cleaned = true;
            }
        }
    }
}

/// Forwards bindings to the real sink and remembers them, so a feature that
/// fails partway through `register` leaves nothing behind.
struct RollbackSink<'a, 's> {
    inner: &'a mut (dyn CapabilitySink + 's),
    tools: Vec<String>,
    resources: Vec<String>,
    prompts: Vec<String>,
}

impl<'a, 's> RollbackSink<'a, 's> {
    fn new(inner: &'a mut (dyn CapabilitySink + 's)) -> Self {
        Self {
            inner,
            tools: Vec::new(),
            resources: Vec::new(),
            prompts: Vec::new(),
        }
    }

    /// Remove everything bound through this sink; returns how many.
    fn roll_back(self) -> usize {
        let Self { inner, tools, resources, prompts } = self;
        let mut removed = 0;
        for name in &tools {
            removed += usize::from(inner.unbind_tool(name));
        }
        for uri in &resources {
            removed += usize::from(inner.unbind_resource(uri));
        }
        for name in &prompts {
            removed += usize::from(inner.unbind_prompt(name));
        }
        removed
    }
}

impl CapabilitySink for RollbackSink<'_, '_> {
    fn bind_tool(&mut self, tool: Arc<dyn Tool>) -> Result<(), BindError> {
        let name = tool.name().to_string();
        self.inner.bind_tool(tool)?;
        self.tools.push(name);
        Ok(())
    }

    fn bind_resource(&mut self, resource: Arc<dyn Resource>) -> Result<(), BindError> {
        let uri = resource.uri().to_string();
        self.inner.bind_resource(resource)?;
        self.resources.push(uri);
        Ok(())
    }

    fn bind_prompt(&mut self, prompt: PromptTemplate) -> Result<(), BindError> {
        let name = prompt.name.clone();
        self.inner.bind_prompt(prompt)?;
        self.prompts.push(name);
        Ok(())
    }

    fn unbind_tool(&mut self, name: &str) -> bool {
        self.tools.retain(|t| t != name);
        self.inner.unbind_tool(name)
    }

    fn unbind_resource(&mut self, uri: &str) -> bool {
        self.resources.retain(|r| r != uri);
        self.inner.unbind_resource(uri)
    }

    fn unbind_prompt(&mut self, name: &str) -> bool {
        self.prompts.retain(|p| p != name);
        self.inner.unbind_prompt(name)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
