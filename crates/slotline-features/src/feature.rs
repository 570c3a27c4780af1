// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use serde::Serialize;
use slotline_tools::CapabilitySink;

/// Static description of an integration.  The `name` is its registry key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureDescriptor {
    pub name: String,
    pub description: String,
    pub version: String,
    pub enabled: bool,
}

impl FeatureDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: version.into(),
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Names of everything a feature bound during [`Feature::register`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisteredCapabilities {
    pub tools: Vec<String>,
    pub resources: Vec<String>,
    pub prompts: Vec<String>,
}

impl RegisteredCapabilities {
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.resources.is_empty() && self.prompts.is_empty()
    }
}

/// An optional integration that contributes capabilities to the server.
pub trait Feature {
    fn info(&self) -> FeatureDescriptor;

    /// Whether the configuration and dependencies this feature needs are
    /// present.  Must be cheap and side-effect free.
    fn can_load(&self) -> bool;

    /// Build the feature's backing services and bind its capabilities.
    ///
    /// Called at most once per process, and only after `can_load` returned
    /// true.  Errors are recorded by the registry, never propagated.
    fn register(&self, sink: &mut dyn CapabilitySink) -> anyhow::Result<RegisteredCapabilities>;

    /// Release anything acquired in `register`.  Called once at shutdown for
    /// features that registered successfully.
    fn cleanup(&self) {}
}
