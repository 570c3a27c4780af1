// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use slotline_config::{CalComConfig, RetryConfig};
use slotline_features::{Feature, FeatureDescriptor, RegisteredCapabilities};
use slotline_tools::{CapabilitySink, Resource, Tool};
use tracing::{debug, info};

use crate::client::CalComClient;
use crate::http::{HttpTransport, ReqwestTransport, RetryableHttpClient};
use crate::retry::RetryPolicy;
use crate::service::AvailabilityService;
use crate::tools::{
    schedule_prompt, EventTypesResource, GetAvailableSlotsTool, GetEventTypeSlotsTool,
    ListEventTypesTool,
};

pub const FEATURE_NAME: &str = "calcom";

/// The Cal.com integration.  Loadable when enabled and an API key resolves.
#[derive(Debug, Clone)]
pub struct CalComFeature {
    calcom: CalComConfig,
    retry: RetryConfig,
}

impl CalComFeature {
    pub fn new(calcom: CalComConfig, retry: RetryConfig) -> Self {
        Self { calcom, retry }
    }

    /// Wire transport, retry client, API client and service together.
    /// Everything is built once here and injected downwards.
    pub fn build_service(&self) -> anyhow::Result<AvailabilityService> {
        let api_key = self
            .calcom
            .resolve_api_key()
            .with_context(|| format!("no Cal.com API key (set {})", self.calcom.api_key_env))?;
        let policy = RetryPolicy::try_from(&self.retry).context("invalid [retry] configuration")?;
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(
            self.calcom.api_url.as_str(),
            Duration::from_secs(self.calcom.timeout_secs),
        )?);
        debug!(
            api_url = %self.calcom.api_url,
            max_attempts = policy.max_attempts(),
            event_types_auth = ?self.calcom.event_types_auth,
            "building Cal.com client"
        );
        let client = CalComClient::new(RetryableHttpClient::new(transport, policy), api_key)
            .with_event_types_auth(self.calcom.event_types_auth);
        Ok(AvailabilityService::new(client))
    }
}

impl Feature for CalComFeature {
    fn info(&self) -> FeatureDescriptor {
        FeatureDescriptor::new(
            FEATURE_NAME,
            "Cal.com scheduling availability",
            env!("CARGO_PKG_VERSION"),
        )
        .with_enabled(self.calcom.enabled)
    }

    fn can_load(&self) -> bool {
        self.calcom.enabled && self.calcom.resolve_api_key().is_some()
    }

    fn register(&self, sink: &mut dyn CapabilitySink) -> anyhow::Result<RegisteredCapabilities> {
        let service = Arc::new(self.build_service()?);

        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(ListEventTypesTool::new(service.clone())),
            Arc::new(GetEventTypeSlotsTool::new(service.clone())),
            Arc::new(GetAvailableSlotsTool::new(service.clone())),
        ];
        let resource: Arc<dyn Resource> = Arc::new(EventTypesResource::new(service));
        let prompt = schedule_prompt();

        let mut bound = RegisteredCapabilities::default();
        for tool in tools {
            bound.tools.push(tool.name().to_string());
            sink.bind_tool(tool)?;
        }
        bound.resources.push(resource.uri().to_string());
        sink.bind_resource(resource)?;
        bound.prompts.push(prompt.name.clone());
        sink.bind_prompt(prompt)?;

        info!(
            tools = bound.tools.len(),
            resources = bound.resources.len(),
            prompts = bound.prompts.len(),
            "Cal.com capabilities bound"
        );
        Ok(bound)
    }
}
