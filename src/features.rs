// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The closed set of integrations compiled into this binary.

use slotline_calcom::CalComFeature;
use slotline_config::Config;
use slotline_features::{Feature, FeatureDescriptor, RegisteredCapabilities};
use slotline_tools::CapabilitySink;

/// Every integration this build knows about.  Adding one means adding a
/// variant here and an entry in [`builtin_integrations`].
#[derive(Debug, Clone)]
pub enum Integration {
    CalCom(CalComFeature),
}

impl Feature for Integration {
    fn info(&self) -> FeatureDescriptor {
        match self {
            Self::CalCom(f) => f.info(),
        }
    }

    fn can_load(&self) -> bool {
        match self {
            Self::CalCom(f) => f.can_load(),
        }
    }

    fn register(&self, sink: &mut dyn CapabilitySink) -> anyhow::Result<RegisteredCapabilities> {
        match self {
            Self::CalCom(f) => f.register(sink),
        }
    }

    fn cleanup(&self) {
        match self {
            Self::CalCom(f) => f.cleanup(),
        }
    }
}

/// Integrations in registration order.
pub fn builtin_integrations(config: &Config) -> Vec<Integration> {
    vec![Integration::CalCom(CalComFeature::new(
        config.calcom.clone(),
        config.retry.clone(),
    ))]
}
