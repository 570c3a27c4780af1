// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;

/// A named, read-only data source addressed by URI.
///
/// Resources are read on demand; nothing is cached between reads.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Unique URI, e.g. `calcom://event-types`.
    fn uri(&self) -> &str;
    /// Short human-readable name.
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn mime_type(&self) -> &str {
        "application/json"
    }
    /// Produce the current contents.
    async fn read(&self) -> anyhow::Result<String>;
}
