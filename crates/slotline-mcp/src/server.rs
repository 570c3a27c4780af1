// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! [`SlotlineMcpServer`] — the rmcp [`ServerHandler`] over a [`Catalog`].
//!
//! Handles `tools/*`, `resources/*` and `prompts/*`.  Lifecycle methods
//! (initialize, ping) use the rmcp defaults.  The catalog is fixed before
//! serving starts, so the handler holds no locks.

use std::sync::Arc;

use rmcp::{
    handler::server::ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, GetPromptRequestParams, GetPromptResult,
        Implementation, ListPromptsResult, ListResourcesResult, ListToolsResult,
        PaginatedRequestParams, PromptsCapability, ReadResourceRequestParams,
        ReadResourceResult, ResourceContents, ResourcesCapability, ServerCapabilities,
        ServerInfo,
    },
    service::{RequestContext, RoleServer},
    ErrorData as McpError,
};
use slotline_tools::{Catalog, ToolCall};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::bridge::{
    output_to_call_result, prompt_messages, prompt_to_mcp, resource_to_mcp, schema_to_mcp_tool,
};

#[derive(Clone)]
pub struct SlotlineMcpServer {
    catalog: Arc<Catalog>,
    name: String,
    instructions: Option<String>,
}

impl SlotlineMcpServer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            name: "slotline".to_string(),
            instructions: None,
        }
    }

    /// Name reported in the `initialize` result.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl ServerHandler for SlotlineMcpServer {
    fn get_info(&self) -> ServerInfo {
        // Tools are always advertised so an empty server still answers
        // `tools/list`.
        let mut capabilities = ServerCapabilities::builder().enable_tools().build();
        if !self.catalog.resource_uris().is_empty() {
            capabilities.resources = Some(ResourcesCapability::default());
        }
        if !self.catalog.prompt_names().is_empty() {
            capabilities.prompts = Some(PromptsCapability::default());
        }
        ServerInfo {
            capabilities,
            server_info: Implementation {
                name: self.name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: self.instructions.clone(),
            ..ServerInfo::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = self
            .catalog
            .schemas()
            .into_iter()
            .map(schema_to_mcp_tool)
            .collect();
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request
            .arguments
            .map(|m| serde_json::Value::Object(m.into_iter().collect()))
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let call = ToolCall {
            id: Uuid::new_v4().to_string(),
            name: request.name.to_string(),
            args,
        };

        let output = self.catalog.execute(&call).await;
        Ok(output_to_call_result(output))
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let resources = self
            .catalog
            .resources()
            .iter()
            .map(|r| resource_to_mcp(r.as_ref()))
            .collect();
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let Some(resource) = self.catalog.resource(&request.uri) else {
            return Err(McpError::resource_not_found(
                format!("unknown resource: {}", request.uri),
                None,
            ));
        };
        debug!(uri = %request.uri, "reading resource");
        match resource.read().await {
            Ok(text) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(text, request.uri)],
            }),
            Err(e) => {
                warn!(uri = %request.uri, error = %format!("{e:#}"), "resource read failed");
                Err(McpError::internal_error(format!("{e:#}"), None))
            }
        }
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        let prompts = self.catalog.prompts().into_iter().map(prompt_to_mcp).collect();
        Ok(ListPromptsResult {
            prompts,
            next_cursor: None,
            meta: None,
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        let prompt = self.catalog.prompt(&request.name).ok_or_else(|| {
            McpError::invalid_params(format!("unknown prompt: {}", request.name), None)
        })?;
        Ok(GetPromptResult {
            description: Some(prompt.description.clone()),
            messages: prompt_messages(prompt),
        })
    }
}

// ─── Unit tests ───────────────────────────────────────────────────────────────
//
// Round-trips through a transport live in tests/integration.rs.
