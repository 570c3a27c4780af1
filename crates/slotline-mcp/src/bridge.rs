// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! Conversions between slotline's capability types and rmcp's MCP model types.
//!
//! Pure functions; the server owns all state.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::{
    AnnotateAble, CallToolResult, Content, JsonObject, Prompt, PromptMessage, PromptMessageRole,
    RawResource, Resource as McpResource, Tool as McpTool,
};
use slotline_tools::{PromptTemplate, Resource, ToolOutput, ToolSchema};

/// Convert a [`ToolSchema`] into an rmcp tool descriptor.
pub fn schema_to_mcp_tool(schema: ToolSchema) -> McpTool {
    McpTool::new(
        Cow::Owned(schema.name),
        Cow::Owned(schema.description),
        Arc::new(value_to_object(schema.parameters)),
    )
}

/// MCP requires an object schema.  Anything else is wrapped in a minimal
/// `{"type":"object"}` envelope.
fn value_to_object(v: serde_json::Value) -> JsonObject {
    use serde_json::{Map, Value};
    match v {
        Value::Object(m) => m,
        other => {
            let mut m = Map::new();
            m.insert("type".to_string(), Value::String("object".to_string()));
            m.insert("value".to_string(), other);
            m
        }
    }
}

/// Tool output becomes a single text block; `is_error` is carried over.
pub fn output_to_call_result(output: ToolOutput) -> CallToolResult {
    let content = vec![Content::text(output.content)];
    if output.is_error {
        CallToolResult {
            content,
            is_error: Some(true),
            structured_content: None,
            meta: None,
        }
    } else {
        CallToolResult::success(content)
    }
}

pub fn resource_to_mcp(resource: &dyn Resource) -> McpResource {
    let mut raw = RawResource::new(resource.uri(), resource.name());
    raw.description = Some(resource.description().to_string());
    raw.mime_type = Some(resource.mime_type().to_string());
    raw.no_annotation()
}

pub fn prompt_to_mcp(prompt: &PromptTemplate) -> Prompt {
    Prompt::new(prompt.name.clone(), Some(prompt.description.clone()), None)
}

/// A template is delivered as one user message.
pub fn prompt_messages(prompt: &PromptTemplate) -> Vec<PromptMessage> {
    vec![PromptMessage::new_text(PromptMessageRole::User, prompt.text.clone())]
}

// ─── Unit tests ───────────────────────────────────────────────────────────────
