// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::{PromptTemplate, Resource, Tool, ToolCall, ToolOutput};

/// A tool schema as advertised to clients.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("{kind} '{name}' is already bound")]
    Duplicate { kind: &'static str, name: String },
}

/// Destination for capabilities bound by an integration during registration.
///
/// Binding a name that is already taken is rejected with
/// [`BindError::Duplicate`]; the earlier binding stays in place.
///
/// The `unbind_*` methods remove a binding again and report whether one was
/// present.  They are used to roll back a registration that failed midway.
pub trait CapabilitySink {
    fn bind_tool(&mut self, tool: Arc<dyn Tool>) -> Result<(), BindError>;
    fn bind_resource(&mut self, resource: Arc<dyn Resource>) -> Result<(), BindError>;
    fn bind_prompt(&mut self, prompt: PromptTemplate) -> Result<(), BindError>;

    fn unbind_tool(&mut self, name: &str) -> bool;
    fn unbind_resource(&mut self, uri: &str) -> bool;
    fn unbind_prompt(&mut self, name: &str) -> bool;
}

/// Every capability bound at startup.  Populated once, then shared read-only
/// behind an `Arc` while requests are served.
#[derive(Default)]
pub struct Catalog {
    tools: HashMap<String, Arc<dyn Tool>>,
    resources: HashMap<String, Arc<dyn Resource>>,
    prompts: HashMap<String, PromptTemplate>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.resources.is_empty() && self.prompts.is_empty()
    }

    pub fn tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Schemas for all bound tools, sorted by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        match self.tools.get(&call.name) {
            Some(tool) => {
                debug!(tool = %call.name, call_id = %call.id, "executing tool");
                tool.execute(call).await
            }
            None => ToolOutput::err(&call.id, format!("unknown tool: {}", call.name)),
        }
    }

    pub fn resource(&self, uri: &str) -> Option<Arc<dyn Resource>> {
        self.resources.get(uri).cloned()
    }

    /// All bound resources, sorted by URI.
    pub fn resources(&self) -> Vec<Arc<dyn Resource>> {
        let mut list: Vec<_> = self.resources.values().cloned().collect();
        list.sort_by(|a, b| a.uri().cmp(b.uri()));
        list
    }

    pub fn prompt(&self, name: &str) -> Option<&PromptTemplate> {
        self.prompts.get(name)
    }

    /// All bound prompts, sorted by name.
    pub fn prompts(&self) -> Vec<&PromptTemplate> {
        let mut list: Vec<_> = self.prompts.values().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn tool_names(&self) -> Vec<String> {
        sorted_keys(&self.tools)
    }

    pub fn resource_uris(&self) -> Vec<String> {
        sorted_keys(&self.resources)
    }

    pub fn prompt_names(&self) -> Vec<String> {
        sorted_keys(&self.prompts)
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

fn insert_unique<V>(
    map: &mut HashMap<String, V>,
    kind: &'static str,
    name: String,
    value: V,
) -> Result<(), BindError> {
    if map.contains_key(&name) {
        return Err(BindError::Duplicate { kind, name });
    }
    debug!(kind, name = %name, "capability bound");
    map.insert(name, value);
    Ok(())
}

impl CapabilitySink for Catalog {
    fn bind_tool(&mut self, tool: Arc<dyn Tool>) -> Result<(), BindError> {
        let name = tool.name().to_string();
        insert_unique(&mut self.tools, "tool", name, tool)
    }

    fn bind_resource(&mut self, resource: Arc<dyn Resource>) -> Result<(), BindError> {
        let uri = resource.uri().to_string();
        insert_unique(&mut self.resources, "resource", uri, resource)
    }

    fn bind_prompt(&mut self, prompt: PromptTemplate) -> Result<(), BindError> {
        let name = prompt.name.clone();
        insert_unique(&mut self.prompts, "prompt", name, prompt)
    }

    fn unbind_tool(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    fn unbind_resource(&mut self, uri: &str) -> bool {
        self.resources.remove(uri).is_some()
    }

    fn unbind_prompt(&mut self, name: &str) -> bool {
        self.prompts.remove(name).is_some()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;

    /// Minimal no-op tool for catalog tests.
    struct EchoTool {
        name: &'static str,
        description: &'static str,
    }

    impl EchoTool {
        fn named(name: &'static str) -> Arc<Self> {
            Arc::new(Self { name, description: "echoes its input" })
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { self.name }
        fn description(&self) -> &str { self.description }
        fn parameters_schema(&self) -> Value { json!({ "type": "object" }) }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            ToolOutput::ok(&call.id, format!("echo:{}", call.args))
        }
    }

    struct StaticResource(&'static str);

    #[async_trait]
    impl Resource for StaticResource {
        fn uri(&self) -> &str { self.0 }
        fn name(&self) -> &str { "static" }
        fn description(&self) -> &str { "fixed text" }
        async fn read(&self) -> anyhow::Result<String> { Ok("[]".into()) }
    }

    #[test]
    fn bind_and_get_tool() {
        let mut cat = Catalog::new();
        cat.bind_tool(EchoTool::named("echo")).unwrap();
        assert!(cat.tool("echo").is_some());
        assert!(cat.tool("nope").is_none());
    }

    #[test]
    fn new_catalog_is_empty() {
        assert!(Catalog::new().is_empty());
    }

    #[test]
    fn schemas_are_sorted_by_name() {
        let mut cat = Catalog::new();
        cat.bind_tool(EchoTool::named("zeta")).unwrap();
        cat.bind_tool(EchoTool::named("alpha")).unwrap();
        let names: Vec<_> = cat.schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn binding_same_tool_name_twice_is_rejected() {
        let mut cat = Catalog::new();
        cat.bind_tool(EchoTool::named("t")).unwrap();
        let second = Arc::new(EchoTool { name: "t", description: "second" });
        let err = cat.bind_tool(second).unwrap_err();
        assert_eq!(err, BindError::Duplicate { kind: "tool", name: "t".into() });
        // The first binding survives.
        assert_eq!(cat.schemas()[0].description, "echoes its input");
    }

    #[test]
    fn duplicate_resource_and_prompt_are_rejected() {
        let mut cat = Catalog::new();
        cat.bind_resource(Arc::new(StaticResource("x://a"))).unwrap();
        assert!(cat.bind_resource(Arc::new(StaticResource("x://a"))).is_err());

        cat.bind_prompt(PromptTemplate::new("p", "d", "t")).unwrap();
        let err = cat.bind_prompt(PromptTemplate::new("p", "d2", "t2")).unwrap_err();
        assert!(err.to_string().contains("prompt 'p'"));
        assert_eq!(cat.prompt("p").unwrap().description, "d");
    }

    #[test]
    fn same_name_across_kinds_is_allowed() {
        let mut cat = Catalog::new();
        cat.bind_tool(EchoTool::named("shared")).unwrap();
        cat.bind_prompt(PromptTemplate::new("shared", "d", "t")).unwrap();
        assert_eq!(cat.tool_names(), vec!["shared"]);
        assert_eq!(cat.prompt_names(), vec!["shared"]);
    }

    #[test]
    fn unbind_removes_only_the_named_capability() {
        let mut cat = Catalog::new();
        cat.bind_tool(EchoTool::named("a")).unwrap();
        cat.bind_tool(EchoTool::named("b")).unwrap();
        cat.bind_resource(Arc::new(StaticResource("x://a"))).unwrap();
        cat.bind_prompt(PromptTemplate::new("p", "d", "t")).unwrap();

        assert!(cat.unbind_tool("a"));
        assert!(!cat.unbind_tool("a"));
        assert!(cat.unbind_resource("x://a"));
        assert!(cat.unbind_prompt("p"));
        assert_eq!(cat.tool_names(), vec!["b"]);
        assert!(cat.resource_uris().is_empty());
        assert!(cat.prompt_names().is_empty());

        // The name is free again.
        cat.bind_tool(EchoTool::named("a")).unwrap();
    }

    #[tokio::test]
    async fn execute_known_tool_succeeds() {
        let mut cat = Catalog::new();
        cat.bind_tool(EchoTool::named("echo")).unwrap();
        let call = ToolCall { id: "1".into(), name: "echo".into(), args: json!({"x":1}) };
        let out = cat.execute(&call).await;
        assert!(!out.is_error);
        assert!(out.content.starts_with("echo:"));
    }

    #[tokio::test]
    async fn execute_unknown_tool_returns_error() {
        let cat = Catalog::new();
        let call = ToolCall { id: "x".into(), name: "missing".into(), args: json!({}) };
        let out = cat.execute(&call).await;
        assert!(out.is_error);
        assert!(out.content.contains("unknown tool"));
    }

    #[tokio::test]
    async fn resource_lookup_by_uri() {
        let mut cat = Catalog::new();
        cat.bind_resource(Arc::new(StaticResource("x://b"))).unwrap();
        cat.bind_resource(Arc::new(StaticResource("x://a"))).unwrap();
        assert_eq!(cat.resource_uris(), vec!["x://a", "x://b"]);
        let body = cat.resource("x://a").unwrap().read().await.unwrap();
        assert_eq!(body, "[]");
        assert!(cat.resource("x://c").is_none());
    }
}
