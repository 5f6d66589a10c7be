//! Tool surface of the primary agent: definitions for the LLM and dispatch
//! of tool calls to specialists through the [`ToolInvoker`].

use std::collections::HashMap;
use std::sync::Arc;

use sb_domain::config::Config;
use sb_domain::event::ToolResult;
use sb_domain::tool::{ToolCall, ToolDefinition};

use super::invoker::ToolInvoker;
use super::specialists::{SpecialistKind, SpecialistRequest};

pub struct SpecialistTools {
    invoker: Arc<ToolInvoker>,
    model_keys: HashMap<SpecialistKind, String>,
    definitions: Arc<Vec<ToolDefinition>>,
}

impl SpecialistTools {
    pub fn from_config(invoker: Arc<ToolInvoker>, config: &Config) -> Self {
        let model_keys = SpecialistKind::ALL
            .into_iter()
            .map(|k| (k, k.model_key(config)))
            .collect();
        let definitions = SpecialistKind::ALL
            .into_iter()
            .map(SpecialistKind::tool_definition)
            .collect();
        Self {
            invoker,
            model_keys,
            definitions: Arc::new(definitions),
        }
    }

    pub fn definitions(&self) -> Arc<Vec<ToolDefinition>> {
        Arc::clone(&self.definitions)
    }

    /// Run one tool call. Unknown tools and malformed arguments become
    /// error results; specialist calls always produce text.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(kind) = SpecialistKind::from_tool_name(&call.tool_name) else {
            tracing::warn!(tool_name = %call.tool_name, "model requested unknown tool");
            return ToolResult::failed(format!("unknown tool: {}", call.tool_name));
        };
        let req = match SpecialistRequest::from_arguments(&call.arguments) {
            Ok(req) => req,
            Err(e) => return ToolResult::failed(e.to_string()),
        };
        let model_key = self
            .model_keys
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_default();
        ToolResult::text(self.invoker.invoke(kind, &req, model_key).await)
    }
}
