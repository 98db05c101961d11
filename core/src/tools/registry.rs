use super::error::{ToolError, ToolResult};
use super::traits::Tool;
use crate::mcp::types::CallToolResult;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A registry for managing available tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<DashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool, replacing any tool with the same name
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        info!(target: "tool_registry", tool = %name, "Registering tool");

        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(target: "tool_registry", tool = %name, "Replaced previously registered tool");
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|t| t.clone())
    }

    /// List all registered tools, ordered by name
    pub fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = self.tools.iter().map(|t| t.clone()).collect();
        tools.sort_by_key(|t| t.name());
        tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Call a tool by name. No timeout is applied; a started call runs to completion.
    #[tracing::instrument(skip(self, arguments), fields(tool.name = %name))]
    pub async fn call(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> ToolResult<CallToolResult> {
        let start_time = std::time::Instant::now();

        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        debug!(target: "tool_registry", tool = %name, "Invoking tool");

        let result = tool.call(arguments).await;
        let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(_) => {
                debug!(target: "tool_registry", tool = %name, elapsed_ms, "Tool finished");
            }
            Err(e) => {
                warn!(target: "tool_registry", tool = %name, error = %e, elapsed_ms, "Tool execution failed");
            }
        }

        result
    }
}
