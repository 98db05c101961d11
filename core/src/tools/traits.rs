use super::error::ToolResult;
use crate::mcp::types::{CallToolResult, McpTool};
use async_trait::async_trait;
use serde_json::Value;

/// The core trait for every tool the server exposes
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of the tool (e.g., "text_to_speech")
    fn name(&self) -> String;

    /// A human-readable description of what the tool does
    fn description(&self) -> String;

    /// The JSON Schema for the tool's arguments
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    ///
    /// Argument and execution failures are returned as `Err` and turned into
    /// `isError` results by the dispatcher.
    async fn call(&self, arguments: Value) -> ToolResult<CallToolResult>;

    /// The descriptor advertised through `tools/list`
    fn descriptor(&self) -> McpTool {
        McpTool {
            name: self.name(),
            description: Some(self.description()),
            input_schema: self.parameters(),
        }
    }
}
