/// Model Context Protocol (MCP) server side
///
/// Architecture:
/// - `types`: MCP protocol types (JSON-RPC 2.0 based)
/// - `dispatcher`: routes JSON-RPC methods to the tool registry, shared by every transport
pub mod dispatcher;
pub mod types;

pub use dispatcher::{DispatchError, Dispatcher};
pub use types::{
    CallToolParams, CallToolResult, JsonRpcRequest, JsonRpcResponse, McpTool, ServerInfo,
    ToolContent, DEFAULT_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
