/// Transport-agnostic MCP request dispatcher
///
/// Both the stdio and the HTTP bindings hand raw JSON-RPC envelopes to
/// [`Dispatcher::handle`]; the tool-level entry points (`list_tools`,
/// `call_tool`) take and return plain values with no transport types.
use super::types::*;
use crate::tools::{ToolError, ToolRegistry};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failures that surface as JSON-RPC error envelopes
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    UnknownMethod(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// JSON-RPC error code for this failure
    pub fn code(&self) -> i32 {
        match self {
            DispatchError::InvalidRequest(_) => INVALID_REQUEST,
            DispatchError::UnknownMethod(_) => METHOD_NOT_FOUND,
            DispatchError::UnknownTool(_) => METHOD_NOT_FOUND,
            DispatchError::InvalidParams(_) => INVALID_PARAMS,
            DispatchError::Internal(_) => INTERNAL_ERROR,
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        DispatchError::Internal(e.to_string())
    }
}

/// Routes MCP methods to the tool registry
pub struct Dispatcher {
    registry: ToolRegistry,
    server_info: ServerInfo,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            server_info: ServerInfo::default(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// `tools/list`: pure, no side effects
    pub fn list_tools(&self) -> ListToolsResult {
        ListToolsResult {
            tools: self
                .registry
                .list_tools()
                .iter()
                .map(|t| t.descriptor())
                .collect(),
            next_cursor: None,
        }
    }

    /// `tools/call`
    ///
    /// Only an unknown tool name escapes as a protocol error. Argument and
    /// execution failures come back as `isError` results.
    pub async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, DispatchError> {
        let arguments = params.arguments.unwrap_or_else(|| json!({}));

        match self.registry.call(&params.name, arguments).await {
            Ok(result) => Ok(result),
            Err(ToolError::NotFound(name)) => Err(DispatchError::UnknownTool(name)),
            Err(e) => {
                warn!(target: "dispatcher", tool = %params.name, error = %e, "Tool call failed");
                Ok(CallToolResult::error(e.to_string()))
            }
        }
    }

    /// Handle one line of text from a line-delimited transport.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(line) {
            Ok(message) => self.handle(message).await,
            Err(e) => {
                debug!(target: "dispatcher", error = %e, "Unparseable JSON-RPC message");
                Some(JsonRpcResponse::failure(Value::Null, PARSE_ERROR, "Parse error"))
            }
        }
    }

    /// Handle a decoded JSON-RPC envelope.
    ///
    /// Returns `None` for notifications, which never get a response.
    pub async fn handle(&self, message: Value) -> Option<JsonRpcResponse> {
        let id = message.get("id").cloned().unwrap_or(Value::Null);

        if message.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            let e = DispatchError::InvalidRequest("jsonrpc must be \"2.0\"".to_string());
            debug!(target: "dispatcher", error = %e, "Rejecting envelope");
            return Some(JsonRpcResponse::failure(id, e.code(), e.to_string()));
        }

        let request: JsonRpcRequest = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                let e = DispatchError::InvalidRequest(e.to_string());
                debug!(target: "dispatcher", error = %e, "Rejecting envelope");
                return Some(JsonRpcResponse::failure(id, e.code(), e.to_string()));
            }
        };

        self.handle_request(request).await
    }

    /// Handle an already-validated request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            debug!(target: "dispatcher", method = %request.method, "Notification received");
            return None;
        };

        debug!(target: "dispatcher", method = %request.method, id = %id, "Dispatching request");

        match self.route(&request.method, request.params).await {
            Ok(result) => Some(JsonRpcResponse::success(id, result)),
            Err(e) => {
                debug!(target: "dispatcher", method = %request.method, code = e.code(), error = %e, "Request failed");
                Some(JsonRpcResponse::failure(id, e.code(), e.to_string()))
            }
        }
    }

    async fn route(&self, method: &str, params: Option<Value>) -> Result<Value, DispatchError> {
        match method {
            "initialize" => {
                let params: InitializeParams = match params {
                    Some(p) => serde_json::from_value(p)
                        .map_err(|e| DispatchError::InvalidParams(e.to_string()))?,
                    None => InitializeParams::default(),
                };
                if let Some(client) = &params.client_info {
                    info!(
                        target: "dispatcher",
                        client = %client.name,
                        client_version = %client.version,
                        "Client initializing"
                    );
                }
                let result = InitializeResult {
                    protocol_version: negotiate_protocol_version(params.protocol_version.as_deref())
                        .to_string(),
                    capabilities: ServerCapabilities {
                        tools: Some(ToolsCapability::default()),
                        experimental: None,
                    },
                    server_info: self.server_info.clone(),
                };
                Ok(serde_json::to_value(result)?)
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(serde_json::to_value(self.list_tools())?),
            "tools/call" => {
                let params = params
                    .ok_or_else(|| DispatchError::InvalidParams("missing params".to_string()))?;
                let params: CallToolParams = serde_json::from_value(params)
                    .map_err(|e| DispatchError::InvalidParams(e.to_string()))?;
                let result = self.call_tool(params).await?;
                Ok(serde_json::to_value(result)?)
            }
            other => Err(DispatchError::UnknownMethod(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_codes() {
        assert_eq!(DispatchError::InvalidRequest("x".into()).code(), -32600);
        assert_eq!(DispatchError::UnknownMethod("x".into()).code(), -32601);
        assert_eq!(DispatchError::UnknownTool("x".into()).code(), -32601);
        assert_eq!(DispatchError::InvalidParams("x".into()).code(), -32602);
        assert_eq!(DispatchError::Internal("x".into()).code(), -32603);
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let dispatcher = Dispatcher::new(ToolRegistry::new());
        let response = dispatcher.handle_line("{not json").await.unwrap();
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error_code(), Some(PARSE_ERROR));
    }
}
