//! HTTP/SSE transport tests against the router, no socket involved

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use parrot_core::mcp::CallToolResult;
use parrot_core::transport::http::router;
use parrot_core::{Dispatcher, Tool, ToolRegistry, ToolResult};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tower::ServiceExt;

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> String {
        "echo".to_string()
    }

    fn description(&self) -> String {
        "Echo the given text".to_string()
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": { "text": { "type": "string" } } })
    }

    async fn call(&self, arguments: Value) -> ToolResult<CallToolResult> {
        Ok(CallToolResult::text(arguments["text"].as_str().unwrap_or_default()))
    }
}

fn app() -> axum::Router {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool));
    router(Arc::new(Dispatcher::new(registry)))
}

async fn post_mcp(body: impl Into<Body>) -> (StatusCode, Option<Value>) {
    let response = app()
        .oneshot(
            Request::post("/mcp")
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).ok();
    (status, json)
}

#[tokio::test]
async fn tools_call_returns_200() {
    let (status, body) = post_mcp(
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": "echo", "arguments": { "text": "hi" } }
        })
        .to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["content"][0]["text"], "hi");
}

#[tokio::test]
async fn tools_list_returns_200() {
    let (status, body) = post_mcp(json!({ "jsonrpc": "2.0", "id": "x", "method": "tools/list" }).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["result"]["tools"][0]["name"], "echo");
}

#[tokio::test]
async fn wrong_jsonrpc_version_is_400() {
    let (status, body) = post_mcp(json!({ "jsonrpc": "1.0", "id": 2, "method": "ping" }).to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = body.unwrap();
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], 2);
}

#[tokio::test]
async fn unknown_tool_is_400() {
    let (status, body) = post_mcp(
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": { "name": "nope" }
        })
        .to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = body.unwrap();
    assert_eq!(body["error"]["code"], -32601);
    assert!(body["error"]["message"].as_str().unwrap().contains("Unknown tool: nope"));
}

#[tokio::test]
async fn unparseable_body_is_parse_error() {
    let (status, body) = post_mcp("{oops").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = body.unwrap();
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());
}

#[tokio::test]
async fn notification_is_accepted_without_body() {
    let (status, body) = post_mcp(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string()).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_none());
}

#[tokio::test]
async fn sse_acknowledges_connection() {
    let response = app()
        .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let mut stream = response.into_body().into_data_stream();
    let first = stream.next().await.unwrap().unwrap();
    let first = String::from_utf8(first.to_vec()).unwrap();
    assert!(first.starts_with("data: "));
    assert!(first.contains(r#"{"type":"connected"}"#));
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let response = app()
        .oneshot(
            Request::post("/mcp")
                .header(header::ORIGIN, "http://example.com")
                .body(Body::from(json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
