//! Stdio transport tests over in-memory pipes

use async_trait::async_trait;
use parrot_core::mcp::CallToolResult;
use parrot_core::{Dispatcher, StdioServer, Tool, ToolRegistry, ToolResult};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::time::{sleep, Duration};

/// Takes a while to answer
struct SlowTool;

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> String {
        "slow".to_string()
    }

    fn description(&self) -> String {
        "Answers after a delay".to_string()
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _arguments: Value) -> ToolResult<CallToolResult> {
        sleep(Duration::from_millis(200)).await;
        Ok(CallToolResult::text("done"))
    }
}

/// Feed `input` to a stdio server and collect every response line
async fn run(input: &str) -> Vec<Value> {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(SlowTool));
    let server = StdioServer::new(Arc::new(Dispatcher::new(registry)));

    let (server_out, mut client_in) = tokio::io::duplex(64 * 1024);
    let reader = tokio::spawn(async move {
        let mut output = String::new();
        client_in.read_to_string(&mut output).await.unwrap();
        output
    });

    server.serve_io(input.as_bytes(), server_out).await.unwrap();

    reader
        .await
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn answers_one_line_per_request() {
    let responses = run(concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        "\n",
    ))
    .await;

    assert_eq!(responses.len(), 2);
    let mut ids: Vec<i64> = responses.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn slow_call_does_not_block_ping() {
    let responses = run(concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"slow"}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
        "\n",
    ))
    .await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], 2);
    assert_eq!(responses[1]["id"], 1);
    assert_eq!(responses[1]["result"]["content"][0]["text"], "done");
}

#[tokio::test]
async fn bad_lines_get_error_envelopes() {
    let responses = run(concat!(
        "this is not json\n",
        r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"missing"}}"#,
        "\n",
    ))
    .await;

    assert_eq!(responses.len(), 2);
    let parse_error = responses.iter().find(|r| r["id"].is_null()).unwrap();
    assert_eq!(parse_error["error"]["code"], -32700);
    let unknown = responses.iter().find(|r| r["id"] == 7).unwrap();
    assert_eq!(unknown["error"]["code"], -32601);
}

#[tokio::test]
async fn pending_requests_finish_after_eof() {
    let responses = run("{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"tools/call\",\"params\":{\"name\":\"slow\"}}").await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["result"]["isError"], false);
}
