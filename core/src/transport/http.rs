// HTTP/SSE binding
//
// POST /mcp carries JSON-RPC envelopes; GET /sse only acknowledges the connection.

use crate::mcp::types::{JsonRpcResponse, INTERNAL_ERROR, PARSE_ERROR};
use crate::mcp::Dispatcher;
use crate::{ParrotError, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// HTTP transport configuration
#[derive(Clone, Debug)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl HttpServerConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("PARROT_HTTP_HOST")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(default.host),
            port: std::env::var("PARROT_HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(default.port),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone)]
struct HttpState {
    dispatcher: Arc<Dispatcher>,
}

/// HTTP/SSE server around a shared [`Dispatcher`]
pub struct HttpServer {
    config: HttpServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// Build the router without binding a socket
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.dispatcher))
    }

    /// Bind and serve until ctrl-c
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.addr();
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ParrotError::TransportError(format!("failed to bind {}: {}", addr, e)))?;

        info!(target: "http", url = %format!("http://{}", addr), "MCP server running on HTTP/SSE");
        info!(target: "http", url = %format!("http://{}/sse", addr), "SSE endpoint");
        info!(target: "http", url = %format!("http://{}/mcp", addr), "MCP endpoint");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!(target: "http", "HTTP server stopped");
        Ok(())
    }
}

/// Routes for the HTTP binding, CORS fully open
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/sse", get(sse_handler))
        .route("/mcp", post(mcp_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(HttpState { dispatcher })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(target: "http", error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Logs when the SSE stream is dropped, i.e. the client went away
struct SseConnection;

impl Drop for SseConnection {
    fn drop(&mut self) {
        info!(target: "http", "SSE client disconnected");
    }
}

/// Connection acknowledgement, then silence (keep-alive comments) until disconnect
async fn sse_handler() -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    info!(target: "http", "New SSE client connected");

    let connection = SseConnection;
    let connected = Event::default().data(json!({ "type": "connected" }).to_string());
    let stream = tokio_stream::once(Ok(connected))
        .chain(tokio_stream::pending())
        .map(move |event| {
            let _ = &connection;
            event
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// JSON-RPC over POST. The request runs on its own task so a client
/// disconnect does not cancel generation.
async fn mcp_handler(State(state): State<HttpState>, body: Bytes) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(target: "http", error = %e, "Rejecting unparseable request body");
            return respond(JsonRpcResponse::failure(Value::Null, PARSE_ERROR, "Parse error"));
        }
    };

    let id = message.get("id").cloned().unwrap_or(Value::Null);
    let dispatcher = Arc::clone(&state.dispatcher);

    match tokio::spawn(async move { dispatcher.handle(message).await }).await {
        Ok(Some(response)) => respond(response),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            error!(target: "http", error = %e, "Error handling request");
            respond(JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()))
        }
    }
}

fn respond(response: JsonRpcResponse) -> Response {
    (status_for(&response), Json(response)).into_response()
}

/// HTTP status for a JSON-RPC envelope: internal failures are 500, every
/// other protocol error is the caller's fault.
pub fn status_for(response: &JsonRpcResponse) -> StatusCode {
    match response.error_code() {
        None => StatusCode::OK,
        Some(INTERNAL_ERROR) => StatusCode::INTERNAL_SERVER_ERROR,
        Some(_) => StatusCode::BAD_REQUEST,
    }
}
