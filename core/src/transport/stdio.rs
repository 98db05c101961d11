//! Newline-delimited JSON-RPC over standard input/output.
//!
//! Every inbound line is dispatched on its own task so a long `tools/call`
//! does not hold up a `ping`. Responses funnel through a channel into a single
//! writer, one JSON object per line. Nothing but protocol data goes to stdout.

use crate::mcp::{Dispatcher, JsonRpcResponse};
use crate::{ParrotError, Result};
use std::sync::Arc;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Stdio binding around a shared [`Dispatcher`]
pub struct StdioServer {
    dispatcher: Arc<Dispatcher>,
}

impl StdioServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Serve the process's stdin/stdout until stdin closes
    pub async fn serve(self) -> Result<()> {
        info!(target: "stdio", "MCP server running on stdio");
        self.serve_io(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Serve an arbitrary line reader and writer; returns after EOF once
    /// every in-flight request has been answered.
    pub async fn serve_io<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(rx, writer));

        let mut in_flight = JoinSet::new();
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let dispatcher = Arc::clone(&self.dispatcher);
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = dispatcher.handle_line(&line).await {
                    if tx.send(response).is_err() {
                        warn!(target: "stdio", "Writer closed; dropping response");
                    }
                }
            });
        }

        debug!(target: "stdio", pending = in_flight.len(), "stdin closed; draining in-flight requests");
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                warn!(target: "stdio", error = %e, "Request task failed");
            }
        }

        drop(tx);
        writer_task
            .await
            .map_err(|e| ParrotError::TransportError(format!("stdout writer task failed: {}", e)))?
    }
}

async fn write_responses<W>(mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_string(&response)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    writer.shutdown().await?;
    Ok(())
}
