//! Newline-delimited JSON-RPC transport.
//!
//! Each inbound line is one message; each reply is written as one line and
//! flushed immediately.  The session ends when the reader reaches EOF.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use daybook_adapters::Adapter;

use crate::error::Result;
use crate::protocol::{JsonRpcResponse, PARSE_ERROR};
use crate::server::McpServer;

/// Serve MCP messages from `reader` until EOF, writing replies to `writer`.
pub async fn serve<R, W>(server: &McpServer, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            debug!("transport reached EOF");
            break;
        }

        let reply = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let message = line.trim();
                if message.is_empty() {
                    continue;
                }
                server.handle_message(message).await
            }
            Err(e) => {
                warn!(error = %e, "non-UTF-8 MCP message");
                let response = JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("failed to parse JSON-RPC request: {e}"),
                );
                match serde_json::to_string(&response) {
                    Ok(line) => Some(line),
                    Err(e) => {
                        warn!(error = %e, "failed to serialize parse error");
                        None
                    }
                }
            }
        };

        if let Some(reply) = reply {
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }
    Ok(())
}

/// Connect `adapter`, serve one session over the given streams, then
/// disconnect it.
pub async fn run<R, W>(mut adapter: Box<dyn Adapter>, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    adapter.connect().await?;
    info!(
        adapter = %adapter.id(),
        server = %adapter.server_name(),
        tools = adapter.tools().len(),
        "MCP server ready"
    );

    let mut shared: Arc<dyn Adapter> = Arc::from(adapter);
    let outcome = {
        let server = McpServer::new(Arc::clone(&shared));
        serve(&server, reader, writer).await
    };

    match Arc::get_mut(&mut shared) {
        Some(adapter) => {
            if let Err(e) = adapter.disconnect().await {
                warn!(error = %e, "adapter disconnect failed");
            }
        }
        None => warn!("adapter still shared at shutdown, skipping disconnect"),
    }

    info!("MCP session closed");
    outcome
}

/// Run one session on the process's stdin and stdout.
pub async fn serve_stdio(adapter: Box<dyn Adapter>) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    run(adapter, reader, tokio::io::stdout()).await
}
