//! Model Context Protocol server for Daybook adapters.
//!
//! One process serves exactly one adapter.  [`McpServer`] maps MCP methods
//! onto the [`daybook_adapters::Adapter`] trait and [`stdio`] carries the
//! newline-delimited JSON-RPC messages between the agent host and the
//! server.

pub mod error;
pub mod protocol;
pub mod server;
pub mod stdio;

pub use error::{McpError, Result};
pub use protocol::{JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use stdio::{run, serve, serve_stdio};
