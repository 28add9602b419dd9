//! Error types for the MCP crate.

use daybook_adapters::AdapterError;

/// Errors that end an MCP session.
///
/// Per-request failures never surface here; they are answered with a
/// JSON-RPC error object and the session continues.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Reading from or writing to the transport failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The adapter could not be started or stopped.
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),
}

/// Convenience result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;
