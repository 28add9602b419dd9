//! Shared helper functions used across CLI subcommands.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with the given default log level.
///
/// Output always goes to stderr: stdout carries MCP frames while serving.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Render a file check as `OK (path)` or `MISSING (path)`.
pub fn file_state(path: &std::path::Path) -> String {
    let state = if path.exists() { "OK" } else { "MISSING" };
    format!("{state} ({})", path.display())
}
