//! CLI argument definitions for Daybook.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Daybook -- personal-data adapters served over MCP.
#[derive(Parser)]
#[command(
    name = "daybook",
    version,
    about = "Daybook -- personal-data adapters served over MCP",
    long_about = "Exposes calendar, email, game telemetry and sleep data to an AI agent \
                  through the Model Context Protocol, one adapter per process."
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, global = true, default_value = "daybook.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve one adapter over MCP on stdin/stdout.
    Serve {
        /// The adapter to expose.
        #[arg(value_enum)]
        adapter: AdapterKind,
    },

    /// Run the Google credential lifecycle and write token files.
    Auth {
        /// The Google-backed adapter to authorize.
        #[arg(value_enum)]
        adapter: GoogleAdapterKind,
    },

    /// Show credential files and required scopes for every adapter.
    Status,
}

/// Adapters that can be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AdapterKind {
    Calendar,
    Gmail,
    League,
    Oura,
    Demo,
}

/// Adapters whose credentials come from the Google consent flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GoogleAdapterKind {
    Calendar,
    Gmail,
}
