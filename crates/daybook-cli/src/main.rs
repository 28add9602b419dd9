//! CLI entry point for Daybook.
//!
//! This binary provides the `daybook` command with subcommands for serving
//! an adapter over MCP, authorizing Google accounts, and checking
//! credential status.

mod adapters;
mod cli;
mod config;
mod helpers;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use daybook_adapters::{GmailAdapter, GoogleCalendarAdapter};

use crate::cli::{AdapterKind, Cli, Commands, GoogleAdapterKind};
use crate::config::Config;
use crate::helpers::init_tracing;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { adapter } => cmd_serve(&cli.config, adapter).await,
        Commands::Auth { adapter } => cmd_auth(&cli.config, adapter).await,
        Commands::Status => cmd_status(&cli.config),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(config_path: &std::path::Path, kind: AdapterKind) -> Result<()> {
    init_tracing("info");

    let config = Config::load(config_path)?;
    info!(adapter = kind.id(), config = %config_path.display(), "starting daybook");

    let adapter = adapters::build_adapter(kind, &config);
    daybook_mcp::serve_stdio(adapter)
        .await
        .with_context(|| format!("{} adapter session failed", kind.id()))?;

    info!(adapter = kind.id(), "daybook stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: auth
// ---------------------------------------------------------------------------

async fn cmd_auth(config_path: &std::path::Path, kind: GoogleAdapterKind) -> Result<()> {
    init_tracing("info");

    let config = Config::load(config_path)?;
    let consent = config.auth.consent_options();

    match kind {
        GoogleAdapterKind::Calendar => {
            let adapter = GoogleCalendarAdapter::new("calendar", config.calendar)
                .with_consent_options(consent);
            let credentials = adapter.credentials();
            let status = credentials
                .ensure_valid()
                .await
                .context("calendar authorization failed")?;
            println!("  calendar: {status} ({})", credentials.token_path().display());
        }
        GoogleAdapterKind::Gmail => {
            let adapter =
                GmailAdapter::new("gmail", config.gmail).with_consent_options(consent);
            for (account, credentials) in adapter.credentials() {
                let status = credentials
                    .ensure_valid()
                    .await
                    .with_context(|| format!("authorization of account `{account}` failed"))?;
                println!(
                    "  {account}: {status} ({})",
                    credentials.token_path().display()
                );
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

fn cmd_status(config_path: &std::path::Path) -> Result<()> {
    init_tracing("warn");

    let config = Config::load(config_path)?;

    println!();
    println!("  Daybook Status");
    println!("  ==============");
    println!();
    println!("  Config: {}", helpers::file_state(config_path));

    for kind in adapters::ALL_ADAPTERS {
        println!();
        for line in adapters::credential_report(kind, &config) {
            println!("  {line}");
        }
    }
    println!();
    Ok(())
}
