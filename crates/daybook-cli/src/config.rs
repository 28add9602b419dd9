//! `daybook.toml` loading.
//!
//! Every section and field has a default, so an absent file or an empty
//! one gives a working configuration that uses the conventional credential
//! file names in the current directory.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use daybook_adapters::{CalendarConfig, GmailConfig, LeagueConfig, OuraConfig};
use daybook_auth::ConsentOptions;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthSection,
    pub calendar: CalendarConfig,
    pub gmail: GmailConfig,
    pub league: LeagueConfig,
    pub oura: OuraConfig,
}

/// `[auth]`: how the interactive Google consent flow runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Loopback port for the OAuth redirect; `0` picks a free one.
    pub callback_port: u16,
    pub callback_timeout_secs: u64,
    pub open_browser: bool,
}

impl Default for AuthSection {
    fn default() -> Self {
        let consent = ConsentOptions::default();
        Self {
            callback_port: consent.callback_port,
            callback_timeout_secs: consent.timeout_secs,
            open_browser: consent.open_browser,
        }
    }
}

impl AuthSection {
    pub fn consent_options(&self) -> ConsentOptions {
        ConsentOptions {
            callback_port: self.callback_port,
            timeout_secs: self.callback_timeout_secs,
            open_browser: self.open_browser,
            url_sink: None,
        }
    }
}

impl Config {
    /// Load the configuration at `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}
