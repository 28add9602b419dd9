//! Adapter construction and credential inspection.
//!
//! `serve`, `auth` and `status` all build adapters from the same
//! configuration; this module is the single place that maps an
//! [`AdapterKind`] onto a configured adapter.

use daybook_adapters::{
    Adapter, DemoAdapter, GmailAdapter, GoogleCalendarAdapter, LeagueAdapter, OuraAdapter,
};

use crate::cli::AdapterKind;
use crate::config::Config;
use crate::helpers::file_state;

/// Every adapter, in the order `status` reports them.
pub const ALL_ADAPTERS: [AdapterKind; 5] = [
    AdapterKind::Calendar,
    AdapterKind::Gmail,
    AdapterKind::League,
    AdapterKind::Oura,
    AdapterKind::Demo,
];

impl AdapterKind {
    /// The adapter id used in logs.
    pub fn id(self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Gmail => "gmail",
            Self::League => "league",
            Self::Oura => "oura",
            Self::Demo => "demo",
        }
    }
}

/// Build the configured adapter for `kind`.  The adapter is not connected.
pub fn build_adapter(kind: AdapterKind, config: &Config) -> Box<dyn Adapter> {
    let consent = config.auth.consent_options();
    match kind {
        AdapterKind::Calendar => Box::new(
            GoogleCalendarAdapter::new(kind.id(), config.calendar.clone())
                .with_consent_options(consent),
        ),
        AdapterKind::Gmail => Box::new(
            GmailAdapter::new(kind.id(), config.gmail.clone()).with_consent_options(consent),
        ),
        AdapterKind::League => Box::new(LeagueAdapter::new(kind.id(), config.league.clone())),
        AdapterKind::Oura => Box::new(OuraAdapter::new(kind.id(), config.oura.clone())),
        AdapterKind::Demo => Box::new(DemoAdapter::new(kind.id())),
    }
}

/// Human-readable credential report for one adapter: the server name
/// followed by indented detail lines.
pub fn credential_report(kind: AdapterKind, config: &Config) -> Vec<String> {
    let adapter = build_adapter(kind, config);
    let mut lines = vec![format!("{} ({})", adapter.server_name(), kind.id())];

    match kind {
        AdapterKind::Calendar => {
            lines.push(format!(
                "  client secrets: {}",
                file_state(&config.calendar.client_secrets)
            ));
            lines.push(format!(
                "  token file:     {}",
                file_state(&config.calendar.token_file)
            ));
        }
        AdapterKind::Gmail => {
            lines.push(format!(
                "  client secrets: {}",
                file_state(&config.gmail.client_secrets)
            ));
            for account in &config.gmail.accounts {
                lines.push(format!(
                    "  token file:     {}",
                    file_state(&config.gmail.token_path(account))
                ));
            }
        }
        AdapterKind::Oura => {
            lines.push(format!(
                "  token file:     {}",
                file_state(&config.oura.token_file)
            ));
        }
        AdapterKind::League | AdapterKind::Demo => {}
    }

    match adapter.required_auth() {
        Some(auth) => lines.push(format!(
            "  auth:           {} [{}]",
            auth.provider,
            auth.scopes.join(", ")
        )),
        None => lines.push("  auth:           none".to_string()),
    }
    lines
}
