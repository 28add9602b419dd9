//! On-disk credential formats.
//!
//! - [`ClientSecrets`]: the OAuth client file downloaded from the Google
//!   Cloud console (`credentials.json`).
//! - [`AuthorizedUser`]: the per-user token file (`token.json`,
//!   `<account>-token.json`).  The layout matches what Google's own client
//!   libraries write, so a token file produced by either side can be reused.
//! - [`StaticTokenFile`]: a flat JSON object of provider secrets such as
//!   `{"ACCESS_TOKEN": "..."}`.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AuthEngineError, Result};
use crate::oauth::{OAuthConfig, OAuthTokens, expires_within_margin};

/// Default Google authorization endpoint.
pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Default Google token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

// ---------------------------------------------------------------------------
// Client secrets
// ---------------------------------------------------------------------------

/// The client entry inside a client-secrets file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSecretsEntry {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// On-disk shape: desktop clients sit under `installed`, web clients
/// under `web`.
#[derive(Debug, Deserialize)]
struct RawClientSecrets {
    installed: Option<ClientSecretsEntry>,
    web: Option<ClientSecretsEntry>,
}

/// A Google OAuth client-secrets file.
#[derive(Debug, Clone)]
pub struct ClientSecrets {
    client: ClientSecretsEntry,
}

impl ClientSecrets {
    /// Read and parse a client-secrets file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AuthEngineError::InvalidConfig {
            reason: format!("cannot read client secrets {}: {e}", path.display()),
        })?;
        Self::parse(&content)
    }

    /// Parse client-secrets JSON, preferring the `installed` entry.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawClientSecrets = serde_json::from_str(content)?;
        let client = raw
            .installed
            .or(raw.web)
            .ok_or_else(|| AuthEngineError::InvalidConfig {
                reason: "client secrets have neither an `installed` nor a `web` section"
                    .to_string(),
            })?;
        Ok(Self { client })
    }

    /// The client entry.
    pub fn client(&self) -> &ClientSecretsEntry {
        &self.client
    }

    /// Build the [`OAuthConfig`] for a consent flow redirecting to
    /// `redirect_uri`.
    pub fn oauth_config(&self, redirect_uri: &str, scopes: &[String]) -> OAuthConfig {
        let client = self.client();
        OAuthConfig {
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            auth_url: client.auth_uri.clone(),
            token_url: client.token_uri.clone(),
            redirect_uri: redirect_uri.to_string(),
            scopes: scopes.to_vec(),
            // Without `prompt=consent` Google skips the refresh token on re-consent.
            extra_params: vec![
                ("access_type".to_string(), "offline".to_string()),
                ("prompt".to_string(), "consent".to_string()),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Authorized user token file
// ---------------------------------------------------------------------------

/// Persisted user credentials for a Google API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    /// The current access token.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default = "default_universe_domain")]
    pub universe_domain: String,
    #[serde(default)]
    pub account: String,
    /// When the access token expires (UTC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_universe_domain() -> String {
    "googleapis.com".to_string()
}

impl AuthorizedUser {
    /// Build a fresh token file from a completed consent flow.
    pub fn from_tokens(tokens: OAuthTokens, config: &OAuthConfig) -> Self {
        let scopes = if tokens.scopes.is_empty() {
            config.scopes.clone()
        } else {
            tokens.scopes.clone()
        };
        Self {
            token: Some(tokens.access_token),
            refresh_token: tokens.refresh_token,
            token_uri: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scopes,
            universe_domain: default_universe_domain(),
            account: String::new(),
            expiry: tokens
                .expires_at
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
        }
    }

    /// Load a token file.  A missing file is `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the token file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "token file written");
        Ok(())
    }

    /// Whether the access token has expired (or is about to).
    pub fn is_expired(&self) -> bool {
        expires_within_margin(self.expiry.map(|e| e.timestamp()))
    }

    /// An access token is present and has not expired.
    pub fn is_valid(&self) -> bool {
        self.token.is_some() && !self.is_expired()
    }

    /// Whether every scope in `required` was granted.
    pub fn covers_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|s| self.scopes.contains(s))
    }

    /// The OAuth configuration needed to refresh this token.
    pub fn refresh_config(&self) -> OAuthConfig {
        OAuthConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            auth_url: GOOGLE_AUTH_URI.to_string(),
            token_url: self.token_uri.clone(),
            redirect_uri: String::new(),
            scopes: self.scopes.clone(),
            extra_params: vec![],
        }
    }

    /// Fold a refresh response into this token file.  Refresh responses
    /// usually omit the refresh token; the existing one is kept then.
    pub fn apply_refresh(&mut self, tokens: OAuthTokens) {
        self.token = Some(tokens.access_token);
        if tokens.refresh_token.is_some() {
            self.refresh_token = tokens.refresh_token;
        }
        self.expiry = tokens
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));
    }
}

// ---------------------------------------------------------------------------
// Static token file
// ---------------------------------------------------------------------------

/// A flat JSON object of static provider secrets.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenFile {
    values: Map<String, Value>,
}

impl StaticTokenFile {
    /// Load a static token file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AuthEngineError::InvalidConfig {
            reason: format!("cannot read token file {}: {e}", path.display()),
        })?;
        Self::parse(&content)
    }

    /// Parse static token JSON.  The top level must be an object.
    pub fn parse(content: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(content)? {
            Value::Object(values) => Ok(Self { values }),
            other => Err(AuthEngineError::InvalidConfig {
                reason: format!("token file must be a JSON object, got {other}"),
            }),
        }
    }

    /// A string value, or `None` if absent or not a string.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// A string value; absent or empty is an error.
    pub fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AuthEngineError::InvalidConfig {
                reason: format!("missing key `{key}` in token file"),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
