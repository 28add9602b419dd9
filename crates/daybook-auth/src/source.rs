//! Access-token sources handed to adapters.
//!
//! Adapters never look at token files directly; they ask a [`TokenSource`]
//! for a bearer token right before each API call.  [`StaticToken`] wraps a
//! fixed secret, [`GoogleCredentials`] runs the full lifecycle: load the
//! token file, refresh it when expired, fall back to an interactive consent
//! flow, and persist whatever changed.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use crate::callback::CallbackServer;
use crate::error::{AuthEngineError, Result};
use crate::files::{AuthorizedUser, ClientSecrets};
use crate::oauth::{OAuthFlow, generate_pkce_verifier, pkce_challenge};

/// Default timeout for the consent callback in seconds (5 minutes).
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;

/// Something that can produce a bearer token for an API call.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return an access token that is valid right now.
    async fn access_token(&self) -> Result<String>;
}

// ---------------------------------------------------------------------------
// StaticToken
// ---------------------------------------------------------------------------

/// A fixed token that never expires from our point of view.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// GoogleCredentials
// ---------------------------------------------------------------------------

/// How the interactive consent flow is run.
#[derive(Debug, Clone)]
pub struct ConsentOptions {
    /// Loopback port for the redirect; `0` picks a free one.
    pub callback_port: u16,
    /// How long to wait for the user to finish in the browser.
    pub timeout_secs: u64,
    /// Try to launch the system browser with the authorization URL.
    pub open_browser: bool,
    /// Receives the authorization URL once the callback server is
    /// listening, for hosts that present it themselves.
    pub url_sink: Option<UnboundedSender<String>>,
}

impl Default for ConsentOptions {
    fn default() -> Self {
        Self {
            callback_port: 0,
            timeout_secs: DEFAULT_CALLBACK_TIMEOUT_SECS,
            open_browser: true,
            url_sink: None,
        }
    }
}

/// What [`GoogleCredentials::ensure_valid`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    /// The stored token was still valid.
    Valid,
    /// The stored token was refreshed and written back.
    Refreshed,
    /// A new token was obtained through the consent flow and written.
    Authorized,
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Refreshed => write!(f, "refreshed"),
            Self::Authorized => write!(f, "authorized"),
        }
    }
}

/// File-backed Google user credentials that refresh themselves.
pub struct GoogleCredentials {
    token_path: PathBuf,
    client_secrets_path: PathBuf,
    scopes: Vec<String>,
    consent: ConsentOptions,
    /// Loaded token file; `None` until first use.
    current: Mutex<Option<AuthorizedUser>>,
}

impl GoogleCredentials {
    pub fn new(
        token_path: impl Into<PathBuf>,
        client_secrets_path: impl Into<PathBuf>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            token_path: token_path.into(),
            client_secrets_path: client_secrets_path.into(),
            scopes,
            consent: ConsentOptions::default(),
            current: Mutex::new(None),
        }
    }

    pub fn with_consent_options(mut self, consent: ConsentOptions) -> Self {
        self.consent = consent;
        self
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    pub fn client_secrets_path(&self) -> &Path {
        &self.client_secrets_path
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Make sure a valid token exists, refreshing or running the consent
    /// flow as needed, and persist the token file if anything changed.
    pub async fn ensure_valid(&self) -> Result<CredentialStatus> {
        let mut current = self.current.lock().await;
        self.ensure_locked(&mut current).await
    }

    async fn ensure_locked(&self, current: &mut Option<AuthorizedUser>) -> Result<CredentialStatus> {
        if current.is_none() {
            *current = self.load_token_file()?;
        }

        if let Some(user) = current.as_mut() {
            if user.is_valid() {
                return Ok(CredentialStatus::Valid);
            }

            if let Some(refresh_token) = user.refresh_token.clone() {
                tracing::debug!(path = %self.token_path.display(), "access token expired, refreshing");
                let flow = OAuthFlow::new(user.refresh_config());
                let tokens = flow.refresh_token(&refresh_token).await?;
                user.apply_refresh(tokens);
                user.save(&self.token_path)?;
                tracing::info!(path = %self.token_path.display(), "token refreshed");
                return Ok(CredentialStatus::Refreshed);
            }
        }

        let user = self.run_consent().await?;
        user.save(&self.token_path)?;
        tracing::info!(path = %self.token_path.display(), "new token saved");
        *current = Some(user);
        Ok(CredentialStatus::Authorized)
    }

    /// Load the token file, discarding it when it was granted for a
    /// narrower set of scopes than we need now.
    fn load_token_file(&self) -> Result<Option<AuthorizedUser>> {
        let Some(user) = AuthorizedUser::load(&self.token_path)? else {
            tracing::debug!(path = %self.token_path.display(), "no token file");
            return Ok(None);
        };
        if !user.covers_scopes(&self.scopes) {
            tracing::warn!(
                path = %self.token_path.display(),
                granted = ?user.scopes,
                required = ?self.scopes,
                "token file lacks required scopes, re-authorizing"
            );
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Run the installed-app consent flow against the loopback redirect.
    async fn run_consent(&self) -> Result<AuthorizedUser> {
        let secrets = ClientSecrets::load(&self.client_secrets_path)?;

        let server = CallbackServer::bind(self.consent.callback_port).await?;
        let redirect_uri = server.redirect_uri()?;
        let flow = OAuthFlow::new(secrets.oauth_config(&redirect_uri, &self.scopes));

        let code_verifier = generate_pkce_verifier()?;
        let code_challenge = pkce_challenge(&code_verifier);
        let state = uuid::Uuid::now_v7().to_string();

        let auth_url = flow.authorization_url(&state, Some(&code_challenge))?;
        tracing::info!(url = %auth_url, "open this URL in your browser to authorize");
        if self.consent.open_browser {
            open_browser(&auth_url);
        }
        if let Some(sink) = &self.consent.url_sink {
            if sink.send(auth_url.clone()).is_err() {
                tracing::debug!("authorization URL receiver dropped");
            }
        }

        let (code, returned_state) = server.wait(self.consent.timeout_secs).await?;
        if returned_state != state {
            return Err(AuthEngineError::FlowFailed {
                reason: format!("state mismatch: expected {state}, got {returned_state}"),
            });
        }

        tracing::debug!("state parameter verified, exchanging code for tokens");
        let tokens = flow.exchange_code(&code, Some(&code_verifier)).await?;
        Ok(AuthorizedUser::from_tokens(tokens, flow.config()))
    }
}

#[async_trait]
impl TokenSource for GoogleCredentials {
    async fn access_token(&self) -> Result<String> {
        let mut current = self.current.lock().await;
        self.ensure_locked(&mut current).await?;
        current
            .as_ref()
            .and_then(|user| user.token.clone())
            .ok_or_else(|| AuthEngineError::TokenExpired {
                provider: "google".to_string(),
            })
    }
}

/// Best-effort launch of the system browser.  Output is discarded because
/// stdout may be the protocol channel.
fn open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = std::process::Command::new("open");
        c.arg(url);
        c
    };
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = {
        let mut c = std::process::Command::new("xdg-open");
        c.arg(url);
        c
    };

    let spawned = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "could not open a browser, visit the URL manually");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
