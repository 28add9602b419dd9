//! OAuth 2.0 Authorization Code Flow, with optional PKCE.
//!
//! Google installed-app clients get PKCE (RFC 7636) on top of the plain
//! RFC 6749 code grant.  Oura's token endpoint takes a confidential client
//! without a verifier, so the verifier is optional on every call.
//!
//! The consent round trip itself (browser, loopback redirect, state check)
//! lives in [`crate::source`]; this module only speaks to the provider's
//! endpoints.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AuthEngineError, Result};

/// Random bytes behind each PKCE verifier.
const PKCE_VERIFIER_BYTES: usize = 32;

/// Seconds before the real expiry at which a token is already treated as
/// expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// One provider's client registration and endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Sent on every token request when present.
    pub client_secret: Option<String>,
    /// Where the user grants consent.
    pub auth_url: String,
    /// Where codes and refresh tokens are traded for access tokens.
    pub token_url: String,
    /// Must match the URI registered for the client exactly.
    pub redirect_uri: String,
    pub scopes: Vec<String>,

    /// Provider-specific query parameters appended to the authorization URL
    /// (Google wants `access_type=offline` to hand out refresh tokens).
    #[serde(default)]
    pub extra_params: Vec<(String, String)>,
}

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

/// A successful grant, normalised from the provider's token response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    /// Absent when the provider does not rotate or issue one.
    pub refresh_token: Option<String>,
    /// Unix seconds; `None` means the provider gave no lifetime.
    pub expires_at: Option<i64>,
    pub token_type: String,
    /// Granted scopes, split from the space-separated `scope` field.
    pub scopes: Vec<String>,
}

/// Token endpoint success body (RFC 6749 section 5.1).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
}

impl TokenResponse {
    /// `expires_in` is relative, so it is anchored to the current clock here.
    fn into_tokens(self) -> OAuthTokens {
        let expires_at = self
            .expires_in
            .map(|secs| chrono::Utc::now().timestamp() + secs);

        let scopes = self
            .scope
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        OAuthTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scopes,
        }
    }
}

/// Token endpoint error body (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

// ---------------------------------------------------------------------------
// PKCE helpers
// ---------------------------------------------------------------------------

/// A fresh PKCE code verifier: 43 base64url characters from the system
/// CSPRNG.
pub fn generate_pkce_verifier() -> Result<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; PKCE_VERIFIER_BYTES];
    rng.fill(&mut bytes)
        .map_err(|_| AuthEngineError::FlowFailed {
            reason: "failed to generate PKCE verifier: CSPRNG error".to_string(),
        })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// The S256 challenge for `verifier`.
pub fn pkce_challenge(verifier: &str) -> String {
    let hash = digest::digest(&digest::SHA256, verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash.as_ref())
}

// ---------------------------------------------------------------------------
// OAuth flow
// ---------------------------------------------------------------------------

/// Drives the authorization code grant against one provider.
///
/// Stateless apart from its configuration; the verifier, state and tokens
/// are passed in by the caller.
pub struct OAuthFlow {
    config: OAuthConfig,
    client: reqwest::Client,
}

impl OAuthFlow {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// The configuration this flow was built with.
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// The consent page URL for `state`.
    ///
    /// A `code_challenge` adds the S256 PKCE pair of parameters; pass the
    /// matching verifier to [`OAuthFlow::exchange_code`] afterwards.
    pub fn authorization_url(&self, state: &str, code_challenge: Option<&str>) -> Result<String> {
        let mut url = Url::parse(&self.config.auth_url)?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &self.config.client_id);
            params.append_pair("redirect_uri", &self.config.redirect_uri);
            params.append_pair("state", state);

            if let Some(challenge) = code_challenge {
                params.append_pair("code_challenge", challenge);
                params.append_pair("code_challenge_method", "S256");
            }

            if !self.config.scopes.is_empty() {
                params.append_pair("scope", &self.config.scopes.join(" "));
            }

            for (key, value) in &self.config.extra_params {
                params.append_pair(key, value);
            }
        }

        Ok(url.to_string())
    }

    /// Trade an authorization code (and its PKCE verifier, if one was
    /// used) for tokens.  A rejection is [`AuthEngineError::InvalidGrant`].
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<OAuthTokens> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier));
        }
        self.grant(form).await
    }

    /// Obtain a new access token with `refresh_token`.  A revoked token is
    /// [`AuthEngineError::InvalidGrant`].
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        self.grant(vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    /// POST one grant to the token endpoint with the client credentials
    /// appended.
    async fn grant(&self, params: Vec<(&str, &str)>) -> Result<OAuthTokens> {
        let mut form: Vec<(&str, &str)> = params;
        form.push(("client_id", self.config.client_id.as_str()));
        if let Some(secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let grant_type = form.first().map(|(_, v)| *v).unwrap_or_default();
        tracing::debug!(token_url = %self.config.token_url, grant_type, "token request");

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), grant_type, "token request rejected");
            return Err(token_error(status, &body));
        }
        let tokens = response.json::<TokenResponse>().await?.into_tokens();
        tracing::debug!(
            grant_type,
            has_refresh = tokens.refresh_token.is_some(),
            "token request succeeded"
        );
        Ok(tokens)
    }

    /// Expired once within 60 seconds of `expires_at`; never when the
    /// provider gave no lifetime.
    pub fn is_expired(tokens: &OAuthTokens) -> bool {
        expires_within_margin(tokens.expires_at)
    }
}

/// `true` when `expires_at` (unix seconds) is in the past or inside the
/// safety margin.
pub(crate) fn expires_within_margin(expires_at: Option<i64>) -> bool {
    match expires_at {
        Some(expires_at) => chrono::Utc::now().timestamp() >= expires_at - EXPIRY_MARGIN_SECS,
        None => false,
    }
}

/// Map a non-success token endpoint response into [`AuthEngineError::InvalidGrant`].
fn token_error(status: reqwest::StatusCode, body: &str) -> AuthEngineError {
    let reason = match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(parsed) => parsed.error_description.unwrap_or(parsed.error),
        Err(_) => format!("HTTP {status}: {body}"),
    };
    AuthEngineError::InvalidGrant {
        status: status.as_u16(),
        reason,
        body: body.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
