//! Oura adapter -- daily sleep scores from the Oura v2 API.
//!
//! Credentials are a static `token.json` holding `CLIENT_ID`,
//! `CLIENT_SECRET` and `ACCESS_TOKEN`.  The access token is sent as a bearer
//! token; the client pair is only used by the `auth://{code}` resource,
//! which trades an authorization code for a fresh token.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use daybook_auth::{AuthEngineError, OAuthConfig, OAuthFlow, StaticToken, StaticTokenFile};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, display_value};
use crate::error::{AdapterError, Result};
use crate::traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ResourceTemplate, ToolDefinition,
    match_template,
};

/// Default Oura API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.ouraring.com";

/// Oura authorization endpoint.
pub const AUTHORIZE_URL: &str = "https://cloud.ouraring.com/oauth/authorize";

/// Oura token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://api.ouraring.com/oauth/token";

/// Redirect URI registered for the Oura application.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080";

const AUTH_TEMPLATE: &str = "auth://{code}";

/// Settings for [`OuraAdapter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OuraConfig {
    /// Static token file with `CLIENT_ID`, `CLIENT_SECRET`, `ACCESS_TOKEN`.
    pub token_file: PathBuf,
    /// API base URL.
    pub api_base: String,
    /// Token endpoint used by `auth://{code}`.
    pub token_url: String,
    /// Redirect URI sent with the code exchange.
    pub redirect_uri: String,
}

impl Default for OuraConfig {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from("token.json"),
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }
}

/// Secrets read from the token file on connect.
struct OuraCredentials {
    client_id: String,
    client_secret: String,
    access_token: StaticToken,
}

/// Oura sleep adapter.
pub struct OuraAdapter {
    /// Unique identifier for this adapter instance.
    id: String,
    config: OuraConfig,
    /// Loaded on connect; `None` while disconnected.
    credentials: Option<OuraCredentials>,
    api: ApiClient,
}

impl OuraAdapter {
    /// Create an Oura adapter from its settings.
    pub fn new(id: impl Into<String>, config: OuraConfig) -> Self {
        let api = ApiClient::new(&config.api_base);
        Self {
            id: id.into(),
            config,
            credentials: None,
            api,
        }
    }

    fn credentials(&self, name: &str) -> Result<&OuraCredentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| AdapterError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: format!("adapter `{}` is not connected", self.id),
            })
    }

    // -----------------------------------------------------------------------
    // API helpers
    // -----------------------------------------------------------------------

    /// Fetch one page of `daily_sleep` documents.
    async fn daily_sleep_page(
        &self,
        credentials: &OuraCredentials,
        start_date: &str,
        end_date: &str,
        next_token: Option<&str>,
    ) -> std::result::Result<Value, ApiError> {
        let url = self.api.endpoint(&["v2", "usercollection", "daily_sleep"])?;
        let mut query = vec![
            ("start_date", start_date.to_string()),
            ("end_date", end_date.to_string()),
        ];
        if let Some(token) = next_token {
            query.push(("next_token", token.to_string()));
        }
        debug!(start_date, end_date, paged = next_token.is_some(), "fetching daily sleep");
        self.api.get(url, &query, &credentials.access_token).await
    }

    // -----------------------------------------------------------------------
    // Tool implementations
    // -----------------------------------------------------------------------

    async fn last_nights_sleep(&self, credentials: &OuraCredentials, today: NaiveDate) -> String {
        let yesterday = today - Days::new(1);
        let tomorrow = today + Days::new(1);

        let page = match self
            .daily_sleep_page(credentials, &today.to_string(), &tomorrow.to_string(), None)
            .await
        {
            Ok(page) => page,
            Err(e) => return request_failed(&e),
        };

        let Some(day) = documents(&page).first() else {
            return "No data found".to_string();
        };
        let scores = SleepScores::from_document(day);
        format!(
            "Sleep scores for last night (from {yesterday} to {today}). Overall Sleep Score: {}\n\
             Deep Sleep: {}\nEfficiency: {}\nLatency: {}\nREM Sleep: {}\nRestfulness: {}\n\
             Timing: {}\nTotal Sleep: {}",
            scores.overall,
            scores.deep_sleep,
            scores.efficiency,
            scores.latency,
            scores.rem_sleep,
            scores.restfulness,
            scores.timing,
            scores.total_sleep,
        )
    }

    async fn sleep_documents(
        &self,
        credentials: &OuraCredentials,
        start_date: &str,
        end_date: &str,
    ) -> String {
        let mut out = String::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = match self
                .daily_sleep_page(credentials, start_date, end_date, next_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => return request_failed(&e),
            };

            let days = documents(&page);
            if days.is_empty() {
                break;
            }
            for day in days {
                let scores = SleepScores::from_document(day);
                out.push_str(&format!(
                    "Date: {}\n  Overall Sleep Score: {}\n  Deep Sleep: {}\n  Efficiency: {}\n  \
                     Latency: {}\n  REM Sleep: {}\n  Restfulness: {}\n  Timing: {}\n  \
                     Total Sleep: {}\n\n",
                    display_value(day.get("day")),
                    scores.overall,
                    scores.deep_sleep,
                    scores.efficiency,
                    scores.latency,
                    scores.rem_sleep,
                    scores.restfulness,
                    scores.timing,
                    scores.total_sleep,
                ));
            }

            next_token = page
                .get("next_token")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        if out.is_empty() {
            return "No data found".to_string();
        }
        out
    }

    async fn tool_get_sleep_documents(&self, params: Value) -> Result<Value> {
        const TOOL: &str = "get_sleep_documents";
        let credentials = self.credentials(TOOL)?;
        let start_date = required_date(&params, "start_date")?;
        let end_date = required_date(&params, "end_date")?;
        Ok(Value::String(
            self.sleep_documents(credentials, start_date, end_date).await,
        ))
    }

    // -----------------------------------------------------------------------
    // Resource implementations
    // -----------------------------------------------------------------------

    /// Exchange an authorization code for tokens.  Failures are reported in
    /// the returned document rather than as errors.
    async fn resource_exchange_code(&self, code: &str) -> Result<Value> {
        let credentials = self.credentials(AUTH_TEMPLATE)?;
        let flow = OAuthFlow::new(OAuthConfig {
            client_id: credentials.client_id.clone(),
            client_secret: Some(credentials.client_secret.clone()),
            auth_url: AUTHORIZE_URL.to_string(),
            token_url: self.config.token_url.clone(),
            redirect_uri: self.config.redirect_uri.clone(),
            scopes: Vec::new(),
            extra_params: Vec::new(),
        });

        match flow.exchange_code(code, None).await {
            Ok(tokens) => {
                info!(id = %self.id, "exchanged authorization code");
                Ok(serde_json::to_value(tokens)?)
            }
            Err(AuthEngineError::InvalidGrant {
                status,
                reason,
                body,
            }) => {
                warn!(id = %self.id, status, reason = %reason, "code exchange rejected");
                Ok(json!({ "error": format!("HTTP error: {status}"), "detail": body }))
            }
            Err(e) => {
                warn!(id = %self.id, error = %e, "code exchange failed");
                Ok(json!({ "error": e.to_string() }))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Sleep document helpers
// ---------------------------------------------------------------------------

/// The score and contributor values of one `daily_sleep` document, ready
/// for display.
struct SleepScores {
    overall: String,
    deep_sleep: String,
    efficiency: String,
    latency: String,
    rem_sleep: String,
    restfulness: String,
    timing: String,
    total_sleep: String,
}

impl SleepScores {
    fn from_document(day: &Value) -> Self {
        let contributor = |name: &str| display_value(day.pointer(&format!("/contributors/{name}")));
        Self {
            overall: display_value(day.get("score")),
            deep_sleep: contributor("deep_sleep"),
            efficiency: contributor("efficiency"),
            latency: contributor("latency"),
            rem_sleep: contributor("rem_sleep"),
            restfulness: contributor("restfulness"),
            timing: contributor("timing"),
            total_sleep: contributor("total_sleep"),
        }
    }
}

fn documents(page: &Value) -> &[Value] {
    page.get("data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn request_failed(e: &ApiError) -> String {
    format!("An error occurred while making the request: {e}")
}

fn required_date<'a>(params: &'a Value, field: &str) -> Result<&'a str> {
    let value = params
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AdapterError::InvalidParams {
            tool_name: "get_sleep_documents".into(),
            reason: format!("missing required string field `{field}`"),
        })?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| AdapterError::InvalidParams {
        tool_name: "get_sleep_documents".into(),
        reason: format!("`{field}` must be a YYYY-MM-DD date, got `{value}`"),
    })?;
    Ok(value)
}

fn build_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_last_nights_sleep_document".into(),
            description: "Returns the overall sleep score and sub-scores for the user's sleep \
                          last night."
                .into(),
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: "get_sleep_documents".into(),
            description: "Returns user's overall sleep score, and sub-scores for each day \
                          between start_date (inclusive) and end_date (exclusive)."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "start_date": {
                        "type": "string",
                        "description": "The start day to retrieve sleep score. YYYY-MM-DD format."
                    },
                    "end_date": {
                        "type": "string",
                        "description": "The last day to retrieve sleep score. YYYY-MM-DD format."
                    }
                },
                "required": ["start_date", "end_date"]
            }),
        },
    ]
}

// ---------------------------------------------------------------------------
// Adapter trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for OuraAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn server_name(&self) -> &str {
        "oura"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Health
    }

    async fn connect(&mut self) -> Result<()> {
        let auth_failed = |source: AuthEngineError| AdapterError::AuthFailed {
            adapter_id: self.id.clone(),
            source,
        };
        let file = StaticTokenFile::load(&self.config.token_file).map_err(auth_failed)?;
        let access_token = file.require("ACCESS_TOKEN").map_err(auth_failed)?;

        let client_id = file.get("CLIENT_ID").unwrap_or_default().to_string();
        let client_secret = file.get("CLIENT_SECRET").unwrap_or_default().to_string();
        if client_id.is_empty() || client_secret.is_empty() {
            warn!(id = %self.id, "token file has no client credentials, auth:// will fail");
        }

        self.credentials = Some(OuraCredentials {
            client_id,
            client_secret,
            access_token: StaticToken::new(access_token),
        });
        info!(id = %self.id, path = %self.config.token_file.display(), "oura adapter connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "oura adapter disconnected");
        self.credentials = None;
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        if self.credentials.is_none() {
            return Ok(HealthStatus::Unhealthy);
        }
        Ok(HealthStatus::Healthy)
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        build_tool_definitions()
    }

    async fn execute_tool(&self, name: &str, params: Value) -> Result<Value> {
        match name {
            "get_last_nights_sleep_document" => {
                let credentials = self.credentials(name)?;
                let today = Local::now().date_naive();
                Ok(Value::String(self.last_nights_sleep(credentials, today).await))
            }
            "get_sleep_documents" => self.tool_get_sleep_documents(params).await,
            _ => {
                self.credentials(name)?;
                Err(AdapterError::ToolNotFound {
                    adapter_id: self.id.clone(),
                    tool_name: name.to_string(),
                })
            }
        }
    }

    fn resource_templates(&self) -> Vec<ResourceTemplate> {
        vec![ResourceTemplate {
            uri_template: AUTH_TEMPLATE.into(),
            name: "exchange_code_for_token".into(),
            description: "Exchanges an Oura authorization code for an access token \
                          (development use only)."
                .into(),
            mime_type: "application/json".into(),
        }]
    }

    async fn read_resource(&self, uri: &str) -> Result<Value> {
        match match_template(AUTH_TEMPLATE, uri) {
            Some(vars) => {
                let code = vars.get("code").map(String::as_str).unwrap_or_default();
                self.resource_exchange_code(code).await
            }
            None => Err(AdapterError::ResourceNotFound {
                adapter_id: self.id.clone(),
                uri: uri.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "oura".into(),
            scopes: vec!["daily".into()],
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
