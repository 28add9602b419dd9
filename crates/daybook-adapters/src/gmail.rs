//! Gmail adapter -- inbox triage across several Google accounts.
//!
//! Every configured account has its own `<account>-token.json` next to the
//! others in `token_dir`, all minted from one shared OAuth client file.
//! `connect` brings every account's credentials up to date in order, so
//! a first run walks the user through one consent screen per account.

use std::path::PathBuf;

use async_trait::async_trait;
use daybook_auth::{ConsentOptions, GoogleCredentials};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::error::{AdapterError, Result};
use crate::traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ResourceDefinition, ToolDefinition,
};

/// Default Gmail v1 API base URL.
pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Full mailbox scope.
pub const GMAIL_SCOPE: &str = "https://mail.google.com/";

/// Default page size for `gmail_list_messages`.
const DEFAULT_MAX_RESULTS: u64 = 10;

/// Upper bound for `gmail_list_messages`.
const MAX_RESULTS_LIMIT: u64 = 100;

/// Headers fetched for each line of a message listing.
const LISTING_HEADERS: &[&str] = &["From", "Subject", "Date"];

/// Headers shown by `gmail_get_message`.
const MESSAGE_HEADERS: &[&str] = &["From", "To", "Date", "Subject"];

/// Settings for [`GmailAdapter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailConfig {
    /// Google OAuth client file shared by every account.
    pub client_secrets: PathBuf,
    /// Directory holding `<account>-token.json` files.
    pub token_dir: PathBuf,
    /// Account names, in the order they are authorized.
    pub accounts: Vec<String>,
    /// API base URL.
    pub api_base: String,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            client_secrets: PathBuf::from("../credentials.json"),
            token_dir: PathBuf::from("."),
            accounts: vec!["ybotuil".into(), "ybot".into(), "liutoby".into()],
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl GmailConfig {
    /// Token file for one account.
    pub fn token_path(&self, account: &str) -> PathBuf {
        self.token_dir.join(format!("{account}-token.json"))
    }
}

/// One mailbox and its credentials.
struct GmailAccount {
    name: String,
    credentials: GoogleCredentials,
}

/// Gmail adapter.
pub struct GmailAdapter {
    /// Unique identifier for this adapter instance.
    id: String,
    /// Whether the adapter has been connected.
    connected: bool,
    /// Configured accounts, in authorization order.
    accounts: Vec<GmailAccount>,
    /// Gmail v1 API client.
    api: ApiClient,
}

impl GmailAdapter {
    /// Create a Gmail adapter from its settings.
    pub fn new(id: impl Into<String>, config: GmailConfig) -> Self {
        let accounts = config
            .accounts
            .iter()
            .map(|name| GmailAccount {
                name: name.clone(),
                credentials: GoogleCredentials::new(
                    config.token_path(name),
                    config.client_secrets.clone(),
                    vec![GMAIL_SCOPE.to_string()],
                ),
            })
            .collect();
        Self {
            id: id.into(),
            connected: false,
            accounts,
            api: ApiClient::new(&config.api_base),
        }
    }

    /// Override how the interactive consent flow runs for every account.
    pub fn with_consent_options(mut self, consent: ConsentOptions) -> Self {
        self.accounts = self
            .accounts
            .into_iter()
            .map(|account| GmailAccount {
                name: account.name,
                credentials: account.credentials.with_consent_options(consent.clone()),
            })
            .collect();
        self
    }

    /// Account names paired with their credentials.
    pub fn credentials(&self) -> impl Iterator<Item = (&str, &GoogleCredentials)> {
        self.accounts
            .iter()
            .map(|account| (account.name.as_str(), &account.credentials))
    }

    // -----------------------------------------------------------------------
    // Parameter helpers
    // -----------------------------------------------------------------------

    fn account(&self, tool_name: &str, params: &Value) -> Result<&GmailAccount> {
        let name = required_str(tool_name, params, "account")?;
        self.accounts
            .iter()
            .find(|account| account.name == name)
            .ok_or_else(|| AdapterError::InvalidParams {
                tool_name: tool_name.to_string(),
                reason: format!(
                    "unknown account `{name}`, expected one of: {}",
                    self.account_names().join(", ")
                ),
            })
    }

    fn account_names(&self) -> Vec<&str> {
        self.accounts.iter().map(|a| a.name.as_str()).collect()
    }

    fn failed(tool_name: &str, e: ApiError) -> AdapterError {
        AdapterError::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason: e.to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // API helpers
    // -----------------------------------------------------------------------

    async fn message_metadata(
        &self,
        account: &GmailAccount,
        message_id: &str,
        headers: &[&str],
    ) -> std::result::Result<Value, ApiError> {
        let url = self
            .api
            .endpoint(&["users", "me", "messages", message_id])?;
        let mut query = vec![("format", "metadata".to_string())];
        query.extend(headers.iter().map(|h| ("metadataHeaders", h.to_string())));
        self.api.get(url, &query, &account.credentials).await
    }

    async fn modify_labels(
        &self,
        tool_name: &str,
        params: &Value,
        remove: &str,
    ) -> Result<(String, String)> {
        let account = self.account(tool_name, params)?;
        let message_id = required_str(tool_name, params, "id")?;
        let url = self
            .api
            .endpoint(&["users", "me", "messages", message_id, "modify"])
            .map_err(|e| Self::failed(tool_name, e))?;
        let body = json!({ "removeLabelIds": [remove] });
        self.api
            .post(url, Some(&body), &account.credentials)
            .await
            .map_err(|e| Self::failed(tool_name, e))?;
        Ok((account.name.clone(), message_id.to_string()))
    }

    // -----------------------------------------------------------------------
    // Tool implementations
    // -----------------------------------------------------------------------

    fn tool_list_accounts(&self) -> Value {
        Value::String(self.account_names().join("\n"))
    }

    async fn tool_list_messages(&self, params: Value) -> Result<Value> {
        const TOOL: &str = "gmail_list_messages";
        let account = self.account(TOOL, &params)?;
        let max_results = params
            .get("max_results")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, MAX_RESULTS_LIMIT);

        let mut query = vec![("maxResults", max_results.to_string())];
        if let Some(q) = params.get("query").and_then(|v| v.as_str())
            && !q.is_empty()
        {
            query.push(("q", q.to_string()));
        }

        let url = self
            .api
            .endpoint(&["users", "me", "messages"])
            .map_err(|e| Self::failed(TOOL, e))?;
        debug!(account = %account.name, max_results, "listing messages");
        let listing = self
            .api
            .get(url, &query, &account.credentials)
            .await
            .map_err(|e| Self::failed(TOOL, e))?;

        let ids: Vec<&str> = listing
            .get("messages")
            .and_then(Value::as_array)
            .map(|messages| {
                messages
                    .iter()
                    .filter_map(|m| m.get("id").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        if ids.is_empty() {
            return Ok(Value::String("No messages found.".into()));
        }

        let fetches = ids
            .iter()
            .map(|id| self.message_metadata(account, id, LISTING_HEADERS));
        let mut lines = Vec::with_capacity(ids.len());
        for (id, message) in ids.iter().zip(join_all(fetches).await) {
            let message = message.map_err(|e| Self::failed(TOOL, e))?;
            lines.push(format!(
                "{id} | {} | {} | {}",
                header(&message, "Date"),
                header(&message, "From"),
                header(&message, "Subject"),
            ));
        }
        Ok(Value::String(lines.join("\n")))
    }

    async fn tool_get_message(&self, params: Value) -> Result<Value> {
        const TOOL: &str = "gmail_get_message";
        let account = self.account(TOOL, &params)?;
        let message_id = required_str(TOOL, &params, "id")?;
        let message = self
            .message_metadata(account, message_id, MESSAGE_HEADERS)
            .await
            .map_err(|e| Self::failed(TOOL, e))?;

        let labels = message
            .get("labelIds")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        let snippet = message.get("snippet").and_then(Value::as_str).unwrap_or("");

        Ok(Value::String(format!(
            "From: {}\nTo: {}\nDate: {}\nSubject: {}\nLabels: {labels}\n\n{snippet}",
            header(&message, "From"),
            header(&message, "To"),
            header(&message, "Date"),
            header(&message, "Subject"),
        )))
    }

    async fn tool_mark_read(&self, params: Value) -> Result<Value> {
        let (account, id) = self.modify_labels("gmail_mark_read", &params, "UNREAD").await?;
        info!(account = %account, message = %id, "marked as read");
        Ok(Value::String(format!("Message {id} marked as read.")))
    }

    async fn tool_archive(&self, params: Value) -> Result<Value> {
        let (account, id) = self.modify_labels("gmail_archive", &params, "INBOX").await?;
        info!(account = %account, message = %id, "archived");
        Ok(Value::String(format!("Message {id} archived.")))
    }

    async fn tool_trash(&self, params: Value) -> Result<Value> {
        const TOOL: &str = "gmail_trash";
        let account = self.account(TOOL, &params)?;
        let message_id = required_str(TOOL, &params, "id")?;
        let url = self
            .api
            .endpoint(&["users", "me", "messages", message_id, "trash"])
            .map_err(|e| Self::failed(TOOL, e))?;
        self.api
            .post(url, None, &account.credentials)
            .await
            .map_err(|e| Self::failed(TOOL, e))?;
        info!(account = %account.name, message = %message_id, "moved to trash");
        Ok(Value::String(format!("Message {message_id} moved to trash.")))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn required_str<'a>(tool_name: &str, params: &'a Value, field: &str) -> Result<&'a str> {
    params
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AdapterError::InvalidParams {
            tool_name: tool_name.to_string(),
            reason: format!("missing required string field `{field}`"),
        })
}

/// A header value from a `format=metadata` message, matched
/// case-insensitively.  Missing headers render empty.
fn header<'a>(message: &'a Value, name: &str) -> &'a str {
    message
        .pointer("/payload/headers")
        .and_then(Value::as_array)
        .and_then(|headers| {
            headers.iter().find(|h| {
                h.get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
        })
        .and_then(|h| h.get("value"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn account_and_id_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "account": {
                "type": "string",
                "description": "Account name as listed by gmail_list_accounts"
            },
            "id": {
                "type": "string",
                "description": description
            }
        },
        "required": ["account", "id"]
    })
}

fn build_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "gmail_list_accounts".into(),
            description: "List the Gmail accounts this server can read.".into(),
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: "gmail_list_messages".into(),
            description: "List messages in an account, newest first, as \
                          `id | date | from | subject` lines."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "account": {
                        "type": "string",
                        "description": "Account name as listed by gmail_list_accounts"
                    },
                    "query": {
                        "type": "string",
                        "description": "Gmail search query, e.g. `is:unread in:inbox`"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of messages (default 10, max 100)",
                        "minimum": 1,
                        "maximum": 100
                    }
                },
                "required": ["account"]
            }),
        },
        ToolDefinition {
            name: "gmail_get_message".into(),
            description: "Show the headers, labels and snippet of one message.".into(),
            parameters: account_and_id_schema("Message id"),
        },
        ToolDefinition {
            name: "gmail_mark_read".into(),
            description: "Mark a message as read.".into(),
            parameters: account_and_id_schema("Message id"),
        },
        ToolDefinition {
            name: "gmail_archive".into(),
            description: "Archive a message by removing it from the inbox.".into(),
            parameters: account_and_id_schema("Message id"),
        },
        ToolDefinition {
            name: "gmail_trash".into(),
            description: "Move a message to the trash.".into(),
            parameters: account_and_id_schema("Message id"),
        },
    ]
}

// ---------------------------------------------------------------------------
// Adapter trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for GmailAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn server_name(&self) -> &str {
        "gmail"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    async fn connect(&mut self) -> Result<()> {
        for account in &self.accounts {
            let status = account
                .credentials
                .ensure_valid()
                .await
                .map_err(|source| AdapterError::AuthFailed {
                    adapter_id: self.id.clone(),
                    source,
                })?;
            info!(id = %self.id, account = %account.name, credentials = %status, "account ready");
        }
        info!(id = %self.id, accounts = self.accounts.len(), "gmail adapter connected");
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "gmail adapter disconnected");
        self.connected = false;
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        if !self.connected {
            return Ok(HealthStatus::Unhealthy);
        }
        if self.accounts.is_empty() {
            return Ok(HealthStatus::Degraded);
        }
        Ok(HealthStatus::Healthy)
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        build_tool_definitions()
    }

    async fn execute_tool(&self, name: &str, params: Value) -> Result<Value> {
        if !self.connected {
            return Err(AdapterError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: format!("adapter `{}` is not connected", self.id),
            });
        }

        match name {
            "gmail_list_accounts" => Ok(self.tool_list_accounts()),
            "gmail_list_messages" => self.tool_list_messages(params).await,
            "gmail_get_message" => self.tool_get_message(params).await,
            "gmail_mark_read" => self.tool_mark_read(params).await,
            "gmail_archive" => self.tool_archive(params).await,
            "gmail_trash" => self.tool_trash(params).await,
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn resources(&self) -> Vec<ResourceDefinition> {
        vec![ResourceDefinition {
            uri: "gmail://accounts".into(),
            name: "accounts".into(),
            description: "Configured Gmail accounts".into(),
            mime_type: "text/plain".into(),
        }]
    }

    async fn read_resource(&self, uri: &str) -> Result<Value> {
        match uri {
            "gmail://accounts" => Ok(self.tool_list_accounts()),
            _ => Err(AdapterError::ResourceNotFound {
                adapter_id: self.id.clone(),
                uri: uri.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "google".into(),
            scopes: vec![GMAIL_SCOPE.into()],
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
