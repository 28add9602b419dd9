//! Core adapter trait and supporting types.
//!
//! Every adapter (calendar, gmail, league, oura, demo) implements the
//! [`Adapter`] trait, which is everything the protocol layer needs to list
//! and invoke its tools and resources.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// The category of service an adapter provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterType {
    /// Calendars and schedules.
    Productivity,
    /// Email.
    Messaging,
    /// Live telemetry from a local application.
    Telemetry,
    /// Health and wearable data.
    Health,
    /// Local helpers with no backing service.
    Utility,
}

impl std::fmt::Display for AdapterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Productivity => write!(f, "productivity"),
            Self::Messaging => write!(f, "messaging"),
            Self::Telemetry => write!(f, "telemetry"),
            Self::Health => write!(f, "health"),
            Self::Utility => write!(f, "utility"),
        }
    }
}

/// The health status of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The adapter is fully operational.
    Healthy,
    /// The adapter is working but with reduced capability.
    Degraded,
    /// The adapter is not functional.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// A tool exposed by an adapter that the agent can invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Machine-readable tool name (e.g. `get_my_day`).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    pub parameters: serde_json::Value,
}

/// A fixed resource with a concrete URI (e.g. `calendar://events`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// A parameterised resource (e.g. `greeting://{name}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplate {
    pub uri_template: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// Authentication requirements for an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequirement {
    /// The credential provider name (e.g. `google`, `oura`).
    pub provider: String,
    /// The scopes or permissions required.
    pub scopes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Core trait
// ---------------------------------------------------------------------------

/// The universal adapter interface.
///
/// The protocol layer discovers tools via [`Adapter::tools`] and runs them
/// via [`Adapter::execute_tool`]; resources work the same way through
/// [`Adapter::resources`], [`Adapter::resource_templates`] and
/// [`Adapter::read_resource`].
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Return the unique identifier for this adapter instance.
    fn id(&self) -> &str;

    /// The name the adapter announces to the agent host.
    fn server_name(&self) -> &str;

    /// Return the category of service this adapter provides.
    fn adapter_type(&self) -> AdapterType;

    /// Acquire credentials and get ready to serve calls.
    async fn connect(&mut self) -> Result<()>;

    /// Gracefully disconnect from the backing service.
    async fn disconnect(&mut self) -> Result<()>;

    /// Check whether the adapter is healthy and operational.
    async fn health_check(&self) -> Result<HealthStatus>;

    /// Return the list of tools this adapter exposes.
    fn tools(&self) -> Vec<ToolDefinition>;

    /// Execute a named tool with the given JSON parameters.
    ///
    /// A string result is shown to the agent verbatim; any other JSON value
    /// is pretty-printed.
    async fn execute_tool(
        &self,
        name: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value>;

    /// Fixed resources this adapter exposes.
    fn resources(&self) -> Vec<ResourceDefinition> {
        Vec::new()
    }

    /// Parameterised resources this adapter exposes.
    fn resource_templates(&self) -> Vec<ResourceTemplate> {
        Vec::new()
    }

    /// Read a resource by URI.
    async fn read_resource(&self, uri: &str) -> Result<serde_json::Value>;

    /// Return the authentication requirements for this adapter, if any.
    fn required_auth(&self) -> Option<AuthRequirement>;
}

// ---------------------------------------------------------------------------
// URI templates
// ---------------------------------------------------------------------------

/// Match `uri` against a simple `{var}` template and return the captured
/// variables.  Variables match up to the next literal (or the end of the
/// URI) and must be non-empty.
///
/// ```
/// use daybook_adapters::traits::match_template;
///
/// let vars = match_template("greeting://{name}", "greeting://bob").unwrap();
/// assert_eq!(vars["name"], "bob");
/// ```
pub fn match_template(template: &str, uri: &str) -> Option<HashMap<String, String>> {
    let mut vars = HashMap::new();
    let mut rest_template = template;
    let mut rest_uri = uri;

    while !rest_template.is_empty() {
        match rest_template.find('{') {
            Some(0) => {
                let close = rest_template.find('}')?;
                let name = &rest_template[1..close];
                rest_template = &rest_template[close + 1..];

                let literal_end = rest_template.find('{').unwrap_or(rest_template.len());
                let next_literal = &rest_template[..literal_end];
                let value_end = if next_literal.is_empty() {
                    rest_uri.len()
                } else {
                    rest_uri.find(next_literal)?
                };
                let value = &rest_uri[..value_end];
                if value.is_empty() {
                    return None;
                }
                vars.insert(name.to_string(), value.to_string());
                rest_uri = &rest_uri[value_end..];
            }
            Some(open) => {
                let literal = &rest_template[..open];
                rest_uri = rest_uri.strip_prefix(literal)?;
                rest_template = &rest_template[open..];
            }
            None => {
                rest_uri = rest_uri.strip_prefix(rest_template)?;
                rest_template = "";
            }
        }
    }

    rest_uri.is_empty().then_some(vars)
}
