//! Google Calendar adapter -- the day's events across several calendars.
//!
//! Reads events from the primary calendar plus any shared calendars through
//! the Calendar v3 REST API.  Credentials come from a Google `token.json`
//! that is refreshed (or created through the consent flow) on connect.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use daybook_auth::{ConsentOptions, GoogleCredentials};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::error::{AdapterError, Result};
use crate::traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ResourceDefinition, ToolDefinition,
};

/// Default Calendar v3 API base URL.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Read-only calendar scope.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// The shared family calendar queried alongside `primary`.
pub const SHARED_CALENDAR_ID: &str = "lb284rombp29sb39dhbcvcn82c@group.calendar.google.com";

/// Number of events returned by `calendar://events`.
const UPCOMING_EVENT_COUNT: u32 = 10;

/// Shown for events that have no title.
const UNTITLED_EVENT: &str = "(No title)";

/// Settings for [`GoogleCalendarAdapter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Google OAuth client file.
    pub client_secrets: PathBuf,
    /// Persisted user token.
    pub token_file: PathBuf,
    /// Calendars queried by `get_my_day`, in output order.
    pub calendar_ids: Vec<String>,
    /// API base URL.
    pub api_base: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            client_secrets: PathBuf::from("credentials.json"),
            token_file: PathBuf::from("token.json"),
            calendar_ids: vec!["primary".to_string(), SHARED_CALENDAR_ID.to_string()],
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Google Calendar adapter.
pub struct GoogleCalendarAdapter {
    /// Unique identifier for this adapter instance.
    id: String,
    /// Whether the adapter has been connected.
    connected: bool,
    /// Calendars queried by `get_my_day`.
    calendar_ids: Vec<String>,
    /// Self-refreshing Google credentials.
    credentials: GoogleCredentials,
    /// Calendar v3 API client.
    api: ApiClient,
}

impl GoogleCalendarAdapter {
    /// Create a calendar adapter from its settings.
    pub fn new(id: impl Into<String>, config: CalendarConfig) -> Self {
        let credentials = GoogleCredentials::new(
            config.token_file,
            config.client_secrets,
            vec![CALENDAR_SCOPE.to_string()],
        );
        Self {
            id: id.into(),
            connected: false,
            calendar_ids: config.calendar_ids,
            credentials,
            api: ApiClient::new(&config.api_base),
        }
    }

    /// Override how the interactive consent flow runs.
    pub fn with_consent_options(mut self, consent: ConsentOptions) -> Self {
        self.credentials = self.credentials.with_consent_options(consent);
        self
    }

    /// The credentials this adapter authenticates with.
    pub fn credentials(&self) -> &GoogleCredentials {
        &self.credentials
    }

    // -----------------------------------------------------------------------
    // API helpers
    // -----------------------------------------------------------------------

    /// List events of one calendar with the given query.
    async fn list_events(
        &self,
        calendar_id: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<Vec<Value>, ApiError> {
        let url = self.api.endpoint(&["calendars", calendar_id, "events"])?;
        let body = self.api.get(url, query, &self.credentials).await?;
        Ok(items(body))
    }

    // -----------------------------------------------------------------------
    // Tool implementations
    // -----------------------------------------------------------------------

    /// Events for one day from every configured calendar.
    async fn tool_get_my_day(&self, params: Value) -> Result<Value> {
        let day = params
            .get("day")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AdapterError::InvalidParams {
                tool_name: "get_my_day".into(),
                reason: "missing required string field `day`".into(),
            })?;
        let start = parse_day(day).ok_or_else(|| AdapterError::InvalidParams {
            tool_name: "get_my_day".into(),
            reason: format!("`{day}` is not a YYYY-MM-DD date"),
        })?;
        let end = start + Duration::days(1);

        let query = [
            ("timeMin", format_utc(start)),
            ("timeMax", format_utc(end)),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];

        let mut events = Vec::new();
        for calendar_id in &self.calendar_ids {
            debug!(calendar = %calendar_id, day = %day, "fetching events");
            match self.list_events(calendar_id, &query).await {
                Ok(items) => events.extend(items),
                Err(e) => return Ok(Value::String(format!("Error fetching events: {e}"))),
            }
        }

        if events.is_empty() {
            return Ok(Value::String("No events found for today.".into()));
        }
        Ok(Value::String(format_events(&events)))
    }

    // -----------------------------------------------------------------------
    // Resource implementations
    // -----------------------------------------------------------------------

    async fn resource_calendars(&self) -> Result<Value> {
        let url = self
            .api
            .endpoint(&["users", "me", "calendarList"])
            .map_err(|e| self.fetch_failed("calendar://calendars", e))?;
        let body = self
            .api
            .get(url, &[], &self.credentials)
            .await
            .map_err(|e| self.fetch_failed("calendar://calendars", e))?;

        let calendars = items(body);
        if calendars.is_empty() {
            return Ok(Value::String("No calendars found.".into()));
        }

        let mut out = String::new();
        for calendar in &calendars {
            let summary = calendar.get("summary").and_then(Value::as_str).unwrap_or("");
            let id = calendar.get("id").and_then(Value::as_str).unwrap_or("");
            out.push_str(&format!("{summary}: {id}\n"));
        }
        Ok(Value::String(out))
    }

    async fn resource_upcoming_events(&self) -> Result<Value> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let query = [
            ("timeMin", now),
            ("maxResults", UPCOMING_EVENT_COUNT.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        let events = self
            .list_events("primary", &query)
            .await
            .map_err(|e| self.fetch_failed("calendar://events", e))?;

        if events.is_empty() {
            return Ok(Value::String("No upcoming events found.".into()));
        }
        Ok(Value::String(format_events(&events)))
    }

    fn fetch_failed(&self, uri: &str, e: ApiError) -> AdapterError {
        AdapterError::ExecutionFailed {
            tool_name: uri.to_string(),
            reason: e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Parse `YYYY-MM-DD` (midnight) or a full ISO date-time.
fn parse_day(day: &str) -> Option<NaiveDateTime> {
    let day = day.trim();
    if let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    day.parse::<NaiveDateTime>().ok()
}

fn format_utc(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Take the `items` array out of a list response.
fn items(body: Value) -> Vec<Value> {
    match body {
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// One `"{start} {summary}"` line per event.  Timed events use
/// `start.dateTime`, all-day events `start.date`.
fn format_events(events: &[Value]) -> String {
    let mut out = String::new();
    for event in events {
        let start = event
            .pointer("/start/dateTime")
            .or_else(|| event.pointer("/start/date"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let summary = event
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or(UNTITLED_EVENT);
        out.push_str(&format!("{start} {summary}\n"));
    }
    out
}

// ---------------------------------------------------------------------------
// Tool definitions
// ---------------------------------------------------------------------------

fn build_tool_definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: "get_my_day".into(),
        description: "Get events for a specific day from primary and shared calendars.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "day": {
                    "type": "string",
                    "description": "The day to get events for in YYYY-MM-DD format"
                }
            },
            "required": ["day"]
        }),
    }]
}

fn build_resource_definitions() -> Vec<ResourceDefinition> {
    vec![
        ResourceDefinition {
            uri: "calendar://calendars".into(),
            name: "get_calendars".into(),
            description: "Get list of calendars".into(),
            mime_type: "text/plain".into(),
        },
        ResourceDefinition {
            uri: "calendar://events".into(),
            name: "ten_events".into(),
            description: "Get next ten upcoming events from primary calendar".into(),
            mime_type: "text/plain".into(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Adapter trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for GoogleCalendarAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn server_name(&self) -> &str {
        "google-calendar"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Productivity
    }

    async fn connect(&mut self) -> Result<()> {
        let status = self
            .credentials
            .ensure_valid()
            .await
            .map_err(|source| AdapterError::AuthFailed {
                adapter_id: self.id.clone(),
                source,
            })?;
        info!(
            id = %self.id,
            credentials = %status,
            calendars = self.calendar_ids.len(),
            "calendar adapter connected"
        );
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "calendar adapter disconnected");
        self.connected = false;
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        if !self.connected {
            return Ok(HealthStatus::Unhealthy);
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
            "get_my_day" => self.tool_get_my_day(params).await,
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn resources(&self) -> Vec<ResourceDefinition> {
        build_resource_definitions()
    }

    async fn read_resource(&self, uri: &str) -> Result<Value> {
        if !self.connected {
            return Err(AdapterError::ExecutionFailed {
                tool_name: uri.to_string(),
                reason: format!("adapter `{}` is not connected", self.id),
            });
        }

        match uri {
            "calendar://calendars" => self.resource_calendars().await,
            "calendar://events" => self.resource_upcoming_events().await,
            _ => Err(AdapterError::ResourceNotFound {
                adapter_id: self.id.clone(),
                uri: uri.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "google".into(),
            scopes: vec![CALENDAR_SCOPE.into()],
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
