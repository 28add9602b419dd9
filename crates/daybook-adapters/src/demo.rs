//! Demo adapter -- a calculator tool and a greeting resource.
//!
//! Needs no credentials or network, which makes it the quickest way to
//! check that an agent host can talk to a `daybook serve` process.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{AdapterError, Result};
use crate::traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ResourceTemplate, ToolDefinition,
    match_template,
};

const GREETING_TEMPLATE: &str = "greeting://{name}";

/// Demo adapter.
pub struct DemoAdapter {
    id: String,
    connected: bool,
}

impl DemoAdapter {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connected: false,
        }
    }

    fn tool_add(&self, params: &Value) -> Result<Value> {
        let operand = |field: &str| {
            params
                .get(field)
                .and_then(Value::as_i64)
                .ok_or_else(|| AdapterError::InvalidParams {
                    tool_name: "add".into(),
                    reason: format!("missing required integer field `{field}`"),
                })
        };
        let (a, b) = (operand("a")?, operand("b")?);
        let sum = a.checked_add(b).ok_or_else(|| AdapterError::ExecutionFailed {
            tool_name: "add".into(),
            reason: format!("{a} + {b} overflows"),
        })?;
        Ok(json!(sum))
    }
}

#[async_trait]
impl Adapter for DemoAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn server_name(&self) -> &str {
        "Demo"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Utility
    }

    async fn connect(&mut self) -> Result<()> {
        info!(id = %self.id, "demo adapter connected");
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "demo adapter disconnected");
        self.connected = false;
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        Ok(if self.connected {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        })
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "add".into(),
            description: "Add two numbers".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "a": { "type": "integer" },
                    "b": { "type": "integer" }
                },
                "required": ["a", "b"]
            }),
        }]
    }

    async fn execute_tool(&self, name: &str, params: Value) -> Result<Value> {
        if !self.connected {
            return Err(AdapterError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: format!("adapter `{}` is not connected", self.id),
            });
        }

        match name {
            "add" => self.tool_add(&params),
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn resource_templates(&self) -> Vec<ResourceTemplate> {
        vec![ResourceTemplate {
            uri_template: GREETING_TEMPLATE.into(),
            name: "get_greeting".into(),
            description: "Get a personalized greeting".into(),
            mime_type: "text/plain".into(),
        }]
    }

    async fn read_resource(&self, uri: &str) -> Result<Value> {
        let name = match_template(GREETING_TEMPLATE, uri).and_then(|mut vars| vars.remove("name"));
        match name {
            Some(name) => Ok(Value::String(format!("Hello, {name}!"))),
            None => Err(AdapterError::ResourceNotFound {
                adapter_id: self.id.clone(),
                uri: uri.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        None
    }
}
