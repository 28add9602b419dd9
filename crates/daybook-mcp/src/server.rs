//! MCP request dispatch over a single adapter.
//!
//! [`McpServer`] answers `initialize`, `ping`, the `tools/*` and the
//! `resources/*` methods by delegating to one connected [`Adapter`].  It is
//! transport agnostic: [`McpServer::handle_message`] takes one raw JSON
//! message (a request, a notification or a batch) and returns the raw reply,
//! if any.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};

use daybook_adapters::{Adapter, AdapterError, match_template};

use crate::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JsonRpcRequest, JsonRpcResponse,
    MCP_PROTOCOL_VERSION, METHOD_NOT_FOUND, McpResource, McpResourceContents, McpResourceTemplate,
    McpToolDefinition, McpToolResult, PARSE_ERROR, value_to_text,
};

/// The server version reported during initialization.
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP protocol server that exposes one adapter's tools and resources.
pub struct McpServer {
    adapter: Arc<dyn Adapter>,
}

impl McpServer {
    /// Create a new MCP server backed by the given adapter.
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self { adapter }
    }

    /// Handle one raw message.  Returns the serialized reply, or `None`
    /// when nothing should be sent back (notifications only).
    pub async fn handle_message(&self, message: &str) -> Option<String> {
        let parsed: Value = match serde_json::from_str(message) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparsable MCP message");
                return to_line(&JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("failed to parse JSON-RPC request: {e}"),
                ));
            }
        };

        match parsed {
            Value::Array(batch) => {
                if batch.is_empty() {
                    return to_line(&JsonRpcResponse::error(
                        None,
                        INVALID_REQUEST,
                        "empty batch request",
                    ));
                }
                let mut responses = Vec::with_capacity(batch.len());
                for item in batch {
                    if let Some(response) = self.handle_value(item).await {
                        responses.push(response);
                    }
                }
                if responses.is_empty() {
                    None
                } else {
                    to_line(&responses)
                }
            }
            single => {
                let response = self.handle_value(single).await?;
                to_line(&response)
            }
        }
    }

    /// Decode one request object and dispatch it.
    async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let id = value.get("id").cloned().filter(|id| !id.is_null());
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("invalid JSON-RPC request: {e}"),
            )),
        }
    }

    /// Handle a single JSON-RPC request.  Notifications are processed but
    /// produce no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        tracing::debug!(method = %request.method, "MCP request received");

        if request.is_notification() {
            if !request.method.starts_with("notifications/") {
                tracing::debug!(method = %request.method, "ignoring request without id");
            }
            return None;
        }

        let id = request.id;
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            "resources/list" => self.handle_resources_list(id),
            "resources/templates/list" => self.handle_templates_list(id),
            "resources/read" => self.handle_resources_read(id, request.params).await,
            other => {
                tracing::warn!(method = %other, "unknown MCP method");
                JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("method not found: {other}"))
            }
        };
        Some(response)
    }

    /// Handle the `initialize` handshake.
    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        tracing::info!(server = %self.adapter.server_name(), "MCP session initialized");
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {},
                    "resources": {}
                },
                "serverInfo": {
                    "name": self.adapter.server_name(),
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<McpToolDefinition> = self
            .adapter
            .tools()
            .into_iter()
            .map(McpToolDefinition::from)
            .collect();
        result_response(id, "tools", &tools)
    }

    /// Handle `tools/call`.  Adapter failures become `isError` results so
    /// the agent sees the message.
    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                "missing required field `name` in params",
            );
        };

        let arguments = params
            .get("arguments")
            .cloned()
            .filter(|a| !a.is_null())
            .unwrap_or_else(|| json!({}));

        let result = match self.adapter.execute_tool(name, arguments).await {
            Ok(value) => McpToolResult::success(value_to_text(value)),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool call failed");
                McpToolResult::error(format!("tool execution failed: {e}"))
            }
        };
        match serde_json::to_value(&result) {
            Ok(v) => JsonRpcResponse::success(id, v),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize tool result");
                JsonRpcResponse::error(id, INTERNAL_ERROR, "failed to serialize tool result")
            }
        }
    }

    fn handle_resources_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let resources: Vec<McpResource> = self
            .adapter
            .resources()
            .into_iter()
            .map(McpResource::from)
            .collect();
        result_response(id, "resources", &resources)
    }

    fn handle_templates_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let templates: Vec<McpResourceTemplate> = self
            .adapter
            .resource_templates()
            .into_iter()
            .map(McpResourceTemplate::from)
            .collect();
        result_response(id, "resourceTemplates", &templates)
    }

    async fn handle_resources_read(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let Some(uri) = params.get("uri").and_then(|v| v.as_str()) else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                "missing required field `uri` in params",
            );
        };

        match self.adapter.read_resource(uri).await {
            Ok(value) => {
                let contents = McpResourceContents {
                    uri: uri.to_string(),
                    mime_type: self.mime_type_for(uri),
                    text: value_to_text(value),
                };
                result_response(id, "contents", &[contents])
            }
            Err(AdapterError::ResourceNotFound { uri, .. }) => {
                JsonRpcResponse::error(id, INVALID_PARAMS, format!("unknown resource: {uri}"))
            }
            Err(e) => {
                tracing::warn!(uri = %uri, error = %e, "resource read failed");
                JsonRpcResponse::error(id, INTERNAL_ERROR, format!("resource read failed: {e}"))
            }
        }
    }

    /// The MIME type advertised for `uri`, falling back to plain text.
    fn mime_type_for(&self, uri: &str) -> String {
        self.adapter
            .resources()
            .into_iter()
            .find(|r| r.uri == uri)
            .map(|r| r.mime_type)
            .or_else(|| {
                self.adapter
                    .resource_templates()
                    .into_iter()
                    .find(|t| match_template(&t.uri_template, uri).is_some())
                    .map(|t| t.mime_type)
            })
            .unwrap_or_else(|| "text/plain".to_string())
    }
}

/// Wrap a serializable list as `{ key: [...] }`.
fn result_response<T: Serialize>(id: Option<Value>, key: &str, items: &[T]) -> JsonRpcResponse {
    match serde_json::to_value(items) {
        Ok(v) => {
            let mut result = serde_json::Map::new();
            result.insert(key.to_string(), v);
            JsonRpcResponse::success(id, Value::Object(result))
        }
        Err(e) => {
            tracing::error!(error = %e, key = %key, "failed to serialize result");
            JsonRpcResponse::error(id, INTERNAL_ERROR, format!("failed to serialize {key}"))
        }
    }
}

fn to_line<T: Serialize + ?Sized>(reply: &T) -> Option<String> {
    match serde_json::to_string(reply) {
        Ok(line) => Some(line),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize MCP reply");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
