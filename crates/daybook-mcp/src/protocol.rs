//! JSON-RPC 2.0 and MCP message types.
//!
//! The MCP specification version targeted is `2024-11-05`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use daybook_adapters::{ResourceDefinition, ResourceTemplate, ToolDefinition};

/// The MCP protocol version this server implements.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

// Standard JSON-RPC error codes.
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

// ---------------------------------------------------------------------------
// JSON-RPC types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be `"2.0"`.
    pub jsonrpc: String,
    /// Request identifier.  Absent for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// The method to invoke.
    pub method: String,
    /// Method parameters (defaults to `null` if absent).
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    /// Notifications carry no id and never get a response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Echoed from the request; `null` when the request could not be read.
    pub id: Option<Value>,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code (negative numbers are reserved by JSON-RPC).
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Construct a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Construct an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MCP tool types
// ---------------------------------------------------------------------------

/// An MCP tool definition returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl From<ToolDefinition> for McpToolDefinition {
    fn from(tool: ToolDefinition) -> Self {
        Self {
            name: tool.name,
            description: tool.description,
            input_schema: tool.parameters,
        }
    }
}

/// The result of an MCP `tools/call` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolResult {
    /// The content blocks returned by the tool.
    pub content: Vec<McpContent>,
    /// Whether the tool call resulted in an error.
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// A single content block within an MCP tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpContent {
    /// The content type (always `"text"` here).
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl McpContent {
    /// Create a text content block.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            content_type: "text".into(),
            text: value.into(),
        }
    }
}

impl McpToolResult {
    /// Create a successful tool result with a single text block.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::text(text)],
            is_error: None,
        }
    }

    /// Create an error tool result with a single text block.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::text(text)],
            is_error: Some(true),
        }
    }
}

// ---------------------------------------------------------------------------
// MCP resource types
// ---------------------------------------------------------------------------

/// A fixed resource returned by `resources/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResource {
    pub uri: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl From<ResourceDefinition> for McpResource {
    fn from(resource: ResourceDefinition) -> Self {
        Self {
            uri: resource.uri,
            name: resource.name,
            description: resource.description,
            mime_type: resource.mime_type,
        }
    }
}

/// A parameterised resource returned by `resources/templates/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResourceTemplate {
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl From<ResourceTemplate> for McpResourceTemplate {
    fn from(template: ResourceTemplate) -> Self {
        Self {
            uri_template: template.uri_template,
            name: template.name,
            description: template.description,
            mime_type: template.mime_type,
        }
    }
}

/// One entry of a `resources/read` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResourceContents {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub text: String,
}

/// Render an adapter result as text: strings verbatim, anything else as
/// pretty-printed JSON.
pub fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- JsonRpcRequest parsing --

    #[test]
    fn request_parsing() {
        let req: JsonRpcRequest = serde_json::from_str(
            r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize",
                "params": {"protocolVersion": "2024-11-05"}}"#,
        )
        .unwrap();
        assert_eq!(req.id, Some(json!(1)));
        assert_eq!(req.method, "initialize");
        assert!(req.params.is_object());
        assert!(!req.is_notification());
    }

    #[test]
    fn request_without_id_or_params_is_notification() {
        let req: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#)
                .unwrap();
        assert!(req.params.is_null());
        assert!(req.is_notification());
    }

    // -- JsonRpcResponse serialization --

    #[test]
    fn success_response_omits_error() {
        let resp = JsonRpcResponse::success(Some(json!("a")), json!({"key": "value"}));
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["id"], "a");
        assert_eq!(v["result"]["key"], "value");
        assert!(v.get("error").is_none());
    }

    #[test]
    fn error_response_keeps_null_id() {
        let resp = JsonRpcResponse::error(None, PARSE_ERROR, "bad json");
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["id"], Value::Null);
        assert!(v.get("result").is_none());
        assert_eq!(v["error"]["code"], PARSE_ERROR);
        assert_eq!(v["error"]["message"], "bad json");
        assert!(v["error"].get("data").is_none());
    }

    // -- MCP types --

    #[test]
    fn tool_definition_uses_input_schema() {
        let tool = McpToolDefinition::from(ToolDefinition {
            name: "add".into(),
            description: "Add two numbers".into(),
            parameters: json!({"type": "object"}),
        });
        let v = serde_json::to_value(&tool).unwrap();
        assert_eq!(v["inputSchema"]["type"], "object");
        assert!(v.get("parameters").is_none());
    }

    #[test]
    fn tool_result_error_flag() {
        let ok = serde_json::to_value(McpToolResult::success("fine")).unwrap();
        assert!(ok.get("isError").is_none());
        assert_eq!(ok["content"][0], json!({"type": "text", "text": "fine"}));

        let err = serde_json::to_value(McpToolResult::error("boom")).unwrap();
        assert_eq!(err["isError"], true);
    }

    #[test]
    fn resource_types_use_camel_case() {
        let template = McpResourceTemplate::from(ResourceTemplate {
            uri_template: "greeting://{name}".into(),
            name: "get_greeting".into(),
            description: "Get a personalized greeting".into(),
            mime_type: "text/plain".into(),
        });
        let v = serde_json::to_value(&template).unwrap();
        assert_eq!(v["uriTemplate"], "greeting://{name}");
        assert_eq!(v["mimeType"], "text/plain");
    }

    #[test]
    fn value_to_text_keeps_strings_verbatim() {
        assert_eq!(value_to_text(json!("line\n")), "line\n");
        assert_eq!(value_to_text(json!(42)), "42");
        assert_eq!(value_to_text(json!({"a": 1})), "{\n  \"a\": 1\n}");
    }
}
