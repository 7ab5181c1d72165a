//! MCP method names and payload types exchanged with downstream servers.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// MCP protocol revision spoken on the downstream side.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Client identity sent in the `initialize` handshake. Stable per build.
pub const CLIENT_NAME: &str = "dynamic-mcp-proxy";
pub const CLIENT_VERSION: &str = "1.0.0";

/// JSON-RPC method names.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const PING: &str = "ping";
}

/// Build the `initialize` params object.
pub fn initialize_params() -> serde_json::Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": CLIENT_VERSION,
        },
    })
}

/// Result of the `initialize` handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: serde_json::Value,
    #[serde(rename = "serverInfo", default)]
    pub server_info: ServerInfo,
}

/// Identity advertised by a downstream server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// A tool advertised by a server. Snapshot taken at registration; the
/// schema is carried opaquely and never validated by the proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: serde_json::Value,
}

/// Result payload of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListResult {
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
}

/// Result of a `tools/call` invocation.
///
/// `is_error = true` means the tool itself failed; that is a payload
/// property, not a transport failure, and is forwarded as such.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// A successful single-text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: false,
        }
    }

    /// A failed single-text result.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: true,
        }
    }

    /// Flatten the content into display text.
    ///
    /// Text items are joined with newlines; other content types contribute a
    /// stable placeholder so their presence is visible to the consumer.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|item| {
                if item.kind == "text" {
                    item.text.clone()
                } else {
                    format!("[{} content]", item.kind)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One element of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}
