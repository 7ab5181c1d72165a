//! Registry records: server entries, tool bindings, and status snapshots.

use std::sync::Arc;

use mcp_relay_core::config::ServerConfig;

use crate::client::McpClient;

/// One downstream server known to the registry.
///
/// The registry is the sole mutator of `connected`/`last_error`; dispatch
/// reads them under the registry lock. `tools` keeps the prefixed names in
/// registration order so listings stay stable.
pub struct ServerEntry {
    pub name: String,
    pub prefix: String,
    pub config: ServerConfig,
    /// Shared handle to the live client; absent after disconnect.
    pub client: Option<Arc<dyn McpClient>>,
    pub tools: Vec<String>,
    pub connected: bool,
    pub last_error: Option<String>,
}

/// Links an externally visible prefixed tool name to its downstream origin.
///
/// Refers to the owning server by name, not by pointer, so removal never
/// has to chase references.
#[derive(Debug, Clone)]
pub struct ToolBinding {
    pub prefixed_name: String,
    pub server_name: String,
    pub original_name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Point-in-time view of one entry, as reported by `server_list`.
#[derive(Debug, Clone)]
pub struct ServerStatus {
    pub name: String,
    pub connected: bool,
    pub last_error: Option<String>,
    pub tool_count: usize,
    /// Up to three example tool names.
    pub sample_tools: Vec<String>,
}
