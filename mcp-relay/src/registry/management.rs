//! The five `server_*` management tools exposed to the upstream consumer.
//!
//! Their handlers are thin wrappers over the registry operations; every
//! failure is surfaced as a tool-error result, never as a transport error
//! on the upstream channel.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};

use mcp_relay_core::config::{duration_format, ServerConfig, Transport};
use mcp_relay_core::protocol::{CallToolResult, ToolInfo};

use super::{Registry, DYNAMIC_ADD_TIMEOUT};

/// Definitions of the management tools, in their fixed order.
pub fn management_tools() -> Vec<ToolInfo> {
    vec![
        ToolInfo {
            name: "server_add".to_string(),
            description: "Add a new MCP server to the proxy dynamically".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name/prefix for the server"
                    },
                    "command": {
                        "type": "string",
                        "description": "Command to run (e.g. 'npx -y @modelcontextprotocol/server-filesystem /path')"
                    },
                    "url": {
                        "type": "string",
                        "description": "Endpoint of an http server (not yet supported)"
                    },
                    "config": {
                        "type": "object",
                        "description": "Explicit server config: transport, command, args, env, timeout"
                    }
                },
                "required": ["name"]
            }),
        },
        ToolInfo {
            name: "server_remove".to_string(),
            description: "Remove an MCP server from the proxy".to_string(),
            input_schema: name_only_schema("Name of the server to remove"),
        },
        ToolInfo {
            name: "server_disconnect".to_string(),
            description: "Disconnect a server (tools remain but return errors)".to_string(),
            input_schema: name_only_schema("Name of the server to disconnect"),
        },
        ToolInfo {
            name: "server_reconnect".to_string(),
            description: "Reconnect a server with a new command (use after server_disconnect)"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name of the server to reconnect"
                    },
                    "command": {
                        "type": "string",
                        "description": "New command to run"
                    }
                },
                "required": ["name", "command"]
            }),
        },
        ToolInfo {
            name: "server_list".to_string(),
            description: "List all connected MCP servers".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
    ]
}

/// Whether a prefixed tool name is one of the management tools.
pub fn is_management_tool(name: &str) -> bool {
    matches!(
        name,
        "server_add" | "server_remove" | "server_disconnect" | "server_reconnect" | "server_list"
    )
}

/// Handle a management tool call; `None` when `name` is not a management
/// tool and should go through forwarding dispatch instead.
pub async fn call_management_tool(
    registry: &Registry,
    name: &str,
    arguments: &Value,
) -> Option<CallToolResult> {
    let result = match name {
        "server_add" => {
            let Some(server) = required_string(arguments, "name") else {
                return Some(CallToolResult::error("name is required"));
            };
            if let Some(config_value) = arguments.get("config") {
                match parse_add_config(server, config_value) {
                    Ok(config) => registry.add_server(config).await,
                    Err(reason) => return Some(CallToolResult::error(reason)),
                }
            } else if let Some(command) = required_string(arguments, "command") {
                registry.add_dynamic(server, command).await
            } else if arguments.get("url").is_some() {
                return Some(CallToolResult::error(
                    "transport 'http' is not supported; provide a command",
                ));
            } else {
                return Some(CallToolResult::error("command is required"));
            }
        }
        "server_remove" => {
            let Some(server) = required_string(arguments, "name") else {
                return Some(CallToolResult::error("name is required"));
            };
            registry.remove_server(server).await
        }
        "server_disconnect" => {
            let Some(server) = required_string(arguments, "name") else {
                return Some(CallToolResult::error("name is required"));
            };
            registry.disconnect_server(server).await
        }
        "server_reconnect" => {
            let Some(server) = required_string(arguments, "name") else {
                return Some(CallToolResult::error("name is required"));
            };
            let Some(command) = required_string(arguments, "command") else {
                return Some(CallToolResult::error("command is required"));
            };
            registry.reconnect_server(server, command).await
        }
        "server_list" => Ok(registry.format_list().await),
        _ => return None,
    };

    Some(match result {
        Ok(text) => CallToolResult::text(text),
        Err(e) => CallToolResult::error(e.to_string()),
    })
}

fn required_string<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

/// The `config` argument of `server_add`: a subset of the YAML server
/// entry, with the same duration-string timeout format.
#[derive(Debug, Deserialize)]
struct AddConfig {
    #[serde(default = "AddConfig::default_transport")]
    transport: Transport,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    timeout: Option<String>,
}

impl AddConfig {
    fn default_transport() -> Transport {
        Transport::Stdio
    }
}

fn parse_add_config(name: &str, value: &Value) -> Result<ServerConfig, String> {
    let parsed: AddConfig = serde_json::from_value(value.clone())
        .map_err(|e| format!("invalid config object: {e}"))?;

    if parsed.transport != Transport::Stdio {
        return Err(format!(
            "transport '{}' is not supported; provide a command",
            parsed.transport
        ));
    }
    let Some(command) = parsed.command.filter(|c| !c.is_empty()) else {
        return Err("config.command is required for stdio transport".to_string());
    };

    let timeout = match parsed.timeout.as_deref() {
        Some(text) => duration_format::parse_duration(text)?,
        None => DYNAMIC_ADD_TIMEOUT,
    };

    let mut config = ServerConfig::stdio(name, command, parsed.args, timeout);
    config.env = parsed.env;
    Ok(config)
}

fn name_only_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "description": description
            }
        },
        "required": ["name"]
    })
}
