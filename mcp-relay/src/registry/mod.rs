//! Dynamic tool registry and dispatcher.
//!
//! Owns every [`ServerEntry`] and the global prefixed-name binding table,
//! both behind one readers-writer lock. Management mutations serialize on
//! the write half; dispatch takes the read half only long enough to resolve
//! a binding to a client handle, then performs the downstream call with no
//! lock held. A concurrent `remove` can therefore tear a child down while a
//! call is in flight; the call surfaces a transport error that the
//! connection predicate maps back to a disconnect.

pub mod management;
mod types;

pub use types::{ServerEntry, ServerStatus, ToolBinding};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use mcp_relay_core::config::{ServerConfig, Transport};
use mcp_relay_core::error::{is_connection_error, RegistryError};
use mcp_relay_core::protocol::{CallToolResult, ToolInfo};

use crate::client::{McpClient, StdioClient};

/// Timeout applied to servers added at runtime, which carry no config.
pub const DYNAMIC_ADD_TIMEOUT: Duration = Duration::from_secs(10);

/// `last_error` text set by an operator-requested disconnect.
pub const DISCONNECTED_BY_USER: &str = "Server disconnected by user";

struct Inner {
    servers: HashMap<String, ServerEntry>,
    bindings: HashMap<String, ToolBinding>,
}

/// The shared, process-wide tool namespace.
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                servers: HashMap::new(),
                bindings: HashMap::new(),
            }),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Management operations
    // ─────────────────────────────────────────────────────────────────────

    /// Add a server at runtime from a whitespace-delimited command line.
    ///
    /// Name and prefix are identical for dynamically added servers.
    pub async fn add_dynamic(&self, name: &str, command_line: &str) -> Result<String, RegistryError> {
        let (program, args) = parse_command_line(command_line)?;
        let config = ServerConfig::stdio(name, program, args, DYNAMIC_ADD_TIMEOUT);
        self.add_server(config).await
    }

    /// Add a server from a (static or synthesized) configuration entry.
    ///
    /// Connects, initializes, and discovers tools before anything is
    /// persisted; a failure on that path closes the client and leaves the
    /// registry untouched.
    pub async fn add_server(&self, config: ServerConfig) -> Result<String, RegistryError> {
        {
            let inner = self.inner.read().await;
            if inner.servers.contains_key(&config.name) {
                return Err(RegistryError::DuplicateServer(config.name));
            }
        }

        let (client, tools) = self.connect_client(&config).await?;

        let mut inner = self.inner.write().await;
        if inner.servers.contains_key(&config.name) {
            // Lost a race against a concurrent add of the same name.
            drop(inner);
            let _ = client.close().await;
            return Err(RegistryError::DuplicateServer(config.name));
        }

        let mut registered = Vec::with_capacity(tools.len());
        for tool in &tools {
            let prefixed = format!("{}_{}", config.prefix, tool.name);
            inner.bindings.insert(
                prefixed.clone(),
                ToolBinding {
                    prefixed_name: prefixed.clone(),
                    server_name: config.name.clone(),
                    original_name: tool.name.clone(),
                    description: tool.description.clone(),
                    input_schema: tool.input_schema.clone(),
                },
            );
            tracing::info!(tool = %prefixed, server = %config.name, "registered tool");
            registered.push(prefixed);
        }

        let count = registered.len();
        let name = config.name.clone();
        inner.servers.insert(
            name.clone(),
            ServerEntry {
                name: name.clone(),
                prefix: config.prefix.clone(),
                config,
                client: Some(client),
                tools: registered,
                connected: true,
                last_error: None,
            },
        );

        tracing::info!(server = %name, tools = count, "added server");
        Ok(format!("Added server '{name}' with {count} tools"))
    }

    /// Remove a server and every binding it owns, then close its client.
    pub async fn remove_server(&self, name: &str) -> Result<String, RegistryError> {
        let (client, count) = {
            let mut inner = self.inner.write().await;
            let entry = inner
                .servers
                .remove(name)
                .ok_or_else(|| RegistryError::UnknownServer(name.to_string()))?;

            let mut count = 0;
            inner.bindings.retain(|_, binding| {
                if binding.server_name == name {
                    count += 1;
                    false
                } else {
                    true
                }
            });
            (entry.client, count)
        };

        if let Some(client) = client {
            if let Err(e) = client.close().await {
                tracing::warn!(server = %name, error = %e, "error closing client during remove");
            }
        }

        tracing::info!(server = %name, tools = count, "removed server");
        Ok(format!("Removed server '{name}' and {count} tools"))
    }

    /// Terminate a server's child process but keep its bindings registered.
    ///
    /// Dispatch through the retained bindings fails with a message pointing
    /// at `server_reconnect` until the entry is reconnected or removed.
    pub async fn disconnect_server(&self, name: &str) -> Result<String, RegistryError> {
        let client = {
            let mut inner = self.inner.write().await;
            let entry = inner
                .servers
                .get_mut(name)
                .ok_or_else(|| RegistryError::UnknownServer(name.to_string()))?;

            if !entry.connected {
                return Ok(format!("Server '{name}' is already disconnected"));
            }
            entry.connected = false;
            entry.last_error = Some(DISCONNECTED_BY_USER.to_string());
            entry.client.take()
        };

        if let Some(client) = client {
            tracing::info!(server = %name, "terminating process for disconnected server");
            if let Err(e) = client.close().await {
                tracing::warn!(server = %name, error = %e, "error closing client during disconnect");
            }
        }

        Ok(format!(
            "Disconnected server '{name}'. Tools remain registered but will return errors.\n\
             Use server_reconnect to restore connection."
        ))
    }

    /// Replace a disconnected server's process with a freshly spawned one.
    ///
    /// Bindings whose tool still exists on the new server get its schema;
    /// bindings whose tool vanished are retained and keep failing on
    /// dispatch until the operator removes the server.
    pub async fn reconnect_server(
        &self,
        name: &str,
        command_line: &str,
    ) -> Result<String, RegistryError> {
        let prefix = {
            let inner = self.inner.read().await;
            let entry = inner
                .servers
                .get(name)
                .ok_or_else(|| RegistryError::UnknownServer(name.to_string()))?;
            if entry.connected {
                return Err(RegistryError::StillConnected(name.to_string()));
            }
            entry.prefix.clone()
        };

        let (program, args) = parse_command_line(command_line)?;
        let mut config = ServerConfig::stdio(name, program, args, DYNAMIC_ADD_TIMEOUT);
        config.prefix = prefix;

        let outcome = self.connect_client(&config).await;

        let mut inner = self.inner.write().await;
        let Inner { servers, bindings } = &mut *inner;
        let entry = servers
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownServer(name.to_string()))?;

        match outcome {
            Err(e) => {
                entry.connected = false;
                entry.last_error = Some(e.to_string());
                entry.config = config;
                Err(e)
            }
            Ok((client, tools)) => {
                let mut updated = 0;
                for tool in &tools {
                    let prefixed = format!("{}_{}", entry.prefix, tool.name);
                    if entry.tools.contains(&prefixed) {
                        if let Some(binding) = bindings.get_mut(&prefixed) {
                            binding.description = tool.description.clone();
                            binding.input_schema = tool.input_schema.clone();
                            updated += 1;
                            tracing::info!(tool = %prefixed, "updated tool registration");
                        }
                    }
                }

                entry.client = Some(client);
                entry.config = config;
                entry.connected = true;
                entry.last_error = None;

                tracing::info!(server = %name, updated, "reconnected server");
                Ok(format!(
                    "Reconnected server '{name}'. {updated} tools updated."
                ))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Status snapshots, sorted by server name.
    pub async fn statuses(&self) -> Vec<ServerStatus> {
        let inner = self.inner.read().await;
        let mut statuses: Vec<ServerStatus> = inner
            .servers
            .values()
            .map(|entry| ServerStatus {
                name: entry.name.clone(),
                connected: entry.connected,
                last_error: entry.last_error.clone(),
                tool_count: entry.tools.len(),
                sample_tools: entry.tools.iter().take(3).cloned().collect(),
            })
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Human-readable listing backing the `server_list` tool.
    pub async fn format_list(&self) -> String {
        let statuses = self.statuses().await;

        let mut out = String::from("Connected MCP Servers:\n=====================\n\n");
        if statuses.is_empty() {
            out.push_str("No servers connected.\n");
        } else {
            for status in &statuses {
                let state = if status.connected {
                    "connected".to_string()
                } else {
                    match &status.last_error {
                        Some(reason) => format!("disconnected ({reason})"),
                        None => "disconnected".to_string(),
                    }
                };
                out.push_str(&format!(
                    "- {} [{}] - {} tools\n",
                    status.name, state, status.tool_count
                ));
                for tool in &status.sample_tools {
                    out.push_str(&format!("  \u{2022} {tool}\n"));
                }
                if status.tool_count > status.sample_tools.len() {
                    out.push_str(&format!(
                        "  \u{2022} ... and {} more\n",
                        status.tool_count - status.sample_tools.len()
                    ));
                }
            }
        }
        out.push_str(&format!("\nTotal servers: {}\n", statuses.len()));
        out
    }

    /// Every binding, grouped by server (name order) in registration order.
    pub async fn bindings_snapshot(&self) -> Vec<ToolBinding> {
        let inner = self.inner.read().await;
        let mut names: Vec<&String> = inner.servers.keys().collect();
        names.sort();

        let mut out = Vec::with_capacity(inner.bindings.len());
        for name in names {
            if let Some(entry) = inner.servers.get(name) {
                for prefixed in &entry.tools {
                    if let Some(binding) = inner.bindings.get(prefixed) {
                        out.push(binding.clone());
                    }
                }
            }
        }
        out
    }

    /// Owning server for a prefixed tool name, if bound.
    pub async fn server_for_tool(&self, prefixed_name: &str) -> Option<String> {
        let inner = self.inner.read().await;
        inner
            .bindings
            .get(prefixed_name)
            .map(|b| b.server_name.clone())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────

    /// Forward a `tools/call` on a prefixed name to the owning server.
    ///
    /// Every failure comes back as a tool-error result; the upstream channel
    /// never sees a transport error from dispatch.
    pub async fn call_tool(&self, prefixed_name: &str, arguments: serde_json::Value) -> CallToolResult {
        let (client, original_name, server_name) = {
            let inner = self.inner.read().await;
            let binding = match inner.bindings.get(prefixed_name) {
                Some(binding) => binding,
                None => {
                    return CallToolResult::error(format!("Tool '{prefixed_name}' not found"));
                }
            };
            let entry = match inner.servers.get(&binding.server_name) {
                Some(entry) => entry,
                None => {
                    return CallToolResult::error(format!(
                        "Server '{}' not found",
                        binding.server_name
                    ));
                }
            };

            match (&entry.client, entry.connected) {
                (Some(client), true) => (
                    Arc::clone(client),
                    binding.original_name.clone(),
                    binding.server_name.clone(),
                ),
                _ => return disconnected_result(&entry.name, entry.last_error.as_deref()),
            }
        };

        match client.call_tool(&original_name, arguments).await {
            Ok(result) => translate_result(result),
            Err(err) if is_connection_error(&err) => {
                let reason = err.to_string();
                self.mark_disconnected(&server_name, reason.clone()).await;
                tracing::warn!(server = %server_name, error = %reason, "connection failure on dispatch");
                CallToolResult::error(format!(
                    "Server '{server_name}' connection failed: {reason}\n\
                     Use server_reconnect to restore connection."
                ))
            }
            Err(err) => CallToolResult::error(format!("[{server_name}] {err}")),
        }
    }

    /// Close every client, best-effort. Entries stay in place; the process
    /// is exiting anyway.
    pub async fn shutdown_all(&self) {
        let clients: Vec<(String, Arc<dyn McpClient>)> = {
            let mut inner = self.inner.write().await;
            inner
                .servers
                .values_mut()
                .filter_map(|entry| {
                    entry.connected = false;
                    entry.client.take().map(|c| (entry.name.clone(), c))
                })
                .collect()
        };

        for (name, client) in clients {
            if let Err(e) = client.close().await {
                tracing::warn!(server = %name, error = %e, "error closing client at shutdown");
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    /// Spawn, handshake, and discover tools for a config entry.
    ///
    /// The client is closed on any failure after the spawn, so a caller that
    /// receives `Err` has nothing to clean up.
    async fn connect_client(
        &self,
        config: &ServerConfig,
    ) -> Result<(Arc<dyn McpClient>, Vec<ToolInfo>), RegistryError> {
        if config.transport != Transport::Stdio {
            return Err(RegistryError::UnsupportedTransport(
                config.transport.to_string(),
            ));
        }
        let command = config
            .command
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or(RegistryError::InvalidCommand)?;

        let client: Arc<dyn McpClient> = Arc::new(
            StdioClient::new(&config.name, command, config.args.clone())
                .with_env(config.env.clone())
                .with_timeout(config.request_timeout()),
        );

        client.connect().await.map_err(RegistryError::Connect)?;

        if let Err(e) = client.initialize().await {
            let _ = client.close().await;
            return Err(RegistryError::Initialize(e));
        }

        let tools = match client.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                let _ = client.close().await;
                return Err(RegistryError::ListTools(e));
            }
        };

        Ok((client, tools))
    }

    async fn mark_disconnected(&self, name: &str, reason: String) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.servers.get_mut(name) {
            entry.connected = false;
            entry.last_error = Some(reason);
        }
    }
}

/// Split a whitespace-delimited command line into program and arguments.
pub fn parse_command_line(command: &str) -> Result<(String, Vec<String>), RegistryError> {
    let mut parts = command.split_whitespace();
    let program = parts.next().ok_or(RegistryError::InvalidCommand)?;
    Ok((
        program.to_string(),
        parts.map(str::to_string).collect(),
    ))
}

fn disconnected_result(server: &str, last_error: Option<&str>) -> CallToolResult {
    let mut msg = format!("Server '{server}' is disconnected");
    if let Some(reason) = last_error {
        msg.push_str(&format!(": {reason}"));
    }
    msg.push_str("\nUse server_reconnect to restore connection.");
    CallToolResult::error(msg)
}

/// Map a downstream result into the upstream surface.
fn translate_result(result: CallToolResult) -> CallToolResult {
    if result.is_error {
        let text = result
            .content
            .first()
            .map(|item| item.text.clone())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "Tool execution failed".to_string());
        CallToolResult::error(text)
    } else if result.content.is_empty() {
        CallToolResult::text("Tool executed successfully")
    } else {
        CallToolResult::text(result.joined_text())
    }
}
