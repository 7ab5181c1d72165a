//! Client engine for talking to downstream MCP servers.
//!
//! [`McpClient`] is the transport seam: the registry only sees this trait.
//! [`StdioClient`] is the one real implementation, owning a child process
//! and speaking newline-delimited JSON-RPC over its pipes. An http
//! transport would slot in behind the same trait.

mod id;
mod stdio;

pub use id::RequestIdGenerator;
pub use stdio::StdioClient;

use async_trait::async_trait;

use mcp_relay_core::error::ClientError;
use mcp_relay_core::protocol::{CallToolResult, InitializeResult, ToolInfo};

/// A client connection to one MCP server.
///
/// Implementations serialize their own requests: only one request is in
/// flight per client at a time, and callers observe responses in call order.
#[async_trait]
pub trait McpClient: Send + Sync {
    /// Establish the connection (for stdio: spawn the child process).
    async fn connect(&self) -> Result<(), ClientError>;

    /// Perform the MCP `initialize` handshake.
    async fn initialize(&self) -> Result<InitializeResult, ClientError>;

    /// Discover the tools the server advertises.
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, ClientError>;

    /// Invoke a tool by its original (unprefixed) name.
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, ClientError>;

    /// Tear down the connection. Terminal; the client cannot be reused.
    async fn close(&self) -> Result<(), ClientError>;

    /// The configured name of the server this client talks to.
    fn server_name(&self) -> &str;

    /// Whether the client currently holds a live connection.
    async fn is_connected(&self) -> bool;
}
