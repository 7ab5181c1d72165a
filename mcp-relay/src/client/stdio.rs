//! Stdio transport client: one child process, newline-delimited JSON-RPC.
//!
//! Lifecycle is `Fresh -> Connected -> Initialized -> Closed`. `Closed` is
//! terminal; every operation afterwards fails with `NotConnected`.
//!
//! Each request writes one frame to the child's stdin, then hands the shared
//! stdout reader to a short-lived task that reads exactly one line. The
//! caller waits on that task's channel under the per-request deadline. On
//! timeout the task is left to finish on its own; it still holds the reader
//! lock, so a late line is consumed and discarded rather than corrupting the
//! next request's framing.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};

use async_trait::async_trait;
use serde_json::json;

use mcp_relay_core::error::ClientError;
use mcp_relay_core::jsonrpc::{decode_response, encode_frame, RequestEnvelope, ResponseEnvelope};
use mcp_relay_core::protocol::{
    initialize_params, methods, CallToolResult, InitializeResult, ToolInfo, ToolListResult,
};

use super::id::RequestIdGenerator;
use super::McpClient;

/// Default per-request deadline when the builder does not tighten it.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fresh,
    Connected,
    Initialized,
    Closed,
}

struct Conn {
    child: Child,
    stdin: ChildStdin,
    reader: Arc<Mutex<BufReader<ChildStdout>>>,
}

struct ClientState {
    phase: Phase,
    conn: Option<Conn>,
}

/// MCP client over a spawned child process.
///
/// The state mutex serializes `connect`/`close` transitions and keeps at
/// most one request in flight; concurrent callers queue on it.
pub struct StdioClient {
    server_name: String,
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    timeout: Duration,
    ids: RequestIdGenerator,
    state: Mutex<ClientState>,
}

impl StdioClient {
    pub fn new(
        server_name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            command: command.into(),
            args,
            env: HashMap::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            ids: RequestIdGenerator::new(),
            state: Mutex::new(ClientState {
                phase: Phase::Fresh,
                conn: None,
            }),
        }
    }

    /// Extra environment variables for the child process.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Write one request frame and read the single matching response line.
    ///
    /// Must be called with the state lock held (the `&mut Conn` proves it);
    /// that is what serializes requests on this client.
    async fn request(
        &self,
        conn: &mut Conn,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<ResponseEnvelope, ClientError> {
        let id = self.ids.next_id();
        let request = RequestEnvelope::new(id, method, params);
        let frame = encode_frame(&request)?;

        conn.stdin
            .write_all(frame.as_bytes())
            .await
            .map_err(ClientError::TransportWrite)?;
        conn.stdin
            .flush()
            .await
            .map_err(ClientError::TransportWrite)?;

        // One reader task per request. If the deadline fires first, the task
        // keeps the reader lock until its line arrives, and the line is
        // dropped with the task's channel.
        let reader = Arc::clone(&conn.reader);
        let (tx, rx) = oneshot::channel::<Result<String, ClientError>>();
        tokio::spawn(async move {
            let mut guard = reader.lock().await;
            let mut line = String::new();
            let outcome = match guard.read_line(&mut line).await {
                Ok(0) => Err(ClientError::TransportRead(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed stdout (eof)",
                ))),
                Ok(_) => Ok(line),
                Err(e) => Err(ClientError::TransportRead(e)),
            };
            let _ = tx.send(outcome);
        });

        let line = match tokio::time::timeout(self.timeout, rx).await {
            Err(_) => return Err(ClientError::Timeout(self.timeout)),
            // Sender dropped without a value: the reader task went away
            // under us, which only happens on teardown.
            Ok(Err(_)) => return Err(ClientError::Cancelled),
            Ok(Ok(Err(e))) => return Err(e),
            Ok(Ok(Ok(line))) => line,
        };

        let response = decode_response(&line)?;
        if response.id != id {
            return Err(ClientError::IdMismatch {
                expected: id,
                got: response.id,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl McpClient for StdioClient {
    async fn connect(&self) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        match state.phase {
            Phase::Connected | Phase::Initialized => return Ok(()),
            Phase::Closed => return Err(ClientError::NotConnected),
            Phase::Fresh => {}
        }

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true);
        if !self.env.is_empty() {
            cmd.envs(&self.env);
        }

        let mut child = cmd.spawn().map_err(|e| ClientError::Spawn {
            reason: e.to_string(),
        })?;

        let stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => {
                let _ = child.start_kill();
                return Err(ClientError::Spawn {
                    reason: "failed to capture server stdin".to_string(),
                });
            }
        };
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.start_kill();
                return Err(ClientError::Spawn {
                    reason: "failed to capture server stdout".to_string(),
                });
            }
        };

        tracing::info!(
            server = %self.server_name,
            command = %self.command,
            "server process spawned"
        );

        state.conn = Some(Conn {
            child,
            stdin,
            reader: Arc::new(Mutex::new(BufReader::new(stdout))),
        });
        state.phase = Phase::Connected;
        Ok(())
    }

    async fn initialize(&self) -> Result<InitializeResult, ClientError> {
        let mut state = self.state.lock().await;
        let conn = state.conn.as_mut().ok_or(ClientError::NotConnected)?;

        let response = self
            .request(conn, methods::INITIALIZE, Some(initialize_params()))
            .await?;
        let result: InitializeResult =
            serde_json::from_value(response.into_result()?).map_err(|e| ClientError::Frame {
                reason: format!("malformed initialize result: {e}"),
            })?;

        tracing::debug!(
            server = %self.server_name,
            remote = %result.server_info.name,
            protocol = %result.protocol_version,
            "initialize handshake complete"
        );
        state.phase = Phase::Initialized;
        Ok(result)
    }

    async fn list_tools(&self) -> Result<Vec<ToolInfo>, ClientError> {
        let mut state = self.state.lock().await;
        let conn = state.conn.as_mut().ok_or(ClientError::NotConnected)?;

        let response = self.request(conn, methods::TOOLS_LIST, None).await?;
        let result: ToolListResult =
            serde_json::from_value(response.into_result()?).map_err(|e| ClientError::Frame {
                reason: format!("malformed tools/list result: {e}"),
            })?;
        Ok(result.tools)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, ClientError> {
        let mut state = self.state.lock().await;
        let conn = state.conn.as_mut().ok_or(ClientError::NotConnected)?;

        let params = json!({ "name": name, "arguments": arguments });
        let response = self.request(conn, methods::TOOLS_CALL, Some(params)).await?;
        let result: CallToolResult =
            serde_json::from_value(response.into_result()?).map_err(|e| ClientError::Frame {
                reason: format!("malformed tools/call result: {e}"),
            })?;
        Ok(result)
    }

    async fn close(&self) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        if state.phase == Phase::Closed {
            return Ok(());
        }

        let mut errors = Vec::new();
        if let Some(mut conn) = state.conn.take() {
            // Dropping stdin closes the child's input pipe.
            drop(conn.stdin);

            if let Err(e) = conn.child.start_kill() {
                // An already-exited child is not a close failure.
                if e.kind() != io::ErrorKind::InvalidInput {
                    errors.push(format!("failed to kill process: {e}"));
                }
            }
            match conn.child.wait().await {
                Ok(status) => {
                    // The kill-induced non-zero exit is expected.
                    tracing::debug!(server = %self.server_name, ?status, "server process reaped");
                }
                Err(e) => errors.push(format!("failed to reap process: {e}")),
            }
        }
        state.phase = Phase::Closed;

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Close(errors.join("; ")))
        }
    }

    fn server_name(&self) -> &str {
        &self.server_name
    }

    async fn is_connected(&self) -> bool {
        let state = self.state.lock().await;
        matches!(state.phase, Phase::Connected | Phase::Initialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_operations_before_connect_fail() {
        let client = StdioClient::new("t", "true", vec![]);
        assert!(matches!(
            client.list_tools().await.unwrap_err(),
            ClientError::NotConnected
        ));
        assert!(matches!(
            client.call_tool("x", json!({})).await.unwrap_err(),
            ClientError::NotConnected
        ));
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_close_is_terminal() {
        let client = StdioClient::new("t", "true", vec![]);
        client.close().await.unwrap();
        assert!(matches!(
            client.connect().await.unwrap_err(),
            ClientError::NotConnected
        ));
        // Closing twice is fine.
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_client_fresh() {
        let client = StdioClient::new("t", "mcp-relay-no-such-binary-4242", vec![]);
        assert!(matches!(
            client.connect().await.unwrap_err(),
            ClientError::Spawn { .. }
        ));
        assert!(!client.is_connected().await);
    }
}
