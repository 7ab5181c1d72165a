//! Upstream stdio server loop.
//!
//! Speaks newline-delimited JSON-RPC with the single consumer on the
//! proxy's own stdin/stdout. Behavior is fully determined by the registry
//! and the management tools; this layer only frames, dispatches, records,
//! and translates.

use std::io;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use mcp_relay_core::jsonrpc::{classify_frame, FrameId, FrameKind};
use mcp_relay_core::protocol::{methods, CallToolResult, ToolInfo, PROTOCOL_VERSION};

use crate::record::{Direction, Recorder};
use crate::registry::management::{call_management_tool, is_management_tool, management_tools};
use crate::registry::Registry;

/// Identity the proxy reports to its consumer.
pub const SERVER_NAME: &str = "mcp-relay";

/// The upstream-facing MCP server.
pub struct UpstreamServer {
    registry: Arc<Registry>,
    recorder: Arc<Recorder>,
}

impl UpstreamServer {
    pub fn new(registry: Arc<Registry>, recorder: Arc<Recorder>) -> Self {
        Self { registry, recorder }
    }

    /// Serve on the process's stdin/stdout until EOF, then close every
    /// downstream client best-effort.
    pub async fn serve(&self) -> io::Result<()> {
        let input = BufReader::new(tokio::io::stdin());
        self.serve_with(input, tokio::io::stdout()).await
    }

    /// Serve on arbitrary streams. EOF on `input` ends the loop.
    pub async fn serve_with<R, W>(&self, mut input: R, mut output: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("upstream server loop started");

        let mut line = String::new();
        loop {
            line.clear();
            if input.read_line(&mut line).await? == 0 {
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let value: Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(error = %e, "malformed frame from consumer");
                    let frame = error_frame(&FrameId::Null, -32700, "Parse error");
                    write_line(&mut output, &frame).await?;
                    continue;
                }
            };

            let (id, method) = match classify_frame(&value) {
                Ok(FrameKind::Request { id, method }) => (id, method),
                Ok(FrameKind::Notification { method }) => {
                    tracing::debug!(method, "notification from consumer");
                    continue;
                }
                Ok(FrameKind::Response { .. }) => {
                    tracing::warn!("unexpected response frame from consumer, ignoring");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "unclassifiable frame from consumer");
                    let frame = error_frame(&FrameId::Null, -32600, "Invalid Request");
                    write_line(&mut output, &frame).await?;
                    continue;
                }
            };

            let params = value.get("params");
            let (message_type, tool_name) = describe_request(&method, params);
            let server_name = match tool_name.as_deref() {
                Some(tool) if is_management_tool(tool) => Some("proxy".to_string()),
                Some(tool) => self.registry.server_for_tool(tool).await,
                None => None,
            };
            self.recorder
                .record(
                    Direction::Request,
                    &message_type,
                    tool_name.as_deref(),
                    server_name.as_deref(),
                    &value,
                )
                .await;

            let response = self.handle_request(&id, &method, params).await;

            self.recorder
                .record(
                    Direction::Response,
                    &message_type,
                    tool_name.as_deref(),
                    server_name.as_deref(),
                    &response,
                )
                .await;
            write_line(&mut output, &response).await?;
        }

        tracing::info!("consumer closed stdin, shutting down");
        self.registry.shutdown_all().await;
        Ok(())
    }

    async fn handle_request(&self, id: &FrameId, method: &str, params: Option<&Value>) -> Value {
        match method {
            methods::INITIALIZE => ok_frame(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": { "listChanged": true } },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            ),
            methods::PING => ok_frame(id, json!({})),
            methods::TOOLS_LIST => {
                let mut tools = management_tools();
                for binding in self.registry.bindings_snapshot().await {
                    tools.push(ToolInfo {
                        name: binding.prefixed_name,
                        description: format!("[{}] {}", binding.server_name, binding.description),
                        input_schema: binding.input_schema,
                    });
                }
                ok_frame(id, json!({ "tools": tools }))
            }
            methods::TOOLS_CALL => {
                let name = params.and_then(|p| p.get("name")).and_then(|n| n.as_str());
                let Some(name) = name else {
                    return error_frame(id, -32602, "Invalid params: name is required");
                };
                let arguments = params
                    .and_then(|p| p.get("arguments"))
                    .cloned()
                    .unwrap_or_else(|| json!({}));

                tracing::info!(tool = name, "tools/call");
                let result = match call_management_tool(&self.registry, name, &arguments).await {
                    Some(result) => result,
                    None => self.registry.call_tool(name, arguments).await,
                };
                call_result_frame(id, &result)
            }
            _ => {
                tracing::debug!(method, "unknown method from consumer");
                error_frame(id, -32601, "Method not found")
            }
        }
    }
}

/// Recording metadata for an upstream request.
fn describe_request(method: &str, params: Option<&Value>) -> (String, Option<String>) {
    match method {
        methods::TOOLS_CALL => {
            let tool = params
                .and_then(|p| p.get("name"))
                .and_then(|n| n.as_str())
                .map(str::to_string);
            ("tool_call".to_string(), tool)
        }
        methods::TOOLS_LIST => ("tools_list".to_string(), None),
        other => (other.to_string(), None),
    }
}

fn ok_frame(id: &FrameId, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_frame(id: &FrameId, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

fn call_result_frame(id: &FrameId, result: &CallToolResult) -> Value {
    match serde_json::to_value(result) {
        Ok(value) => ok_frame(id, value),
        Err(e) => error_frame(id, -32603, &format!("Internal error: {e}")),
    }
}

async fn write_line<W>(output: &mut W, frame: &Value) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(frame).map_err(io::Error::other)?;
    line.push('\n');
    output.write_all(line.as_bytes()).await?;
    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> UpstreamServer {
        UpstreamServer::new(Arc::new(Registry::new()), Arc::new(Recorder::disabled()))
    }

    async fn exchange(server: &UpstreamServer, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        server
            .serve_with(
                BufReader::new(std::io::Cursor::new(input.as_bytes().to_vec())),
                &mut output,
            )
            .await
            .unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_initialize_handshake() {
        let frames = exchange(
            &server(),
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n",
        )
        .await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["id"], 1);
        assert_eq!(frames[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(frames[0]["result"]["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn test_tools_list_contains_management_tools() {
        let frames = exchange(
            &server(),
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n",
        )
        .await;
        let tools = frames[0]["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert!(names.contains(&"server_add"));
        assert!(names.contains(&"server_list"));
        assert_eq!(tools.len(), 5);
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool_is_tool_error() {
        let frames = exchange(
            &server(),
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"tools/call\",\"params\":{\"name\":\"ghost_tool\",\"arguments\":{}}}\n",
        )
        .await;
        // Tool-level failure, not a JSON-RPC error.
        assert!(frames[0].get("error").is_none());
        assert_eq!(frames[0]["result"]["isError"], true);
        assert!(frames[0]["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("not found"));
    }

    #[tokio::test]
    async fn test_tools_call_requires_name() {
        let frames = exchange(
            &server(),
            "{\"jsonrpc\":\"2.0\",\"id\":4,\"method\":\"tools/call\",\"params\":{}}\n",
        )
        .await;
        assert_eq!(frames[0]["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let frames = exchange(
            &server(),
            "{\"jsonrpc\":\"2.0\",\"id\":5,\"method\":\"resources/read\"}\n",
        )
        .await;
        assert_eq!(frames[0]["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_malformed_line_yields_parse_error() {
        let frames = exchange(&server(), "{not json}\n").await;
        assert_eq!(frames[0]["error"]["code"], -32700);
        assert!(frames[0]["id"].is_null());
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let frames = exchange(
            &server(),
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
        )
        .await;
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn test_string_ids_echoed() {
        let frames = exchange(
            &server(),
            "{\"jsonrpc\":\"2.0\",\"id\":\"req-9\",\"method\":\"ping\"}\n",
        )
        .await;
        assert_eq!(frames[0]["id"], "req-9");
    }

    #[tokio::test]
    async fn test_management_call_through_loop() {
        let frames = exchange(
            &server(),
            "{\"jsonrpc\":\"2.0\",\"id\":6,\"method\":\"tools/call\",\"params\":{\"name\":\"server_list\",\"arguments\":{}}}\n",
        )
        .await;
        assert_eq!(frames[0]["result"]["isError"], false);
        assert!(frames[0]["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("No servers connected."));
    }
}
