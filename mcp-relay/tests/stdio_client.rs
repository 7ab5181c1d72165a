//! Integration tests for the stdio client engine against scripted child
//! processes.
//!
//! The scripts are plain `/bin/sh`, so everything here is gated on unix,
//! the platform the proxy targets for child-process semantics.
#![cfg(unix)]

mod helpers;

use std::time::{Duration, Instant};

use serde_json::json;

use mcp_relay::client::{McpClient, StdioClient};
use mcp_relay_core::error::{is_connection_error, ClientError};

use helpers::{
    write_script, GREET_SERVER, MISMATCHED_ID_SERVER, SILENT_SERVER, VANISHING_SERVER,
};

#[tokio::test(flavor = "multi_thread")]
async fn test_full_session_against_greet_server() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "greet-server", GREET_SERVER);

    let client = StdioClient::new("m", script.to_str().unwrap(), vec![]);
    client.connect().await.unwrap();
    assert!(client.is_connected().await);

    let init = client.initialize().await.unwrap();
    assert_eq!(init.protocol_version, "2024-11-05");
    assert_eq!(init.server_info.name, "greet-server");

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "greet");
    assert_eq!(tools[0].input_schema["type"], "object");

    let result = client
        .call_tool("greet", json!({"name": "World"}))
        .await
        .unwrap();
    assert!(!result.is_error);
    assert_eq!(result.content[0].text, "Hello, World!");

    client.close().await.unwrap();
    assert!(!client.is_connected().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connect_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "greet-server", GREET_SERVER);

    let client = StdioClient::new("m", script.to_str().unwrap(), vec![]);
    client.connect().await.unwrap();
    client.connect().await.unwrap();
    client.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_id_mismatch_detected() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "confused-server", MISMATCHED_ID_SERVER);

    let client = StdioClient::new("m", script.to_str().unwrap(), vec![]);
    client.connect().await.unwrap();

    let err = client.initialize().await.unwrap_err();
    match err {
        ClientError::IdMismatch { expected, got } => {
            assert_eq!(expected, 1);
            assert_eq!(got, 99);
        }
        other => panic!("expected IdMismatch, got: {other:?}"),
    }
    assert!(err.to_string().contains("does not match request ID"));

    client.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_timeout_on_silent_server() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "silent-server", SILENT_SERVER);

    let client = StdioClient::new("m", script.to_str().unwrap(), vec![])
        .with_timeout(Duration::from_millis(200));
    client.connect().await.unwrap();

    let started = Instant::now();
    let err = client.initialize().await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
    // The caller is unblocked shortly after the deadline, regardless of the
    // child never answering.
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(is_connection_error(&err));

    // The child is still alive and the client still nominally connected.
    assert!(client.is_connected().await);
    client.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_eof_surfaces_as_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "vanishing-server", VANISHING_SERVER);

    let client = StdioClient::new("m", script.to_str().unwrap(), vec![]);
    client.connect().await.unwrap();

    let err = client.initialize().await.unwrap_err();
    assert!(matches!(err, ClientError::TransportRead(_)));
    assert!(is_connection_error(&err));

    client.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_operations_after_close_fail() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "greet-server", GREET_SERVER);

    let client = StdioClient::new("m", script.to_str().unwrap(), vec![]);
    client.connect().await.unwrap();
    client.close().await.unwrap();

    assert!(matches!(
        client.list_tools().await.unwrap_err(),
        ClientError::NotConnected
    ));
    assert!(matches!(
        client.call_tool("greet", json!({})).await.unwrap_err(),
        ClientError::NotConnected
    ));
    assert!(matches!(
        client.connect().await.unwrap_err(),
        ClientError::NotConnected
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sequential_requests_get_increasing_ids() {
    // The greet script echoes our IDs back; three calls on one client only
    // correlate if the generator is strictly increasing per request.
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "greet-server", GREET_SERVER);

    let client = StdioClient::new("m", script.to_str().unwrap(), vec![]);
    client.connect().await.unwrap();
    client.initialize().await.unwrap();

    for _ in 0..3 {
        let result = client
            .call_tool("greet", json!({"name": "World"}))
            .await
            .unwrap();
        assert_eq!(result.content[0].text, "Hello, World!");
    }
    client.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_child_env_is_passed_through() {
    // A one-shot server that answers initialize with its env var as the
    // server name.
    let script_body = r##"#!/bin/sh
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"%s","version":"1.0"}}}\n' "$id" "$RELAY_TEST_NAME"
done
"##;
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "env-server", script_body);

    let mut env = std::collections::HashMap::new();
    env.insert("RELAY_TEST_NAME".to_string(), "from-env".to_string());

    let client = StdioClient::new("m", script.to_str().unwrap(), vec![]).with_env(env);
    client.connect().await.unwrap();
    let init = client.initialize().await.unwrap();
    assert_eq!(init.server_info.name, "from-env");
    client.close().await.unwrap();
}
