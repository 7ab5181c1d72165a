//! Shared fixtures: tiny scripted MCP servers written as shell scripts.
//!
//! Dynamic `server_add` takes a whitespace-delimited command line, so each
//! scripted server is materialized as an executable file in a temp dir and
//! addressed by its (space-free) path.
#![allow(dead_code)]

use std::path::PathBuf;

/// A well-behaved server exposing one `greet` tool.
pub const GREET_SERVER: &str = r##"#!/bin/sh
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"greet-server","version":"1.0"}}}\n' "$id"
      ;;
    *'"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"greet","description":"Greet someone","inputSchema":{"type":"object","properties":{"name":{"type":"string"}}}}]}}\n' "$id"
      ;;
    *'"tools/call"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"Hello, World!"}],"isError":false}}\n' "$id"
      ;;
  esac
done
"##;

/// Answers every request with a fixed, wrong ID.
pub const MISMATCHED_ID_SERVER: &str = r##"#!/bin/sh
while IFS= read -r line; do
  printf '{"jsonrpc":"2.0","id":99,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"confused","version":"1.0"}}}\n'
done
"##;

/// Reads requests forever and never answers.
pub const SILENT_SERVER: &str = r##"#!/bin/sh
while IFS= read -r line; do :; done
"##;

/// Exits after the first request without answering it.
pub const VANISHING_SERVER: &str = r##"#!/bin/sh
IFS= read -r line
exit 0
"##;

/// Handshakes and lists one tool, then dies on the first `tools/call`.
pub const CRASH_ON_CALL_SERVER: &str = r##"#!/bin/sh
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"crashy","version":"1.0"}}}\n' "$id"
      ;;
    *'"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"boom","description":"","inputSchema":{"type":"object"}}]}}\n' "$id"
      ;;
    *'"tools/call"'*)
      exit 0
      ;;
  esac
done
"##;

/// Handshakes, lists one tool, and fails every call with `isError: true`.
pub const TOOL_ERROR_SERVER: &str = r##"#!/bin/sh
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"grumpy","version":"1.0"}}}\n' "$id"
      ;;
    *'"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"fail","description":"","inputSchema":{"type":"object"}}]}}\n' "$id"
      ;;
    *'"tools/call"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"kaboom"}],"isError":true}}\n' "$id"
      ;;
  esac
done
"##;

/// Template for a server exposing one `hi` tool with a configurable reply;
/// instantiate with [`version_server`].
const VERSIONED_SERVER_TEMPLATE: &str = r##"#!/bin/sh
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"versioned","version":"__REPLY__"}}}\n' "$id"
      ;;
    *'"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"hi","description":"Say hi","inputSchema":{"type":"object"}}]}}\n' "$id"
      ;;
    *'"tools/call"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"__REPLY__"}],"isError":false}}\n' "$id"
      ;;
  esac
done
"##;

/// A `hi` server whose calls answer with `reply`.
pub fn version_server(reply: &str) -> String {
    VERSIONED_SERVER_TEMPLATE.replace("__REPLY__", reply)
}

/// Write `body` as an executable script under `dir` and return its path.
pub fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.path().join(name);
    std::fs::write(&path, body).expect("write script");
    let mut perms = std::fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod script");
    path
}
