//! Shared protocol layer for the mcp-relay aggregating proxy.
//!
//! This crate holds everything both sides of the proxy agree on: the
//! JSON-RPC 2.0 envelope types and newline frame codec, the MCP method
//! names and handshake/tool-result payloads, the YAML configuration
//! schema with environment expansion, and the error taxonomy shared by
//! the stdio client engine and the tool registry.
//!
//! It deliberately contains no I/O beyond reading the configuration
//! file; the process-facing machinery lives in the `mcp-relay` crate.

pub mod config;
pub mod error;
pub mod jsonrpc;
pub mod protocol;

pub use error::{is_connection_error, ClientError, RegistryError};
pub use jsonrpc::{FrameId, FrameKind, RequestEnvelope, ResponseEnvelope, RpcError};
