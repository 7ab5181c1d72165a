//! CLI argument types.
//!
//! Defined separately from `main.rs` so integration tests can construct and
//! parse them directly.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// Dynamic aggregating proxy for MCP tool servers.
///
/// Exactly one mode is selected per invocation: proxy (`--proxy` or
/// `--dynamic`), client playback, or server playback.
#[derive(Parser, Debug)]
#[command(name = "mcp-relay", version, about = "Dynamic aggregating proxy for MCP tool servers")]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["proxy", "dynamic", "playback_client", "playback_server"])
))]
pub struct Cli {
    /// Run the aggregating proxy for the servers in the config file.
    #[arg(long)]
    pub proxy: bool,

    /// Run the proxy with runtime server management (server_add and friends).
    #[arg(long)]
    pub dynamic: bool,

    /// Path to the YAML configuration file.
    #[arg(
        long,
        value_name = "PATH",
        required_if_eq_any([("proxy", "true"), ("dynamic", "true")])
    )]
    pub config: Option<PathBuf>,

    /// Log file path. Stdout carries the protocol, so proxy-mode logs go to
    /// a file (default /tmp/mcp-relay.log).
    #[arg(long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Record JSON-RPC traffic to a session file for later playback.
    #[arg(long, value_name = "PATH")]
    pub record: Option<PathBuf>,

    /// Act as an MCP client replaying the recorded session's requests.
    #[arg(long, value_name = "FILE")]
    pub playback_client: Option<PathBuf>,

    /// Act as an MCP server replaying the recorded session's responses.
    #[arg(long, value_name = "FILE")]
    pub playback_server: Option<PathBuf>,
}
