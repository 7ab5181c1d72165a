//! mcp-relay: a dynamic aggregating proxy for MCP tool servers.
//!
//! The proxy presents itself to one upstream consumer as a single MCP server
//! while multiplexing an arbitrary, runtime-mutable set of downstream child
//! processes. Downstream tools are exposed under `<server>_<tool>` prefixed
//! names; five `server_*` management tools mutate the set at runtime; all
//! upstream traffic can be recorded to a session file and replayed from
//! either side of the dialog.
//!
//! Module map:
//! - [`client`]: the stdio JSON-RPC client engine owning one child process
//! - [`registry`]: the dynamic tool registry and dispatcher
//! - [`record`]: recorder, session parser, and both playback peers
//! - [`server`]: the upstream stdio loop gluing the pieces together
//! - [`cli`]: command-line argument types

pub mod cli;
pub mod client;
pub mod record;
pub mod registry;
pub mod server;
