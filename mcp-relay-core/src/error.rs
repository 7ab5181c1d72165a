//! Error taxonomy for the stdio client engine and the tool registry.
//!
//! `ClientError` covers the downstream transport: pipe IO, framing, request
//! correlation, deadlines, and protocol-level errors returned by a server.
//! `RegistryError` covers namespace management: duplicate or unknown server
//! names and invalid state for an operation.
//!
//! Transport errors are wrapped with server-name context at the dispatch
//! boundary, never here.

use std::time::Duration;

/// Errors produced by an MCP client talking to one downstream server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Writing a request frame to the child's stdin failed.
    #[error("failed to write request: {0}")]
    TransportWrite(#[source] std::io::Error),

    /// Reading a response line from the child's stdout failed or hit EOF.
    #[error("failed to read response: {0}")]
    TransportRead(#[source] std::io::Error),

    /// A frame could not be serialized, or an inbound line was not a
    /// well-formed JSON-RPC response.
    #[error("protocol frame error: {reason}")]
    Frame { reason: String },

    /// The response ID did not match the request that was just written.
    #[error("response ID {got} does not match request ID {expected}")]
    IdMismatch { expected: i64, got: i64 },

    /// The per-request deadline expired before a response arrived.
    #[error("request timeout after {0:?}")]
    Timeout(Duration),

    /// The caller abandoned the request before a response arrived.
    #[error("request cancelled")]
    Cancelled,

    /// The server answered with a JSON-RPC `error` member.
    #[error("server returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Operation attempted on a client that is not connected, or that has
    /// been closed.
    #[error("client not connected")]
    NotConnected,

    /// The child process could not be spawned or its pipes captured.
    #[error("failed to start server process: {reason}")]
    Spawn { reason: String },

    /// One or more failures while tearing the connection down.
    #[error("errors during close: {0}")]
    Close(String),
}

/// Substring match deciding whether a client error means the downstream
/// connection itself is gone, as opposed to a per-call failure.
///
/// Drives the registry's connected-to-disconnected transition on dispatch.
pub fn is_connection_error(err: &ClientError) -> bool {
    const MARKERS: [&str; 5] = ["connection", "broken pipe", "eof", "closed", "timeout"];
    let text = err.to_string().to_lowercase();
    MARKERS.iter().any(|marker| text.contains(marker))
}

/// Errors produced by registry management operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("server '{0}' already exists")]
    DuplicateServer(String),

    #[error("server '{0}' not found")]
    UnknownServer(String),

    /// Reconnect requires a prior disconnect.
    #[error("server '{0}' is still connected, use server_disconnect first")]
    StillConnected(String),

    /// The command string had no program token.
    #[error("invalid command: expected a program name")]
    InvalidCommand,

    #[error("transport '{0}' is not supported")]
    UnsupportedTransport(String),

    #[error("failed to connect: {0}")]
    Connect(#[source] ClientError),

    #[error("failed to initialize: {0}")]
    Initialize(#[source] ClientError),

    #[error("failed to list tools: {0}")]
    ListTools(#[source] ClientError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_id_mismatch_message() {
        let err = ClientError::IdMismatch {
            expected: 1,
            got: 99,
        };
        assert_eq!(err.to_string(), "response ID 99 does not match request ID 1");
    }

    #[test]
    fn test_connection_predicate_matches_eof() {
        let err = ClientError::TransportRead(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "server closed stdout (EOF)",
        ));
        assert!(is_connection_error(&err));
    }

    #[test]
    fn test_connection_predicate_matches_broken_pipe() {
        let err = ClientError::TransportWrite(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "broken pipe",
        ));
        assert!(is_connection_error(&err));
    }

    #[test]
    fn test_connection_predicate_matches_timeout() {
        assert!(is_connection_error(&ClientError::Timeout(
            Duration::from_secs(30)
        )));
    }

    #[test]
    fn test_connection_predicate_case_insensitive() {
        let err = ClientError::Spawn {
            reason: "Connection refused".to_string(),
        };
        assert!(is_connection_error(&err));
    }

    #[test]
    fn test_connection_predicate_rejects_tool_failures() {
        let err = ClientError::Rpc {
            code: -32602,
            message: "invalid params".to_string(),
        };
        assert!(!is_connection_error(&err));

        let err = ClientError::IdMismatch {
            expected: 1,
            got: 2,
        };
        assert!(!is_connection_error(&err));
    }
}
