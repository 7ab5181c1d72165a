//! JSON-RPC 2.0 envelopes and the newline frame codec.
//!
//! Downstream traffic (proxy to child server) uses [`RequestEnvelope`] and
//! [`ResponseEnvelope`] with numeric IDs generated by the client engine.
//! Upstream traffic (consumer to proxy) is classified from parsed JSON with
//! [`classify_frame`], since a consumer may use numeric, string, or null IDs.
//!
//! One JSON object per line, LF-terminated, no unescaped newlines inside a
//! frame. `serde_json` never emits raw newlines when serializing to a single
//! line, so the outbound invariant holds by construction.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Protocol version string carried in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

// ─────────────────────────────────────────────────────────────────────────────
// Downstream envelopes
// ─────────────────────────────────────────────────────────────────────────────

/// A JSON-RPC 2.0 request sent to a downstream server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    pub id: i64,
}

impl RequestEnvelope {
    /// Build a request with the canonical `"2.0"` version tag.
    pub fn new(id: i64, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 response read from a downstream server.
///
/// Exactly one of `result` and `error` is present in a well-formed frame;
/// [`decode_response`] enforces this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: i64,
}

impl ResponseEnvelope {
    /// Extract the `result` payload, mapping a protocol-level `error` member
    /// to [`ClientError::Rpc`].
    pub fn into_result(self) -> Result<serde_json::Value, ClientError> {
        if let Some(err) = self.error {
            return Err(ClientError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        // decode_response guarantees result is present when error is not.
        self.result.ok_or_else(|| ClientError::Frame {
            reason: "response carries neither result nor error".to_string(),
        })
    }
}

/// The `error` member of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame codec
// ─────────────────────────────────────────────────────────────────────────────

/// Serialize a value as a single newline-terminated JSON line.
pub fn encode_frame<T: Serialize>(value: &T) -> Result<String, ClientError> {
    let mut line = serde_json::to_string(value).map_err(|e| ClientError::Frame {
        reason: format!("failed to serialize frame: {e}"),
    })?;
    line.push('\n');
    Ok(line)
}

/// Decode one line into a [`ResponseEnvelope`].
///
/// Rejects frames that are not JSON objects, carry a wrong `jsonrpc` tag, or
/// do not have exactly one of `result` / `error`.
pub fn decode_response(line: &str) -> Result<ResponseEnvelope, ClientError> {
    let envelope: ResponseEnvelope =
        serde_json::from_str(line.trim()).map_err(|e| ClientError::Frame {
            reason: format!("malformed response frame: {e}"),
        })?;

    if envelope.jsonrpc != JSONRPC_VERSION {
        return Err(ClientError::Frame {
            reason: format!("unsupported jsonrpc version: {}", envelope.jsonrpc),
        });
    }

    match (&envelope.result, &envelope.error) {
        (None, None) => Err(ClientError::Frame {
            reason: "response carries neither result nor error".to_string(),
        }),
        (Some(_), Some(_)) => Err(ClientError::Frame {
            reason: "response carries both result and error".to_string(),
        }),
        _ => Ok(envelope),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Upstream frame classification
// ─────────────────────────────────────────────────────────────────────────────

/// A JSON-RPC ID as a consumer may send it: number, string, or null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameId {
    Number(i64),
    String(String),
    Null,
}

/// Classification of an inbound upstream frame.
///
/// Determined by presence of `id` and `method`:
/// - both present: request
/// - only `id`: response
/// - only `method`: notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    Request { id: FrameId, method: String },
    Response { id: FrameId },
    Notification { method: String },
}

/// Errors from [`classify_frame`].
#[derive(Debug, thiserror::Error)]
pub enum FrameClassifyError {
    /// The `jsonrpc` field is missing or not `"2.0"`.
    #[error("missing or invalid jsonrpc version field")]
    InvalidVersion,
    /// The `id` field is present but not a number, string, or null.
    #[error("invalid id field")]
    InvalidId,
    /// The frame has neither `id` nor `method`.
    #[error("frame has neither id nor method")]
    Unclassifiable,
}

/// Classify a parsed JSON-RPC frame without taking ownership.
pub fn classify_frame(value: &serde_json::Value) -> Result<FrameKind, FrameClassifyError> {
    let version = value.get("jsonrpc").and_then(|v| v.as_str());
    if version != Some(JSONRPC_VERSION) {
        return Err(FrameClassifyError::InvalidVersion);
    }

    let id = value
        .get("id")
        .map(parse_frame_id)
        .transpose()
        .map_err(|_| FrameClassifyError::InvalidId)?;
    let method = value
        .get("method")
        .and_then(|v| v.as_str())
        .map(String::from);

    match (id, method) {
        (Some(id), Some(method)) => Ok(FrameKind::Request { id, method }),
        (Some(id), None) => Ok(FrameKind::Response { id }),
        (None, Some(method)) => Ok(FrameKind::Notification { method }),
        (None, None) => Err(FrameClassifyError::Unclassifiable),
    }
}

/// Accepts integer, string, or null IDs. Floats, booleans, arrays, and
/// objects are invalid per JSON-RPC 2.0.
fn parse_frame_id(value: &serde_json::Value) -> Result<FrameId, ()> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().map(FrameId::Number).ok_or(()),
        serde_json::Value::String(s) => Ok(FrameId::String(s.clone())),
        serde_json::Value::Null => Ok(FrameId::Null),
        _ => Err(()),
    }
}
