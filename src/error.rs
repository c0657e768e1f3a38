//! Error taxonomy for the client.
//!
//! # Propagation
//! - Encoding, key format and signature errors abort the current operation
//!   and are never retried.
//! - Transport and RPC errors belong to a single request; they never tear
//!   down the transport.
//! - [`Error`] wraps everything with `#[from]`, so `source()` walks down to
//!   the low-level cause.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::loader::ConfigError;

/// Result type used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error returned by `call`, `sign` and `send`.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The node answered, but not with the shape we asked for.
    #[error("unexpected response for {method}: {source}")]
    Response {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Binary serialization failures. The `path` names the offending field,
/// e.g. `transfer.amount`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("unknown operation `{name}`")]
    UnknownOperation { name: String },

    #[error("asset symbol `{symbol}` does not fit in 7 ascii bytes (at `{path}`)")]
    SymbolTooLong { symbol: String, path: String },

    #[error("invalid value at `{path}`: {message}")]
    InvalidField { path: String, message: String },

    #[error("invalid asset `{input}`: {reason}")]
    InvalidAsset { input: String, reason: String },

    #[error("invalid time `{input}`")]
    InvalidTime { input: String },
}

impl EncodingError {
    /// Prefix the error path with an enclosing field or operation name.
    pub fn at(self, segment: &str) -> Self {
        match self {
            Self::SymbolTooLong { symbol, path } => Self::SymbolTooLong {
                symbol,
                path: join_path(segment, &path),
            },
            Self::InvalidField { path, message } => Self::InvalidField {
                path: join_path(segment, &path),
                message,
            },
            other => other,
        }
    }

    /// The dotted path of the offending field, when there is one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::SymbolTooLong { path, .. } | Self::InvalidField { path, .. } => Some(path),
            _ => None,
        }
    }
}

fn join_path(segment: &str, path: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{segment}.{path}")
    }
}

/// WIF key decoding failures, one variant per check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyFormatError {
    #[error("public key prefix mismatch: expected `{expected}`, found `{found}`")]
    Prefix { expected: String, found: String },

    #[error("key checksum mismatch")]
    Checksum,

    #[error("private key network id mismatch: expected 0x80, found {found:#04x}")]
    NetworkId { found: u8 },

    #[error("invalid base58: {0}")]
    Base58(String),

    #[error("invalid key length: expected {expected} bytes, found {found}")]
    Length { expected: usize, found: usize },

    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

/// Signing and recovery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("no canonical signature found after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    #[error("chain id must be 32 bytes, found {found}")]
    ChainIdLength { found: usize },

    #[error("chain id is not valid hex: {0}")]
    ChainIdHex(String),

    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("public key recovery failed: {0}")]
    Recovery(String),
}

/// Failures of a single request on the wire.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("websocket error: {message}")]
    WebSocket {
        message: String,
        #[source]
        source: Option<Arc<tokio_tungstenite::tungstenite::Error>>,
    },

    #[error("http error{}: {message}", .status.map(|s| format!(" {s}")).unwrap_or_default())]
    Http {
        status: Option<u16>,
        message: String,
        /// No connection was made, so the node never saw the request.
        connect: bool,
        #[source]
        source: Option<Arc<reqwest::Error>>,
    },

    #[error("request {id} timed out after {after:?}")]
    Timeout { id: u64, after: Duration },

    #[error("malformed message: {0}")]
    Message(String),

    #[error("transport closed")]
    Closed,
}

impl TransportError {
    pub(crate) fn websocket(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket {
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }

    pub(crate) fn http(error: reqwest::Error) -> Self {
        Self::Http {
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
            connect: error.is_connect(),
            source: Some(Arc::new(error)),
        }
    }

    /// Whether the failure happened before any HTTP status was received.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Http { status: None, .. } | Self::WebSocket { .. })
    }

    /// Whether the request never left the client and may be sent again.
    pub fn is_unsent(&self) -> bool {
        matches!(self, Self::Http { connect: true, .. })
    }
}

/// Error payload as sent by the node.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct RpcErrorPayload {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Server-reported failure with a message rebuilt from the node's
/// structured assertion stack.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    /// The untouched `data` object (assertion stack etc).
    pub info: Option<Value>,
}

impl RpcError {
    /// Normalize a node error.
    ///
    /// `stack[0].format` has its `${key}` placeholders filled from
    /// `stack[0].data`; string-valued keys left unused are appended as
    /// `key=value`.
    pub fn from_payload(payload: RpcErrorPayload) -> Self {
        let message = payload
            .data
            .as_ref()
            .and_then(|data| data.get("stack"))
            .and_then(Value::as_array)
            .and_then(|stack| stack.first())
            .and_then(format_stack_frame)
            .unwrap_or_else(|| payload.message.clone());

        Self {
            code: payload.code,
            message,
            info: payload.data,
        }
    }
}

fn format_stack_frame(frame: &Value) -> Option<String> {
    let format = frame.get("format")?.as_str()?;
    let mut data: Map<String, Value> = frame
        .get("data")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut message = String::with_capacity(format.len());
    let mut rest = format;
    while let Some(start) = rest.find("${") {
        message.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            message.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let key = &after[..end];
        let placeholder = &rest[start..start + 2 + end + 1];
        match data.get(key).filter(|v| is_truthy(v)) {
            Some(value) => {
                message.push_str(&display_value(value));
                data.remove(key);
            }
            None => message.push_str(placeholder),
        }
        rest = &after[end + 1..];
    }
    message.push_str(rest);

    let leftovers: Vec<String> = data
        .iter()
        .filter_map(|(key, value)| value.as_str().map(|s| format!("{key}={s}")))
        .collect();
    if !leftovers.is_empty() {
        message.push(' ');
        message.push_str(&leftovers.join(" "));
    }
    Some(message)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
