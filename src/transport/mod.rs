//! RPC transports.
//!
//! # Responsibilities
//! - Deliver `call` requests to the node and correlate responses by id
//! - Enforce per-request deadlines
//! - Keep a WebSocket connection alive across unexpected closes
//!
//! # Data Flow
//! ```text
//! Client::call
//!     → RpcRequest { id, "call", [api, method, args] }
//!     → Transport::send
//!         WebSocket: actor task → pending map → socket → response by id
//!         HTTP:      POST → response body
//!     → Result<Value, Error>
//! ```
//!
//! # Design Decisions
//! - `Transport` is a closed enum; there are exactly two wire variants
//! - The WebSocket state lives in one task, so no locks are needed
//! - Every `send` settles exactly once, including on shutdown

pub mod http;
pub mod pending;
pub mod websocket;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, RpcError, RpcErrorPayload, TransportError};

pub use self::http::{HttpOptions, HttpTransport};
pub use self::pending::PendingRequests;
pub use self::websocket::{WsOptions, WsTransport};

/// API most chain methods live under.
pub const DEFAULT_API: &str = "baiyujing_api";

/// Outbound request: `{"id", "jsonrpc": "2.0", "method": "call", "params": [api, method, args]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,
    pub jsonrpc: String,
    pub method: String,
    pub params: (String, String, Value),
}

impl RpcRequest {
    pub fn call(id: u64, api: &str, method: &str, args: Value) -> Self {
        Self {
            id,
            jsonrpc: "2.0".to_string(),
            method: "call".to_string(),
            params: (api.to_string(), method.to_string(), args),
        }
    }

    pub fn api(&self) -> &str {
        &self.params.0
    }

    pub fn api_method(&self) -> &str {
        &self.params.1
    }
}

/// Connection lifecycle of the WebSocket transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

/// Out-of-band events published by the WebSocket transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Open,
    Close { reason: Option<String> },
    Error(TransportError),
    /// Server push (`{"method": "notice", "params": ...}`).
    Notice(Value),
    /// A frame that could not be understood; the receive loop keeps going.
    MessageError { raw: String, error: TransportError },
}

/// One of the two wire transports.
#[derive(Debug, Clone)]
pub enum Transport {
    WebSocket(WsTransport),
    Http(HttpTransport),
}

impl Transport {
    /// Send a request and wait for its result.
    ///
    /// `timeout` bounds the wait for this request only.
    pub async fn send(
        &self,
        request: RpcRequest,
        timeout: Option<Duration>,
    ) -> Result<Value, Error> {
        match self {
            Transport::WebSocket(ws) => ws.send(request, timeout).await,
            Transport::Http(http) => http.send(request, timeout).await,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Transport::WebSocket(_) => "websocket",
            Transport::Http(_) => "http",
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug)]
pub(crate) enum Inbound {
    Response {
        id: u64,
        outcome: Result<Value, RpcError>,
    },
    Notice(Value),
}

#[derive(Deserialize)]
struct RawInbound {
    id: Option<u64>,
    result: Option<Value>,
    error: Option<RpcErrorPayload>,
    method: Option<String>,
    params: Option<Value>,
}

/// Classify a text frame or HTTP body.
pub(crate) fn parse_inbound(text: &str) -> Result<Inbound, TransportError> {
    let raw: RawInbound =
        serde_json::from_str(text).map_err(|e| TransportError::Message(e.to_string()))?;

    if raw.method.as_deref() == Some("notice") {
        return Ok(Inbound::Notice(raw.params.unwrap_or(Value::Null)));
    }
    let Some(id) = raw.id else {
        return Err(TransportError::Message(
            "message has no id and is not a notice".to_string(),
        ));
    };
    let outcome = match raw.error {
        Some(payload) => Err(RpcError::from_payload(payload)),
        None => Ok(raw.result.unwrap_or(Value::Null)),
    };
    Ok(Inbound::Response { id, outcome })
}
