//! Chain RPC client.
//!
//! # Responsibilities
//! - Assign strictly increasing request ids
//! - Apply the default request deadline
//! - Log and record metrics per call
//! - Carry the chain parameters used when signing

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::blockchain::types::DynamicGlobalProperties;
use crate::config::schema::{ClientConfig, TransportKind};
use crate::config::{ConfigError, ValidationError};
use crate::crypto::{ChainId, DEFAULT_CHAIN_ID};
use crate::error::{Error, TransportError};
use crate::observability::metrics;
use crate::transport::{
    ConnectionState, HttpOptions, HttpTransport, RpcRequest, Transport, TransportEvent, WsOptions,
    WsTransport, DEFAULT_API,
};

/// RPC client over one transport.
///
/// Cloning is cheap and clones share the id counter and the connection.
#[derive(Clone)]
pub struct Client {
    transport: Transport,
    next_id: Arc<AtomicU64>,
    request_timeout: Option<Duration>,
    chain_id: ChainId,
    address_prefix: String,
    expire_secs: u32,
    max_sign_attempts: u32,
}

impl Client {
    /// Build a client for `config.node.url`.
    ///
    /// The transport follows the URL scheme unless `node.transport` forces
    /// one. A WebSocket client spawns its connection task, so this must run
    /// inside a tokio runtime.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let kind = config.node.transport_kind().ok_or_else(|| {
            ConfigError::Validation(vec![ValidationError::new(
                "node.url",
                format!("cannot pick a transport for `{}`", config.node.url),
            )])
        })?;

        let transport = match kind {
            TransportKind::WebSocket => {
                Transport::WebSocket(WsTransport::new(WsOptions::from_config(config)))
            }
            TransportKind::Http => {
                Transport::Http(HttpTransport::new(HttpOptions::from_config(config))?)
            }
        };
        Self::with_transport(transport, config)
    }

    /// Build a client around an existing transport, taking the remaining
    /// settings from `config`.
    pub fn with_transport(transport: Transport, config: &ClientConfig) -> Result<Self, Error> {
        let chain_id = if config.chain.chain_id.is_empty() {
            DEFAULT_CHAIN_ID
        } else {
            ChainId::from_hex(&config.chain.chain_id)?
        };
        let request_timeout = (config.node.request_timeout_ms > 0)
            .then(|| Duration::from_millis(config.node.request_timeout_ms));

        tracing::info!(
            url = %config.node.url,
            transport = transport.kind(),
            chain_id = %chain_id,
            "client initialized"
        );

        Ok(Self {
            transport,
            next_id: Arc::new(AtomicU64::new(1)),
            request_timeout,
            chain_id,
            address_prefix: config.chain.address_prefix.clone(),
            expire_secs: config.chain.expire_secs,
            max_sign_attempts: config.chain.max_sign_attempts,
        })
    }

    /// Invoke `api.method(params)` with the default deadline.
    pub async fn call(&self, api: &str, method: &str, params: Value) -> Result<Value, Error> {
        self.call_with_timeout(api, method, params, self.request_timeout).await
    }

    /// Invoke `api.method(params)` with an explicit deadline (`None` waits
    /// forever).
    pub async fn call_with_timeout(
        &self,
        api: &str,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::call(id, api, method, params);
        let started = Instant::now();
        tracing::debug!(id, api, method, "RPC call");

        let result = self.transport.send(request, timeout).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(Error::Rpc(_)) => "rpc_error",
            Err(Error::Transport(TransportError::Timeout { .. })) => "timeout",
            Err(_) => "transport_error",
        };
        metrics::record_rpc_request(api, method, outcome, started.elapsed());
        if let Err(error) = &result {
            tracing::debug!(id, api, method, error = %error, "RPC call failed");
        }
        result
    }

    /// [`call`](Self::call) and deserialize the result into `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        api: &str,
        method: &str,
        params: Value,
    ) -> Result<T, Error> {
        let value = self.call(api, method, params).await?;
        serde_json::from_value(value).map_err(|source| Error::Response {
            method: method.to_string(),
            source,
        })
    }

    pub async fn get_dynamic_global_properties(&self) -> Result<DynamicGlobalProperties, Error> {
        self.call_as(DEFAULT_API, "get_dynamic_global_properties", json!([]))
            .await
    }

    /// Open the WebSocket now instead of on the first call. No-op for HTTP.
    pub async fn connect(&self) -> Result<(), Error> {
        match &self.transport {
            Transport::WebSocket(ws) => ws.connect().await.map_err(Error::from),
            Transport::Http(_) => Ok(()),
        }
    }

    /// Close the WebSocket and reject whatever is pending. No-op for HTTP.
    pub async fn disconnect(&self) {
        if let Transport::WebSocket(ws) = &self.transport {
            ws.disconnect().await;
        }
    }

    /// Transport events, WebSocket only.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<TransportEvent>> {
        match &self.transport {
            Transport::WebSocket(ws) => Some(ws.subscribe()),
            Transport::Http(_) => None,
        }
    }

    /// Connection state, WebSocket only.
    pub fn state(&self) -> Option<ConnectionState> {
        match &self.transport {
            Transport::WebSocket(ws) => Some(ws.state()),
            Transport::Http(_) => None,
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn address_prefix(&self) -> &str {
        &self.address_prefix
    }

    pub fn expire_secs(&self) -> u32 {
        self.expire_secs
    }

    pub fn max_sign_attempts(&self) -> u32 {
        self.max_sign_attempts
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport.kind())
            .field("chain_id", &self.chain_id)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
