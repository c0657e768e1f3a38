//! Configuration schema definitions.
//!
//! Every section carries `#[serde(default)]`, so an empty file is a valid
//! configuration pointing at a local node.

use serde::{Deserialize, Serialize};

use crate::crypto::{DEFAULT_ADDRESS_PREFIX, DEFAULT_MAX_SIGN_ATTEMPTS};

/// Root configuration for the client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Node endpoint and request deadlines.
    pub node: NodeConfig,

    /// WebSocket reconnect policy.
    pub reconnect: ReconnectConfig,

    /// HTTP retry policy.
    pub retry: RetryConfig,

    /// Chain parameters used when signing.
    pub chain: ChainConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Which wire transport to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    WebSocket,
    Http,
}

impl TransportKind {
    /// Transport implied by a URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split_once("://")?.0.to_ascii_lowercase();
        match scheme.as_str() {
            "ws" | "wss" => Some(Self::WebSocket),
            "http" | "https" => Some(Self::Http),
            _ => None,
        }
    }
}

/// Node endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Endpoint URL (`ws://`, `wss://`, `http://` or `https://`).
    pub url: String,

    /// Force a transport instead of deriving it from the URL scheme.
    pub transport: Option<TransportKind>,

    /// Default per-request deadline in milliseconds. 0 disables it.
    pub request_timeout_ms: u64,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Open the WebSocket on the first request.
    pub auto_connect: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8090".to_string(),
            transport: None,
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            auto_connect: true,
        }
    }
}

impl NodeConfig {
    /// The transport to use: the explicit override, else the URL scheme.
    pub fn transport_kind(&self) -> Option<TransportKind> {
        self.transport.or_else(|| TransportKind::from_url(&self.url))
    }
}

/// Reconnect configuration for the WebSocket transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Upper bound on the delay between reconnect attempts.
    pub max_delay_ms: u64,

    /// Spread reconnect delays by up to 10%.
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_delay_ms: 10_000,
            jitter: false,
        }
    }
}

/// Retry configuration for the HTTP transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, counting the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Chain parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// 32-byte chain id as hex. Empty means all zeros.
    pub chain_id: String,

    /// Public key prefix.
    pub address_prefix: String,

    /// Seconds added to the head block time for a new transaction.
    pub expire_secs: u32,

    /// Nonce attempts before signing gives up.
    pub max_sign_attempts: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: String::new(),
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
            expire_secs: 60,
            max_sign_attempts: DEFAULT_MAX_SIGN_ATTEMPTS,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Install the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
