//! Metrics collection and exposition.
//!
//! # Metrics
//! - `taiyi_rpc_requests_total` (counter): calls by api, method, outcome
//! - `taiyi_rpc_request_duration_seconds` (histogram): call latency
//! - `taiyi_transport_timeouts_total` (counter): requests past their deadline
//! - `taiyi_transport_reconnects_total` (counter): WebSocket reconnect attempts
//! - `taiyi_transport_pending_requests` (gauge): WebSocket requests awaiting a response
//! - `taiyi_transport_message_errors_total` (counter): frames that could not be parsed
//!
//! # Design Decisions
//! - Updates go through the `metrics` facade and cost nothing without a recorder
//! - The Prometheus exporter is opt-in

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const RPC_REQUESTS_TOTAL: &str = "taiyi_rpc_requests_total";
pub const RPC_REQUEST_DURATION_SECONDS: &str = "taiyi_rpc_request_duration_seconds";
pub const TRANSPORT_TIMEOUTS_TOTAL: &str = "taiyi_transport_timeouts_total";
pub const TRANSPORT_RECONNECTS_TOTAL: &str = "taiyi_transport_reconnects_total";
pub const TRANSPORT_PENDING_REQUESTS: &str = "taiyi_transport_pending_requests";
pub const TRANSPORT_MESSAGE_ERRORS_TOTAL: &str = "taiyi_transport_message_errors_total";

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "metrics exporter listening");
    Ok(())
}

/// Record one finished RPC call.
pub fn record_rpc_request(api: &str, method: &str, outcome: &'static str, duration: Duration) {
    ::metrics::counter!(
        RPC_REQUESTS_TOTAL,
        "api" => api.to_string(),
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!(RPC_REQUEST_DURATION_SECONDS, "api" => api.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_timeout() {
    ::metrics::counter!(TRANSPORT_TIMEOUTS_TOTAL).increment(1);
}

pub fn record_reconnect() {
    ::metrics::counter!(TRANSPORT_RECONNECTS_TOTAL).increment(1);
}

pub fn set_pending_requests(count: usize) {
    ::metrics::gauge!(TRANSPORT_PENDING_REQUESTS).set(count as f64);
}

pub fn record_message_error() {
    ::metrics::counter!(TRANSPORT_MESSAGE_ERRORS_TOTAL).increment(1);
}
