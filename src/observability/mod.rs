//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! transport + client produce:
//!     → tracing events with structured fields (id, api, method, ...)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, pretty or JSON)
//!     → Prometheus exporter (optional, installed by the CLI)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing subscribers is left to binaries
//! - Metrics are cheap (atomic increments) and no-ops without a recorder
//! - Key material never appears in a log field

pub mod logging;
pub mod metrics;
