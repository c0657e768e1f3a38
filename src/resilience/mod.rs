//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! WebSocket close while active:
//!     → backoff::reconnect_delay (quadratic, capped)
//!     → reconnect timer in the transport actor
//! HTTP connection failure:
//!     → backoff::calculate_backoff (exponential, capped, jittered)
//!     → retry inside the request's own deadline
//! ```
//!
//! # Design Decisions
//! - Every request has a deadline; retries never extend it
//! - Only connection failures are retried; a status or RPC error is final
//! - Retry counts are bounded by configuration

pub mod backoff;
