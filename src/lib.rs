//! Client library for Taiyi chain nodes.
//!
//! # Architecture Overview
//!
//! ```text
//!   Wallet ──keys──▶ Broadcaster ──ops──▶ serializer (binary) ──▶ crypto (digest, sign)
//!                        │
//!                        ▼
//!                     Client ──call──▶ Transport ──▶ WebSocket actor / HTTP POST ──▶ node
//!
//!   Cross-cutting: config (TOML), observability (tracing, metrics), resilience (backoff)
//! ```

// Wire format and keys
pub mod crypto;
pub mod serializer;

// Node access
pub mod blockchain;
pub mod transport;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod observability;
pub mod resilience;

pub use blockchain::{Broadcaster, Client, Wallet};
pub use config::ClientConfig;
pub use error::{Error, Result};
