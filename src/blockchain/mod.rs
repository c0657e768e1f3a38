//! Chain client subsystem.
//!
//! # Data Flow
//! ```text
//! ClientConfig
//!     → client.rs (transport choice, ids, deadlines, chain parameters)
//!     → wallet.rs (account keys by role)
//!     → broadcast.rs (prepare, sign, send)
//! ```
//!
//! # Security Constraints
//! - Private keys come from a login, a WIF string or the environment
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod broadcast;
pub mod client;
pub mod types;
pub mod wallet;

pub use broadcast::Broadcaster;
pub use client::Client;
pub use types::{DynamicGlobalProperties, TransactionConfirmation};
pub use wallet::Wallet;
