//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → Client::new builds the transport and signing parameters
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a new client picks up changes
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ChainConfig, ClientConfig, LogFormat, NodeConfig, ObservabilityConfig, ReconnectConfig,
    RetryConfig, TransportKind,
};
pub use validation::{validate_config, ValidationError};
