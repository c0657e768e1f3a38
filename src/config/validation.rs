//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the node URL and that its scheme agrees with a forced transport
//! - Check chain parameters before anything is signed with them
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::{ClientConfig, TransportKind};
use crate::crypto::ChainId;

/// One semantic problem, tied to the dotted key it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.node.url) {
        Err(e) => errors.push(ValidationError::new("node.url", format!("invalid url: {e}"))),
        Ok(url) => match (TransportKind::from_url(url.as_str()), config.node.transport) {
            (None, _) => errors.push(ValidationError::new(
                "node.url",
                format!("unsupported scheme `{}`", url.scheme()),
            )),
            (Some(implied), Some(forced)) if implied != forced => errors.push(ValidationError::new(
                "node.transport",
                format!("{forced:?} transport cannot use a `{}` url", url.scheme()),
            )),
            _ => {}
        },
    }

    if config.node.connect_timeout_ms == 0 {
        errors.push(ValidationError::new("node.connect_timeout_ms", "must be greater than 0"));
    }

    if config.reconnect.max_delay_ms == 0 {
        errors.push(ValidationError::new("reconnect.max_delay_ms", "must be greater than 0"));
    }

    if config.retry.max_attempts == 0 {
        errors.push(ValidationError::new("retry.max_attempts", "must be at least 1"));
    }
    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        errors.push(ValidationError::new(
            "retry.base_delay_ms",
            "must not exceed retry.max_delay_ms",
        ));
    }

    if !config.chain.chain_id.is_empty() {
        if let Err(e) = ChainId::from_hex(&config.chain.chain_id) {
            errors.push(ValidationError::new("chain.chain_id", e.to_string()));
        }
    }
    let prefix = &config.chain.address_prefix;
    if prefix.len() != 3 || !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
        errors.push(ValidationError::new(
            "chain.address_prefix",
            "must be three uppercase ASCII letters",
        ));
    }
    if config.chain.max_sign_attempts == 0 {
        errors.push(ValidationError::new("chain.max_sign_attempts", "must be at least 1"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
