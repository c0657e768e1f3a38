//! Hash helpers, chain id and transaction digests.

use std::fmt;
use std::str::FromStr;

use ripemd::Ripemd160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::crypto::PrivateKey;
use crate::error::{EncodingError, Result, SignatureError};
use crate::serializer::{to_bytes, SignedTransaction, Transaction};

/// 32-byte network identifier mixed into every transaction digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId([u8; 32]);

/// Fallback chain id when none is configured: 32 zero bytes.
pub const DEFAULT_CHAIN_ID: ChainId = ChainId([0u8; 32]);

impl ChainId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Rejects anything that is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignatureError> {
        <[u8; 32]>::try_from(bytes)
            .map(Self)
            .map_err(|_| SignatureError::ChainIdLength { found: bytes.len() })
    }

    pub fn from_hex(text: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(text).map_err(|e| SignatureError::ChainIdHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Default for ChainId {
    fn default() -> Self {
        DEFAULT_CHAIN_ID
    }
}

impl FromStr for ChainId {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({self})")
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

pub(crate) fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub(crate) fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

pub(crate) fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

/// `sha256(chain_id || serialize(tx))`, the message every signer signs.
pub fn transaction_digest(
    transaction: &Transaction,
    chain_id: &ChainId,
) -> Result<[u8; 32], EncodingError> {
    let body = to_bytes(transaction)?;
    let mut hasher = Sha256::new();
    hasher.update(chain_id.as_bytes());
    hasher.update(&body);
    Ok(hasher.finalize().into())
}

/// Hex of the first 20 bytes of `sha256(serialize(tx))`, as the node
/// reports it.
pub fn transaction_id(transaction: &Transaction) -> Result<String, EncodingError> {
    let digest = sha256(&to_bytes(transaction)?);
    Ok(hex::encode(&digest[..20]))
}

/// Sign with every key in order, appending to the signatures already
/// present.
///
/// # Errors
/// Encoding errors if the transaction does not serialize; signature errors
/// if a key exhausts `max_attempts`. Nothing is appended on error.
pub fn sign_transaction(
    transaction: impl Into<SignedTransaction>,
    keys: &[PrivateKey],
    chain_id: &ChainId,
    max_attempts: u32,
) -> Result<SignedTransaction> {
    let mut signed = transaction.into();
    let digest = transaction_digest(&signed.transaction, chain_id)?;

    let signatures = keys
        .iter()
        .map(|key| key.sign_digest(&digest, max_attempts))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        signatures = signatures.len(),
        existing = signed.signatures.len(),
        "transaction signed"
    );
    signed.signatures.extend(signatures);
    Ok(signed)
}
