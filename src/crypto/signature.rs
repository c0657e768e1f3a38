//! Compact recoverable signatures and the canonical signing loop.

use std::fmt;
use std::str::FromStr;

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, SecretKey, SECP256K1};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::digest::sha256;
use crate::crypto::PublicKey;
use crate::error::SignatureError;

/// Signing gives up after this many non-canonical candidates by default.
pub const DEFAULT_MAX_SIGN_ATTEMPTS: u32 = 64;

/// Added to the recovery id in the first byte of the 65-byte form
/// (27 + 4 for compressed keys).
const RECOVERY_OFFSET: u8 = 31;

/// A 64-byte compact `(r, s)` plus its recovery id.
///
/// Wire and JSON form: `recovery_id + 31 || r || s`, hex in JSON.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    recovery_id: u8,
    compact: [u8; 64],
}

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != 65 {
            return Err(SignatureError::Malformed(format!(
                "expected 65 bytes, found {}",
                bytes.len()
            )));
        }
        // Older encoders used 27 + id; accept both.
        let recovery_id = match bytes[0] {
            b @ 31..=34 => b - RECOVERY_OFFSET,
            b @ 27..=30 => b - 27,
            b => {
                return Err(SignatureError::Malformed(format!(
                    "invalid recovery byte {b}"
                )))
            }
        };
        let mut compact = [0u8; 64];
        compact.copy_from_slice(&bytes[1..]);
        Ok(Self {
            recovery_id,
            compact,
        })
    }

    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[0] = self.recovery_id + RECOVERY_OFFSET;
        out[1..].copy_from_slice(&self.compact);
        out
    }

    pub fn recovery_id(&self) -> u8 {
        self.recovery_id
    }

    pub fn compact(&self) -> &[u8; 64] {
        &self.compact
    }

    pub fn is_canonical(&self) -> bool {
        is_canonical(&self.compact)
    }

    /// Recover the signing key from `digest`.
    pub fn recover(&self, digest: &[u8; 32]) -> Result<PublicKey, SignatureError> {
        let recoverable = self.to_recoverable()?;
        let message = message(digest)?;
        SECP256K1
            .recover_ecdsa(&message, &recoverable)
            .map(PublicKey::from_point)
            .map_err(|e| SignatureError::Recovery(e.to_string()))
    }

    pub fn verify(&self, digest: &[u8; 32], key: &PublicKey) -> bool {
        let (Some(point), Ok(recoverable), Ok(message)) =
            (key.point(), self.to_recoverable(), message(digest))
        else {
            return false;
        };
        SECP256K1
            .verify_ecdsa(&message, &recoverable.to_standard(), point)
            .is_ok()
    }

    fn to_recoverable(&self) -> Result<RecoverableSignature, SignatureError> {
        let id = RecoveryId::from_i32(i32::from(self.recovery_id))
            .map_err(|e| SignatureError::Malformed(e.to_string()))?;
        RecoverableSignature::from_compact(&self.compact, id)
            .map_err(|e| SignatureError::Malformed(e.to_string()))
    }
}

/// The chain accepts a signature only when neither `r` nor `s` has its
/// high bit set or a redundant leading zero byte.
pub fn is_canonical(compact: &[u8; 64]) -> bool {
    let (r, s) = compact.split_at(32);
    is_canonical_half(r) && is_canonical_half(s)
}

fn is_canonical_half(half: &[u8]) -> bool {
    half[0] & 0x80 == 0 && !(half[0] == 0 && half[1] & 0x80 == 0)
}

fn message(digest: &[u8; 32]) -> Result<Message, SignatureError> {
    Message::from_slice(digest).map_err(|e| SignatureError::Malformed(e.to_string()))
}

/// Extra entropy for attempt `n`: `sha256(digest || n as u32 LE)`.
fn attempt_nonce(digest: &[u8; 32], attempt: u32) -> [u8; 32] {
    let mut data = [0u8; 36];
    data[..32].copy_from_slice(digest);
    data[32..].copy_from_slice(&attempt.to_le_bytes());
    sha256(&data)
}

/// Sign until a canonical signature comes out, at most `max_attempts` times.
pub(crate) fn sign_canonical(
    digest: &[u8; 32],
    secret: &SecretKey,
    max_attempts: u32,
) -> Result<Signature, SignatureError> {
    let message = message(digest)?;
    for attempt in 0..max_attempts {
        let nonce = attempt_nonce(digest, attempt);
        let (id, compact) = SECP256K1
            .sign_ecdsa_recoverable_with_noncedata(&message, secret, &nonce)
            .serialize_compact();
        if is_canonical(&compact) {
            tracing::trace!(attempt, "canonical signature found");
            return Ok(Signature {
                recovery_id: id.to_i32() as u8,
                compact,
            });
        }
    }
    tracing::warn!(attempts = max_attempts, "no canonical signature found");
    Err(SignatureError::AttemptsExhausted {
        attempts: max_attempts,
    })
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| SignatureError::Malformed(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
