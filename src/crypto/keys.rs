//! Private and public keys in the chain's WIF conventions.

use std::fmt;
use std::str::FromStr;

use secp256k1::SecretKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::crypto::digest::{double_sha256, ripemd160, sha256};
use crate::crypto::signature::{self, Signature};
use crate::error::{EncodingError, KeyFormatError, SignatureError};
use crate::serializer::{ByteBuffer, Encode};

/// Address prefix used when none is configured.
pub const DEFAULT_ADDRESS_PREFIX: &str = "TAI";

/// Leading byte of every private key payload.
const NETWORK_ID: u8 = 0x80;

/// Body of the placeholder the chain uses for "no key".
const NULL_KEY_BODY: &str = "1111111111111111111111111111111114T1Anm";

const POINT_LEN: usize = 33;
const SCALAR_LEN: usize = 32;
const CHECKSUM_LEN: usize = 4;

/// Account authority a derived key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    Owner,
    Active,
    Posting,
    Memo,
}

impl KeyRole {
    pub const ALL: [KeyRole; 4] = [
        KeyRole::Owner,
        KeyRole::Active,
        KeyRole::Posting,
        KeyRole::Memo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            KeyRole::Owner => "owner",
            KeyRole::Active => "active",
            KeyRole::Posting => "posting",
            KeyRole::Memo => "memo",
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyRole {
    type Err = KeyFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| KeyFormatError::InvalidKey(format!("unknown key role `{s}`")))
    }
}

/// A secp256k1 secret scalar.
///
/// # Security
/// Never printed in full. `Debug` shows the first and last three
/// characters of the WIF form.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    secret: SecretKey,
}

impl PrivateKey {
    /// Decode a WIF private key.
    ///
    /// Verifies length, checksum and network id, in that order.
    pub fn from_wif(wif: &str) -> Result<Self, KeyFormatError> {
        let decoded = Zeroizing::new(
            bs58::decode(wif)
                .into_vec()
                .map_err(|e| KeyFormatError::Base58(e.to_string()))?,
        );
        let expected = 1 + SCALAR_LEN + CHECKSUM_LEN;
        if decoded.len() != expected {
            return Err(KeyFormatError::Length {
                expected,
                found: decoded.len(),
            });
        }

        let (payload, checksum) = decoded.split_at(1 + SCALAR_LEN);
        if double_sha256(payload)[..CHECKSUM_LEN] != *checksum {
            return Err(KeyFormatError::Checksum);
        }
        if payload[0] != NETWORK_ID {
            return Err(KeyFormatError::NetworkId { found: payload[0] });
        }
        Self::from_bytes(&payload[1..])
    }

    /// Wrap a raw 32-byte scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyFormatError> {
        if bytes.len() != SCALAR_LEN {
            return Err(KeyFormatError::Length {
                expected: SCALAR_LEN,
                found: bytes.len(),
            });
        }
        SecretKey::from_slice(bytes)
            .map(|secret| Self { secret })
            .map_err(|e| KeyFormatError::InvalidKey(e.to_string()))
    }

    /// `sha256(seed)` as the secret.
    pub fn from_seed(seed: &str) -> Result<Self, KeyFormatError> {
        let digest = Zeroizing::new(sha256(seed.as_bytes()));
        Self::from_bytes(digest.as_slice())
    }

    /// Derive the key for `role` from an account name and password.
    ///
    /// The seed is `username + role + password`, the same derivation the
    /// chain's own wallets use.
    pub fn from_login(
        username: &str,
        password: &str,
        role: KeyRole,
    ) -> Result<Self, KeyFormatError> {
        let seed = Zeroizing::new(format!("{username}{role}{password}"));
        Self::from_seed(&seed)
    }

    /// A fresh key from the OS random source.
    pub fn generate() -> Self {
        let mut rng = secp256k1::rand::thread_rng();
        Self {
            secret: SecretKey::new(&mut rng),
        }
    }

    pub fn to_wif(&self) -> String {
        let mut payload = Zeroizing::new(Vec::with_capacity(1 + SCALAR_LEN + CHECKSUM_LEN));
        payload.push(NETWORK_ID);
        payload.extend_from_slice(&self.secret.secret_bytes());
        let checksum = double_sha256(&payload);
        payload.extend_from_slice(&checksum[..CHECKSUM_LEN]);
        bs58::encode(payload.as_slice()).into_string()
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key_with_prefix(DEFAULT_ADDRESS_PREFIX)
    }

    pub fn public_key_with_prefix(&self, prefix: &str) -> PublicKey {
        PublicKey {
            key: Some(secp256k1::PublicKey::from_secret_key_global(&self.secret)),
            prefix: prefix.to_string(),
        }
    }

    /// Sign a 32-byte digest, retrying until the signature is canonical.
    pub fn sign_digest(
        &self,
        digest: &[u8; 32],
        max_attempts: u32,
    ) -> Result<Signature, SignatureError> {
        signature::sign_canonical(digest, &self.secret, max_attempts)
    }
}

impl FromStr for PrivateKey {
    type Err = KeyFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wif(s)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wif = Zeroizing::new(self.to_wif());
        write!(f, "PrivateKey({}…{})", &wif[..3], &wif[wif.len() - 3..])
    }
}

/// Whether `input` decodes as a WIF private key.
pub fn is_wif(input: &str) -> bool {
    PrivateKey::from_wif(input).is_ok()
}

/// A compressed secp256k1 point with its address prefix, or the null key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// `None` is the chain's "no key" placeholder.
    key: Option<secp256k1::PublicKey>,
    prefix: String,
}

impl PublicKey {
    /// The null key with the default prefix.
    pub fn null() -> Self {
        Self {
            key: None,
            prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.key.is_none()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn with_prefix(&self, prefix: &str) -> Self {
        Self {
            key: self.key,
            prefix: prefix.to_string(),
        }
    }

    /// Parse `<prefix><base58>` and require the given prefix.
    pub fn from_wif_with_prefix(input: &str, prefix: &str) -> Result<Self, KeyFormatError> {
        let Some(body) = input.strip_prefix(prefix) else {
            return Err(KeyFormatError::Prefix {
                expected: prefix.to_string(),
                found: input.chars().take(prefix.chars().count()).collect(),
            });
        };
        if body == NULL_KEY_BODY {
            return Ok(Self {
                key: None,
                prefix: prefix.to_string(),
            });
        }

        let decoded = bs58::decode(body)
            .into_vec()
            .map_err(|e| KeyFormatError::Base58(e.to_string()))?;
        let expected = POINT_LEN + CHECKSUM_LEN;
        if decoded.len() != expected {
            return Err(KeyFormatError::Length {
                expected,
                found: decoded.len(),
            });
        }
        let (point, checksum) = decoded.split_at(POINT_LEN);
        if ripemd160(point)[..CHECKSUM_LEN] != *checksum {
            return Err(KeyFormatError::Checksum);
        }
        Self::from_bytes(point, prefix)
    }

    /// Wrap a 33-byte compressed point. All zeroes is the null key.
    pub fn from_bytes(bytes: &[u8], prefix: &str) -> Result<Self, KeyFormatError> {
        if bytes.len() != POINT_LEN {
            return Err(KeyFormatError::Length {
                expected: POINT_LEN,
                found: bytes.len(),
            });
        }
        let key = if bytes.iter().all(|b| *b == 0) {
            None
        } else {
            let point = secp256k1::PublicKey::from_slice(bytes)
                .map_err(|e| KeyFormatError::InvalidKey(e.to_string()))?;
            Some(point)
        };
        Ok(Self {
            key,
            prefix: prefix.to_string(),
        })
    }

    pub(crate) fn from_point(point: secp256k1::PublicKey) -> Self {
        Self {
            key: Some(point),
            prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
        }
    }

    /// Compressed point, or 33 zero bytes for the null key.
    pub fn to_bytes(&self) -> [u8; POINT_LEN] {
        self.key.map(|key| key.serialize()).unwrap_or([0u8; POINT_LEN])
    }

    pub(crate) fn point(&self) -> Option<&secp256k1::PublicKey> {
        self.key.as_ref()
    }

    /// Check `signature` over `digest` against this key. The null key
    /// verifies nothing.
    pub fn verify(&self, digest: &[u8; 32], signature: &Signature) -> bool {
        signature.verify(digest, self)
    }
}

/// Parses keys with any three-letter uppercase prefix; use
/// [`PublicKey::from_wif_with_prefix`] to pin one.
impl FromStr for PublicKey {
    type Err = KeyFormatError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let prefix_len = DEFAULT_ADDRESS_PREFIX.len();
        match input.get(..prefix_len) {
            Some(prefix) if prefix.bytes().all(|b| b.is_ascii_uppercase()) => {
                Self::from_wif_with_prefix(input, prefix)
            }
            _ => Err(KeyFormatError::Prefix {
                expected: DEFAULT_ADDRESS_PREFIX.to_string(),
                found: input.chars().take(prefix_len).collect(),
            }),
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            None => write!(f, "{}{}", self.prefix, NULL_KEY_BODY),
            Some(key) => {
                let point = key.serialize();
                let mut payload = Vec::with_capacity(POINT_LEN + CHECKSUM_LEN);
                payload.extend_from_slice(&point);
                payload.extend_from_slice(&ripemd160(&point)[..CHECKSUM_LEN]);
                write!(f, "{}{}", self.prefix, bs58::encode(payload).into_string())
            }
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl Encode for PublicKey {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        buf.write_bytes(&self.to_bytes());
        Ok(())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
