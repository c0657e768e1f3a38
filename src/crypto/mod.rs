//! Keys, digests and signatures.
//!
//! # Responsibilities
//! - WIF encoding and decoding of private and public keys
//! - Deterministic key derivation from a login or a seed
//! - Chain-scoped transaction digests and ids
//! - Canonical ECDSA signing over secp256k1, recovery and verification
//!
//! # Data Flow
//! ```text
//! Transaction ──serialize──▶ bytes
//!   chain_id || bytes ──sha256──▶ digest
//!   digest + PrivateKey ──sign (bounded canonical loop)──▶ Signature
//!   SignedTransaction.signatures.push(signature)
//! ```
//!
//! # Security
//! - Private keys never appear in logs; `Debug` shows a head/tail only
//! - Intermediate buffers holding key material are zeroized on drop
//!
//! Everything here is a pure function of its inputs; there is no shared
//! state. Curve arithmetic is delegated to `secp256k1`.

pub mod digest;
pub mod keys;
pub mod signature;

pub use digest::{
    sign_transaction, transaction_digest, transaction_id, ChainId, DEFAULT_CHAIN_ID,
};
pub use keys::{is_wif, KeyRole, PrivateKey, PublicKey, DEFAULT_ADDRESS_PREFIX};
pub use signature::{is_canonical, Signature, DEFAULT_MAX_SIGN_ATTEMPTS};
