//! Binary serialization codec.
//!
//! # Data Flow
//! ```text
//! Operation / Transaction (typed, serde for JSON)
//!     → Encode::encode (field order fixed by the chain)
//!     → ByteBuffer (little-endian, varint lengths)
//!     → bytes / hex   (digest input, node hex comparison)
//! ```
//!
//! # Design Decisions
//! - Encode only; the node answers in JSON
//! - Layout is version-less: any byte change breaks every signature
//! - Maps are `Vec<(K, V)>` and keep caller order
//! - Values encode into a private buffer that is discarded on error

/// Implement [`Encode`] for a struct by encoding the listed fields in order.
/// Errors are tagged with the field name.
macro_rules! impl_encode_fields {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::serializer::Encode for $ty {
            #[allow(unused_variables)]
            fn encode(
                &self,
                buf: &mut $crate::serializer::ByteBuffer,
            ) -> Result<(), $crate::error::EncodingError> {
                $(
                    $crate::serializer::Encode::encode(&self.$field, buf)
                        .map_err(|e| e.at(stringify!($field)))?;
                )*
                Ok(())
            }
        }
    };
}

pub(crate) use impl_encode_fields;

pub mod asset;
pub mod buffer;
pub mod operations;
pub mod primitives;
pub mod time;
pub mod transaction;
pub mod types;

pub use asset::{Asset, Price, Symbol};
pub use buffer::ByteBuffer;
pub use operations::Operation;
pub use primitives::{Bytes, StaticVariant};
pub use time::TimePointSec;
pub use transaction::{SignedTransaction, Transaction};
pub use types::{Authority, ChainProperties, LuaValue};

use crate::error::EncodingError;

/// A value with a fixed binary layout on the chain.
pub trait Encode {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError>;
}

/// Encode a value into a fresh byte vector.
pub fn to_bytes<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>, EncodingError> {
    let mut buf = ByteBuffer::with_capacity(128);
    value.encode(&mut buf)?;
    Ok(buf.into_vec())
}

/// Encode a value and hex it, the form `get_transaction_hex` returns.
pub fn to_hex<T: Encode + ?Sized>(value: &T) -> Result<String, EncodingError> {
    to_bytes(value).map(hex::encode)
}
