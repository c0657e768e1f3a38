//! Encoders for scalar, collection and variant building blocks.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EncodingError;
use crate::serializer::{ByteBuffer, Encode};

macro_rules! impl_encode_int {
    ($($ty:ty => $write:ident),* $(,)?) => {
        $(
            impl Encode for $ty {
                fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
                    buf.$write(*self);
                    Ok(())
                }
            }
        )*
    };
}

impl_encode_int! {
    u8 => write_u8,
    u16 => write_u16,
    u32 => write_u32,
    u64 => write_u64,
    i8 => write_i8,
    i16 => write_i16,
    i32 => write_i32,
    i64 => write_i64,
    f64 => write_f64,
}

impl Encode for bool {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        buf.write_u8(u8::from(*self));
        Ok(())
    }
}

impl Encode for str {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        buf.write_prefixed(self.as_bytes());
        Ok(())
    }
}

impl Encode for String {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        self.as_str().encode(buf)
    }
}

/// Arrays and ordered maps (`Vec<(K, V)>`): varint count then each element.
impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        buf.write_varint(self.len() as u64);
        for (index, item) in self.iter().enumerate() {
            item.encode(buf).map_err(|e| e.at(&index.to_string()))?;
        }
        Ok(())
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        match self {
            Some(value) => {
                buf.write_u8(1);
                value.encode(buf)
            }
            None => {
                buf.write_u8(0);
                Ok(())
            }
        }
    }
}

impl<K: Encode, V: Encode> Encode for (K, V) {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        self.0.encode(buf)?;
        self.1.encode(buf)
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        (**self).encode(buf)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        (**self).encode(buf)
    }
}

/// Variable-length binary. Hex in JSON, varint length + raw bytes on the wire.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes({})", hex::encode(&self.0))
    }
}

impl Encode for Bytes {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        buf.write_prefixed(&self.0);
        Ok(())
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text).map(Bytes).map_err(serde::de::Error::custom)
    }
}

/// A tagged union encoded as `varint(index) || payload`.
pub trait StaticVariant {
    /// Position of the active variant in the declared variant list.
    fn variant_index(&self) -> u64;

    /// Encode the active variant's payload, without the discriminant.
    fn encode_payload(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError>;

    fn encode_variant(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        buf.write_varint(self.variant_index());
        self.encode_payload(buf)
    }
}
