//! Compound value types shared by several operations.

use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::error::EncodingError;
use crate::serializer::{impl_encode_fields, Asset, ByteBuffer, Encode, StaticVariant};

/// Weighted set of accounts and keys that may authorize an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authority {
    pub weight_threshold: u32,
    pub account_auths: Vec<(String, u16)>,
    pub key_auths: Vec<(PublicKey, u16)>,
}

impl Authority {
    /// Single-key authority with threshold 1.
    pub fn from_key(key: PublicKey) -> Self {
        Self {
            weight_threshold: 1,
            account_auths: Vec::new(),
            key_auths: vec![(key, 1)],
        }
    }
}

impl_encode_fields!(Authority {
    weight_threshold,
    account_auths,
    key_auths,
});

/// Chain parameters a siming votes for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainProperties {
    pub account_creation_fee: Asset,
    pub maximum_block_size: u32,
}

impl_encode_fields!(ChainProperties {
    account_creation_fee,
    maximum_block_size,
});

/// Argument passed to a contract function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum LuaValue {
    Nil,
    Bool(bool),
    Int(i64),
    Number(f64),
    String(String),
}

impl StaticVariant for LuaValue {
    fn variant_index(&self) -> u64 {
        match self {
            LuaValue::Nil => 0,
            LuaValue::Bool(_) => 1,
            LuaValue::Int(_) => 2,
            LuaValue::Number(_) => 3,
            LuaValue::String(_) => 4,
        }
    }

    fn encode_payload(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        match self {
            LuaValue::Nil => Ok(()),
            LuaValue::Bool(value) => value.encode(buf),
            LuaValue::Int(value) => value.encode(buf),
            LuaValue::Number(value) => value.encode(buf),
            LuaValue::String(value) => value.encode(buf),
        }
    }
}

impl Encode for LuaValue {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        self.encode_variant(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::to_hex;

    #[test]
    fn test_lua_value_discriminants() {
        assert_eq!(to_hex(&LuaValue::Nil).unwrap(), "00");
        assert_eq!(to_hex(&LuaValue::Bool(true)).unwrap(), "0101");
        assert_eq!(to_hex(&LuaValue::Int(2)).unwrap(), "020200000000000000");
        assert_eq!(to_hex(&LuaValue::String("hi".into())).unwrap(), "04026869");
    }

    #[test]
    fn test_lua_value_json() {
        let value: LuaValue = serde_json::from_str(r#"{"type":"int","value":5}"#).unwrap();
        assert_eq!(value, LuaValue::Int(5));
        assert_eq!(
            serde_json::to_string(&LuaValue::String("x".into())).unwrap(),
            r#"{"type":"string","value":"x"}"#
        );
    }

    #[test]
    fn test_authority_layout() {
        let auth = Authority {
            weight_threshold: 1,
            account_auths: vec![("alice".into(), 1)],
            key_auths: vec![(PublicKey::null(), 1)],
        };
        let hex = to_hex(&auth).unwrap();
        assert!(hex.starts_with("010000000105616c6963650100"));
        assert!(hex.ends_with(&format!("01{}0100", "00".repeat(33))));
    }

    #[test]
    fn test_chain_properties_error_path() {
        let props = ChainProperties {
            account_creation_fee: "1.000 TOOLONGSYM".parse().unwrap(),
            maximum_block_size: 65536,
        };
        let err = to_hex(&props).unwrap_err();
        assert_eq!(err.path(), Some("account_creation_fee"));
    }
}
