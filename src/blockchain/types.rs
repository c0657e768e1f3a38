//! Node response types.

use serde::{Deserialize, Serialize};

use crate::error::EncodingError;
use crate::serializer::{Asset, TimePointSec};

/// Subset of `get_dynamic_global_properties` needed to build and inspect
/// transactions. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicGlobalProperties {
    pub head_block_number: u32,
    pub head_block_id: String,
    pub time: TimePointSec,
    #[serde(default)]
    pub current_siming: String,
    #[serde(default)]
    pub last_irreversible_block_num: u32,
    #[serde(default)]
    pub current_supply: Option<Asset>,
    #[serde(default)]
    pub total_qi: Option<Asset>,
}

impl DynamicGlobalProperties {
    /// Low 16 bits of the head block number.
    pub fn ref_block_num(&self) -> u16 {
        (self.head_block_number & 0xFFFF) as u16
    }

    /// Bytes 4..8 of the head block id, read as a little-endian u32.
    pub fn ref_block_prefix(&self) -> Result<u32, EncodingError> {
        let invalid = |message: String| EncodingError::InvalidField {
            path: "head_block_id".to_string(),
            message,
        };
        let bytes = hex::decode(&self.head_block_id).map_err(|e| invalid(e.to_string()))?;
        let prefix: [u8; 4] = bytes
            .get(4..8)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| invalid(format!("expected at least 8 bytes, found {}", bytes.len())))?;
        Ok(u32::from_le_bytes(prefix))
    }
}

/// Result of `broadcast_transaction_synchronous`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfirmation {
    pub id: String,
    pub block_num: u32,
    pub trx_num: u32,
    #[serde(default)]
    pub expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props() -> DynamicGlobalProperties {
        serde_json::from_value(json!({
            "head_block_number": 2603,
            "head_block_id": "00000a2b7f1c5e6d0123456789abcdef01234567",
            "time": "2020-01-01T00:00:00",
            "current_siming": "initminer",
            "unknown_field": [1, 2, 3]
        }))
        .unwrap()
    }

    #[test]
    fn test_reference_block_fields() {
        let props = props();
        assert_eq!(props.ref_block_num(), 2603);
        assert_eq!(props.ref_block_prefix().unwrap(), 1834884223);
        assert_eq!(props.time.secs(), 1577836800);
    }

    #[test]
    fn test_ref_block_num_wraps() {
        let mut props = props();
        props.head_block_number = 0x0001_0005;
        assert_eq!(props.ref_block_num(), 5);
    }

    #[test]
    fn test_short_block_id_rejected() {
        let mut props = props();
        props.head_block_id = "00000a2b".to_string();
        let err = props.ref_block_prefix().unwrap_err();
        assert_eq!(err.path(), Some("head_block_id"));
    }

    #[test]
    fn test_confirmation_defaults_expired() {
        let confirmation: TransactionConfirmation =
            serde_json::from_value(json!({"id": "abc", "block_num": 10, "trx_num": 0})).unwrap();
        assert!(!confirmation.expired);
    }
}
