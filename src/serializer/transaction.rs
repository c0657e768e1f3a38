//! Transactions.

use serde::{Deserialize, Serialize};

use crate::crypto::Signature;
use crate::error::EncodingError;
use crate::serializer::{impl_encode_fields, ByteBuffer, Encode, Operation, TimePointSec};

/// An unsigned transaction. Field order is the encoding order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub expiration: TimePointSec,
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl_encode_fields!(Transaction {
    ref_block_num,
    ref_block_prefix,
    expiration,
    operations,
    extensions,
});

impl Transaction {
    pub fn to_hex(&self) -> Result<String, EncodingError> {
        crate::serializer::to_hex(self)
    }
}

/// A transaction plus the signatures collected so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

impl SignedTransaction {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            signatures: Vec::new(),
        }
    }

    pub fn to_hex(&self) -> Result<String, EncodingError> {
        crate::serializer::to_hex(self)
    }
}

impl From<Transaction> for SignedTransaction {
    fn from(transaction: Transaction) -> Self {
        SignedTransaction::new(transaction)
    }
}

impl Encode for SignedTransaction {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        self.transaction.encode(buf)?;
        buf.write_varint(self.signatures.len() as u64);
        for signature in &self.signatures {
            buf.write_bytes(&signature.to_bytes());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::operations::TransferOperation;
    use serde_json::json;

    fn sample() -> Transaction {
        Transaction {
            ref_block_num: 1234,
            ref_block_prefix: 1_122_334_455,
            expiration: "2020-01-01T00:00:00".parse().unwrap(),
            operations: vec![TransferOperation {
                from: "initminer".into(),
                to: "initminer".into(),
                amount: "1.000000 QI".parse().unwrap(),
                memo: "test".into(),
            }
            .into()],
            extensions: vec![],
        }
    }

    #[test]
    fn test_transaction_golden() {
        assert_eq!(
            sample().to_hex().unwrap(),
            "d204f776e54200e10b5e010209696e69746d696e657209696e69746d696e657240420f00000000000651490000000000047465737400"
        );
    }

    #[test]
    fn test_unsigned_signed_transaction_appends_empty_list() {
        let signed = SignedTransaction::new(sample());
        assert_eq!(
            signed.to_hex().unwrap(),
            format!("{}00", sample().to_hex().unwrap())
        );
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(SignedTransaction::new(sample())).unwrap();
        assert_eq!(value["ref_block_num"], json!(1234));
        assert_eq!(value["expiration"], json!("2020-01-01T00:00:00"));
        assert_eq!(value["operations"][0][0], json!("transfer"));
        assert_eq!(value["signatures"], json!([]));

        let back: SignedTransaction = serde_json::from_value(value).unwrap();
        assert_eq!(back.transaction, sample());
    }
}
