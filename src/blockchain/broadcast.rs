//! Transaction building, signing and broadcasting.
//!
//! # Responsibilities
//! - Reference the current head block and set the expiration
//! - Sign with the client's chain id
//! - Broadcast synchronously and return the inclusion point
//!
//! # Data Flow
//! ```text
//! operations
//!     → prepare_transaction (dynamic global properties → ref block, expiration)
//!     → sign (digest over chain id + binary transaction)
//!     → send (broadcast_transaction_synchronous)
//!     → TransactionConfirmation
//! ```

use serde_json::{json, Value};

use crate::blockchain::client::Client;
use crate::blockchain::types::TransactionConfirmation;
use crate::blockchain::wallet::Wallet;
use crate::crypto::{sign_transaction, transaction_id, KeyRole, PrivateKey};
use crate::error::{Error, KeyFormatError};
use crate::serializer::operations::{
    AccountSimingAdoreOperation, CustomJsonOperation, DelegateQiOperation, TransferOperation,
};
use crate::serializer::{Asset, Operation, SignedTransaction, Transaction};
use crate::transport::DEFAULT_API;

/// Builds, signs and sends transactions through a [`Client`].
#[derive(Debug, Clone)]
pub struct Broadcaster {
    client: Client,
}

impl Broadcaster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Wrap `operations` in a transaction referencing the current head block.
    pub async fn prepare_transaction(
        &self,
        operations: Vec<Operation>,
    ) -> Result<Transaction, Error> {
        let props = self.client.get_dynamic_global_properties().await?;
        let transaction = Transaction {
            ref_block_num: props.ref_block_num(),
            ref_block_prefix: props.ref_block_prefix()?,
            expiration: props.time.saturating_add_secs(self.client.expire_secs()),
            operations,
            extensions: Vec::new(),
        };

        tracing::debug!(
            ref_block_num = transaction.ref_block_num,
            ref_block_prefix = transaction.ref_block_prefix,
            expiration = %transaction.expiration,
            operations = transaction.operations.len(),
            "transaction prepared"
        );
        Ok(transaction)
    }

    /// Append a signature per key, using the client's chain id.
    pub fn sign(
        &self,
        transaction: impl Into<SignedTransaction>,
        keys: &[PrivateKey],
    ) -> Result<SignedTransaction, Error> {
        sign_transaction(
            transaction,
            keys,
            self.client.chain_id(),
            self.client.max_sign_attempts(),
        )
    }

    /// Broadcast and wait for the block that includes the transaction.
    pub async fn send(&self, signed: &SignedTransaction) -> Result<TransactionConfirmation, Error> {
        let local_id = transaction_id(&signed.transaction)?;
        let confirmation: TransactionConfirmation = self
            .client
            .call_as(DEFAULT_API, "broadcast_transaction_synchronous", json!([signed]))
            .await?;

        if confirmation.id != local_id {
            tracing::warn!(
                local_id = %local_id,
                node_id = %confirmation.id,
                "node reported a different transaction id"
            );
        }
        tracing::info!(
            id = %confirmation.id,
            block_num = confirmation.block_num,
            trx_num = confirmation.trx_num,
            expired = confirmation.expired,
            "transaction broadcast"
        );
        Ok(confirmation)
    }

    /// Prepare, sign and send in one go.
    pub async fn send_operations(
        &self,
        operations: Vec<Operation>,
        keys: &[PrivateKey],
    ) -> Result<TransactionConfirmation, Error> {
        let transaction = self.prepare_transaction(operations).await?;
        let signed = self.sign(transaction, keys)?;
        self.send(&signed).await
    }

    /// Transfer `amount` from the wallet's account, signed with its active key.
    pub async fn transfer(
        &self,
        wallet: &Wallet,
        to: &str,
        amount: Asset,
        memo: &str,
    ) -> Result<TransactionConfirmation, Error> {
        let op = TransferOperation {
            from: wallet.account().to_string(),
            to: to.to_string(),
            amount,
            memo: memo.to_string(),
        };
        self.send_as(wallet, KeyRole::Active, op.into()).await
    }

    /// Publish a `custom_json` operation. Uses the posting key when the
    /// wallet holds one, the active key otherwise.
    pub async fn custom_json(
        &self,
        wallet: &Wallet,
        id: &str,
        json: &Value,
    ) -> Result<TransactionConfirmation, Error> {
        let account = vec![wallet.account().to_string()];
        let (role, op) = if wallet.key(KeyRole::Posting).is_some() {
            (
                KeyRole::Posting,
                CustomJsonOperation {
                    required_auths: Vec::new(),
                    required_posting_auths: account,
                    id: id.to_string(),
                    json: json.to_string(),
                },
            )
        } else {
            (
                KeyRole::Active,
                CustomJsonOperation {
                    required_auths: account,
                    required_posting_auths: Vec::new(),
                    id: id.to_string(),
                    json: json.to_string(),
                },
            )
        };
        self.send_as(wallet, role, op.into()).await
    }

    pub async fn delegate_qi(
        &self,
        wallet: &Wallet,
        delegatee: &str,
        qi: Asset,
    ) -> Result<TransactionConfirmation, Error> {
        let op = DelegateQiOperation {
            delegator: wallet.account().to_string(),
            delegatee: delegatee.to_string(),
            qi,
        };
        self.send_as(wallet, KeyRole::Active, op.into()).await
    }

    pub async fn account_siming_adore(
        &self,
        wallet: &Wallet,
        siming: &str,
        approve: bool,
    ) -> Result<TransactionConfirmation, Error> {
        let op = AccountSimingAdoreOperation {
            account: wallet.account().to_string(),
            siming: siming.to_string(),
            approve,
        };
        self.send_as(wallet, KeyRole::Active, op.into()).await
    }

    /// The node's own encoding of `transaction`, for comparing with
    /// [`SignedTransaction::to_hex`].
    pub async fn node_transaction_hex(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<String, Error> {
        self.client
            .call_as(DEFAULT_API, "get_transaction_hex", json!([transaction]))
            .await
    }

    async fn send_as(
        &self,
        wallet: &Wallet,
        role: KeyRole,
        operation: Operation,
    ) -> Result<TransactionConfirmation, Error> {
        let key = wallet.key(role).ok_or_else(|| {
            KeyFormatError::InvalidKey(format!(
                "wallet for `{}` holds no {role} key",
                wallet.account()
            ))
        })?;
        tracing::debug!(
            account = wallet.account(),
            role = %role,
            signer = %key.public_key_with_prefix(self.client.address_prefix()),
            operation = operation.name(),
            "signing with wallet key"
        );
        self.send_operations(vec![operation], std::slice::from_ref(key))
            .await
    }
}
