//! Account keys.
//!
//! # Security
//! - Keys come from a login, a WIF string, or the environment
//! - Keys are never logged or serialized; only public keys are
//! - `Debug` shows the account and roles, not the keys

use std::collections::BTreeMap;
use std::fmt;

use crate::crypto::{KeyRole, PrivateKey, PublicKey};
use crate::error::KeyFormatError;

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "TAIYI_PRIVATE_KEY";

/// Environment variable name for the account.
pub const ACCOUNT_ENV_VAR: &str = "TAIYI_ACCOUNT";

/// An account name plus the private keys held for it, by role.
#[derive(Clone)]
pub struct Wallet {
    account: String,
    keys: BTreeMap<KeyRole, PrivateKey>,
}

impl Wallet {
    /// Derive every role's key from an account name and password.
    ///
    /// # Security
    /// The password is only used for derivation and not kept.
    pub fn from_login(account: &str, password: &str) -> Result<Self, KeyFormatError> {
        let keys = KeyRole::ALL
            .iter()
            .map(|role| Ok((*role, PrivateKey::from_login(account, password, *role)?)))
            .collect::<Result<BTreeMap<_, _>, KeyFormatError>>()?;

        tracing::info!(account, roles = keys.len(), "wallet derived from login");
        Ok(Self {
            account: account.to_string(),
            keys,
        })
    }

    /// Hold a single WIF key for `role`.
    pub fn from_wif(account: &str, wif: &str, role: KeyRole) -> Result<Self, KeyFormatError> {
        let key = PrivateKey::from_wif(wif)?;
        tracing::info!(account, role = %role, "wallet loaded from wif");
        Ok(Self {
            account: account.to_string(),
            keys: BTreeMap::from([(role, key)]),
        })
    }

    /// Load the active key from `TAIYI_PRIVATE_KEY`.
    ///
    /// The account comes from `TAIYI_ACCOUNT` when `account` is `None`.
    pub fn from_env(account: Option<&str>) -> Result<Self, KeyFormatError> {
        let wif = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            KeyFormatError::InvalidKey(format!(
                "environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;
        let account = match account {
            Some(account) => account.to_string(),
            None => std::env::var(ACCOUNT_ENV_VAR).unwrap_or_default(),
        };
        Self::from_wif(&account, &wif, KeyRole::Active)
    }

    /// Add or replace the key for `role`.
    pub fn with_key(mut self, role: KeyRole, key: PrivateKey) -> Self {
        self.keys.insert(role, key);
        self
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn key(&self, role: KeyRole) -> Option<&PrivateKey> {
        self.keys.get(&role)
    }

    pub fn public_key(&self, role: KeyRole, prefix: &str) -> Option<PublicKey> {
        self.key(role).map(|key| key.public_key_with_prefix(prefix))
    }

    pub fn roles(&self) -> impl Iterator<Item = KeyRole> + '_ {
        self.keys.keys().copied()
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("account", &self.account)
            .field("roles", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_login_derives_every_role() {
        let wallet = Wallet::from_login("foo", "barman").unwrap();
        assert_eq!(wallet.account(), "foo");
        assert_eq!(wallet.roles().count(), KeyRole::ALL.len());
        assert_eq!(
            wallet.key(KeyRole::Active),
            Some(&PrivateKey::from_login("foo", "barman", KeyRole::Active).unwrap())
        );
        assert_ne!(wallet.key(KeyRole::Active), wallet.key(KeyRole::Posting));
    }

    #[test]
    fn test_from_wif_holds_one_role() {
        let key = PrivateKey::from_seed("hello").unwrap();
        let wallet = Wallet::from_wif("alice", &key.to_wif(), KeyRole::Posting).unwrap();
        assert_eq!(wallet.key(KeyRole::Posting), Some(&key));
        assert!(wallet.key(KeyRole::Active).is_none());
        assert_eq!(
            wallet.public_key(KeyRole::Posting, "TAI"),
            Some(key.public_key())
        );
    }

    #[test]
    fn test_invalid_wif() {
        assert!(Wallet::from_wif("alice", "not-a-key", KeyRole::Active).is_err());
    }

    #[test]
    fn test_debug_hides_keys() {
        let key = PrivateKey::from_seed("hello").unwrap();
        let wallet = Wallet::from_wif("alice", &key.to_wif(), KeyRole::Active).unwrap();
        let debug = format!("{wallet:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains(&key.to_wif()));
    }

    #[test]
    fn test_from_env() {
        let key = PrivateKey::from_seed("env").unwrap();
        std::env::set_var(PRIVATE_KEY_ENV_VAR, key.to_wif());
        let wallet = Wallet::from_env(Some("bob")).unwrap();
        std::env::remove_var(PRIVATE_KEY_ENV_VAR);
        assert_eq!(wallet.account(), "bob");
        assert_eq!(wallet.key(KeyRole::Active), Some(&key));
    }
}
