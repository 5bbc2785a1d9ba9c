//! Secret vault: access tokens keyed by account id
//!
//! The vault is the only place a token is ever written. Semantics follow a
//! platform keychain: `put` refuses to overwrite, `update` refuses to create.

mod encrypted;

use anyhow::{Result, bail};
use std::collections::HashMap;

use crate::models::AccountId;

pub use encrypted::EncryptedFileVault;

/// Key → secret storage
pub trait SecretVault {
    /// Store a new secret; fails if one already exists for `id`
    fn put(&mut self, id: &AccountId, secret: &str) -> Result<()>;

    /// Load the secret for `id`
    fn get(&self, id: &AccountId) -> Result<Option<String>>;

    /// Replace an existing secret; fails if none exists for `id`
    fn update(&mut self, id: &AccountId, secret: &str) -> Result<()>;

    /// Remove the secret for `id`, returning whether one existed
    fn delete(&mut self, id: &AccountId) -> Result<bool>;

    /// Every id that currently has a secret
    fn ids(&self) -> Result<Vec<AccountId>>;
}

/// In-process vault, used for tests and ephemeral sessions
#[derive(Debug, Default, Clone)]
pub struct MemoryVault {
    secrets: HashMap<AccountId, String>,
}

impl MemoryVault {
    /// Create an empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether no secret is stored
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl SecretVault for MemoryVault {
    fn put(&mut self, id: &AccountId, secret: &str) -> Result<()> {
        if self.secrets.contains_key(id) {
            bail!("secret for {id} already exists");
        }
        self.secrets.insert(*id, secret.to_string());
        Ok(())
    }

    fn get(&self, id: &AccountId) -> Result<Option<String>> {
        Ok(self.secrets.get(id).cloned())
    }

    fn update(&mut self, id: &AccountId, secret: &str) -> Result<()> {
        match self.secrets.get_mut(id) {
            Some(existing) => {
                *existing = secret.to_string();
                Ok(())
            }
            None => bail!("no secret for {id}"),
        }
    }

    fn delete(&mut self, id: &AccountId) -> Result<bool> {
        Ok(self.secrets.remove(id).is_some())
    }

    fn ids(&self) -> Result<Vec<AccountId>> {
        Ok(self.secrets.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keychain_semantics() {
        let mut vault = MemoryVault::new();
        let id = AccountId::new();

        assert!(vault.update(&id, "x").is_err());
        vault.put(&id, "tok1").unwrap();
        assert!(vault.put(&id, "tok2").is_err());
        assert_eq!(vault.get(&id).unwrap().as_deref(), Some("tok1"));

        vault.update(&id, "tok2").unwrap();
        assert_eq!(vault.get(&id).unwrap().as_deref(), Some("tok2"));

        assert!(vault.delete(&id).unwrap());
        assert!(!vault.delete(&id).unwrap());
        assert!(vault.is_empty());
    }
}
