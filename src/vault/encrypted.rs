//! Encrypted file-based vault
//!
//! Secrets live in ~/.config/inkpot/vault.enc, encrypted with AES-256-GCM.
//! The encryption key is derived from machine-specific identifiers.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, Result, bail};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::SecretVault;
use crate::models::AccountId;
use crate::paths;

const NONCE_SIZE: usize = 12;

/// Vault backed by a single AES-256-GCM encrypted JSON map
#[derive(Debug, Clone)]
pub struct EncryptedFileVault {
    path: PathBuf,
    key: [u8; 32],
}

impl EncryptedFileVault {
    /// Open the vault at the default location
    pub fn open() -> Result<Self> {
        Ok(Self::at_path(paths::vault_path()?))
    }

    /// Open the vault at a specific path with the machine-derived key
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self::with_key(path, derive_key())
    }

    /// Open the vault at a specific path with an explicit key
    pub fn with_key(path: impl Into<PathBuf>, key: [u8; 32]) -> Self {
        Self {
            path: path.into(),
            key,
        }
    }

    /// Location of the encrypted file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|_| anyhow::anyhow!("Invalid key length"))
    }

    /// Load all secrets from the encrypted file
    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let encrypted = fs::read(&self.path).context("Failed to read vault file")?;

        if encrypted.len() < NONCE_SIZE {
            return Ok(BTreeMap::new());
        }

        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher()?
            .decrypt(nonce, ciphertext)
            .map_err(|_| anyhow::anyhow!("Failed to decrypt vault"))?;

        let json = String::from_utf8(plaintext).context("Invalid UTF-8 in vault")?;
        serde_json::from_str(&json).context("Corrupted vault contents")
    }

    /// Save all secrets to the encrypted file
    fn save(&self, secrets: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create vault directory")?;
        }

        let json = serde_json::to_string(secrets)?;

        let mut rng = rand::rng();
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rng.fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(nonce, json.as_bytes())
            .map_err(|_| anyhow::anyhow!("Failed to encrypt vault"))?;

        let mut output = nonce_bytes.to_vec();
        output.extend(ciphertext);

        fs::write(&self.path, output).context("Failed to write vault file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

impl SecretVault for EncryptedFileVault {
    fn put(&mut self, id: &AccountId, secret: &str) -> Result<()> {
        let mut secrets = self.load()?;
        let key = id.to_string();
        if secrets.contains_key(&key) {
            bail!("secret for {id} already exists");
        }
        secrets.insert(key, secret.to_string());
        self.save(&secrets)
    }

    fn get(&self, id: &AccountId) -> Result<Option<String>> {
        Ok(self.load()?.remove(&id.to_string()))
    }

    fn update(&mut self, id: &AccountId, secret: &str) -> Result<()> {
        let mut secrets = self.load()?;
        match secrets.get_mut(&id.to_string()) {
            Some(existing) => *existing = secret.to_string(),
            None => bail!("no secret for {id}"),
        }
        self.save(&secrets)
    }

    fn delete(&mut self, id: &AccountId) -> Result<bool> {
        let mut secrets = self.load()?;
        let existed = secrets.remove(&id.to_string()).is_some();
        if existed {
            self.save(&secrets)?;
        }
        Ok(existed)
    }

    fn ids(&self) -> Result<Vec<AccountId>> {
        let secrets = self.load()?;
        let mut ids = Vec::with_capacity(secrets.len());
        for key in secrets.keys() {
            match key.parse() {
                Ok(id) => ids.push(id),
                Err(_) => tracing::warn!("Ignoring malformed vault key"),
            }
        }
        Ok(ids)
    }
}

/// Get machine ID for key derivation (cross-platform)
fn get_machine_id() -> String {
    #[cfg(target_os = "linux")]
    {
        if let Ok(id) = fs::read_to_string("/etc/machine-id") {
            return id.trim().to_string();
        }
        if let Ok(id) = fs::read_to_string("/var/lib/dbus/machine-id") {
            return id.trim().to_string();
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(output) = std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                if line.contains("IOPlatformUUID") {
                    if let Some(uuid) = line.split('"').nth(3) {
                        return uuid.to_string();
                    }
                }
            }
        }
    }

    // Fallback: home directory path
    dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "inkpot-fallback-key".to_string())
}

/// Derive the vault key from machine-specific data
fn derive_key() -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(get_machine_id().as_bytes());

    if let Some(home) = dirs::home_dir() {
        hasher.update(home.to_string_lossy().as_bytes());
    }

    hasher.update(b"inkpot-telegraph-vault-v1");

    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_secrets_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.enc");
        let id = AccountId::new();

        let mut vault = EncryptedFileVault::with_key(&path, [7u8; 32]);
        vault.put(&id, "tok1").unwrap();

        let reopened = EncryptedFileVault::with_key(&path, [7u8; 32]);
        assert_eq!(reopened.get(&id).unwrap().as_deref(), Some("tok1"));
        assert_eq!(reopened.ids().unwrap(), vec![id]);
    }

    #[test]
    fn test_file_is_not_plaintext() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.enc");
        let mut vault = EncryptedFileVault::with_key(&path, [1u8; 32]);
        vault.put(&AccountId::new(), "very-secret-token").unwrap();

        let raw = fs::read(&path).unwrap();
        let needle = b"very-secret-token";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_wrong_key_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.enc");
        let id = AccountId::new();
        EncryptedFileVault::with_key(&path, [1u8; 32])
            .put(&id, "tok")
            .unwrap();

        let other = EncryptedFileVault::with_key(&path, [2u8; 32]);
        assert!(other.get(&id).is_err());
    }

    #[test]
    fn test_update_and_delete() {
        let dir = tempdir().unwrap();
        let mut vault = EncryptedFileVault::with_key(dir.path().join("v.enc"), [3u8; 32]);
        let id = AccountId::new();

        assert!(vault.update(&id, "x").is_err());
        vault.put(&id, "a").unwrap();
        vault.update(&id, "b").unwrap();
        assert_eq!(vault.get(&id).unwrap().as_deref(), Some("b"));
        assert!(vault.delete(&id).unwrap());
        assert_eq!(vault.get(&id).unwrap(), None);
    }
}
