//! Common paths for inkpot data storage
//!
//! All inkpot data is stored under ~/.config/inkpot/ on all platforms:
//! - config.toml - User configuration
//! - vault.enc - Encrypted access tokens
//! - inkpot.sqlite - Account records

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the inkpot data directory (~/.config/inkpot/)
pub fn inkpot_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = home.join(".config").join("inkpot");
    fs::create_dir_all(&dir).context("Failed to create inkpot directory")?;
    Ok(dir)
}

/// Get the config file path (~/.config/inkpot/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(inkpot_dir()?.join("config.toml"))
}

/// Get the database file path (~/.config/inkpot/inkpot.sqlite)
pub fn database_path() -> Result<PathBuf> {
    Ok(inkpot_dir()?.join("inkpot.sqlite"))
}

/// Get the vault file path (~/.config/inkpot/vault.enc)
pub fn vault_path() -> Result<PathBuf> {
    Ok(inkpot_dir()?.join("vault.enc"))
}
