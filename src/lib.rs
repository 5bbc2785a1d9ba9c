//! # inkpot
//!
//! A local-first account and page manager for Telegra.ph.
//!
//! ## Overview
//!
//! inkpot keeps any number of Telegraph accounts on this machine. Access
//! tokens go to an encrypted vault, metadata goes to `SQLite`, and the
//! Telegraph API stays the source of truth that accounts are refreshed from.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        AccountStore                         │
//! │   CRUD, current selection, refresh, rollback, reconcile     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │   SecretVault   │ │   RecordStore   │ │   TelegraphApi  │
//! │                 │ │                 │ │                 │
//! │ • Tokens only   │ │ • Metadata rows │ │ • Methods       │
//! │ • AES-256-GCM   │ │ • SQLite        │ │ • Envelope      │
//! │ • put/update    │ │ • Upsert        │ │ • HTTPS         │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Telegraph methods, envelope decoding, HTTPS transport
//! - [`config`] - Configuration management
//! - [`db`] - `SQLite` record store
//! - [`error`] - Typed store and API errors
//! - [`models`] - Account, page, and content node models
//! - [`records`] - Record store trait
//! - [`store`] - The account store
//! - [`sync`] - Refresh over a shared store
//! - [`vault`] - Secret vault trait and encrypted file vault
//!
//! ## Example
//!
//! ```no_run
//! use inkpot::{AccountStore, Database, EncryptedFileVault};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut store = AccountStore::initialize(EncryptedFileVault::open()?, Database::open()?)?;
//!     store.reconcile()?;
//!     if let Some(id) = store.id_at(0) {
//!         store.select(&id)?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::return_self_not_must_use)]

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod paths;
pub mod records;
pub mod store;
pub mod sync;
pub mod vault;

// Re-export main types for convenience
pub use api::{HttpClient, Method, TelegraphApi};
pub use config::Config;
pub use db::Database;
pub use error::{ApiError, StoreError, StoreResult};
pub use models::{Account, AccountChanges, AccountId, AccountRecord, Node, Page, PageList};
pub use records::{MemoryRecordStore, RecordStore};
pub use store::{AccountStore, EditOutcome, ReconcileReport, RefreshTicket};
pub use vault::{EncryptedFileVault, MemoryVault, SecretVault};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
