//! Database module for `SQLite` storage of account records

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::Path;

use crate::models::{AccountId, AccountRecord};
use crate::paths;
use crate::records::RecordStore;

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database at the default location
    pub fn open() -> Result<Self> {
        let path = paths::database_path()?;
        Self::open_path(&path)
    }

    /// Open or create the database at a specific path
    pub fn open_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }

        let conn = Connection::open(path).context("Failed to open database")?;

        let db = Self { conn };
        db.init()?;

        Ok(db)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            -- Accounts table (tokens live in the vault, never here)
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                short_name TEXT,
                author_name TEXT,
                author_url TEXT,
                page_count INTEGER,
                created_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    /// Helper to convert a row to an id/record pair
    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(AccountId, AccountRecord)> {
        let id_str: String = row.get(0)?;
        let id = id_str.parse::<AccountId>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let created_str: String = row.get(5)?;
        let created_at = DateTime::parse_from_rfc3339(&created_str)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
            })?
            .with_timezone(&Utc);

        Ok((
            id,
            AccountRecord {
                short_name: row.get(1)?,
                author_name: row.get(2)?,
                author_url: row.get(3)?,
                page_count: row.get(4)?,
                created_at,
            },
        ))
    }
}

impl RecordStore for Database {
    fn save_account_row(&mut self, id: &AccountId, record: &AccountRecord) -> Result<()> {
        self.conn
            .execute(
                r"INSERT INTO accounts (id, short_name, author_name, author_url, page_count, created_at)
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                  ON CONFLICT(id) DO UPDATE SET
                      short_name = excluded.short_name,
                      author_name = excluded.author_name,
                      author_url = excluded.author_url,
                      page_count = excluded.page_count",
                params![
                    id.to_string(),
                    record.short_name,
                    record.author_name,
                    record.author_url,
                    record.page_count,
                    record.created_at.to_rfc3339(),
                ],
            )
            .context("Failed to save account row")?;
        Ok(())
    }

    fn delete_account_row(&mut self, id: &AccountId) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM accounts WHERE id = ?1", params![id.to_string()])
            .context("Failed to delete account row")?;
        Ok(count > 0)
    }

    fn fetch_all_account_rows(&self) -> Result<Vec<(AccountId, AccountRecord)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, short_name, author_name, author_url, page_count, created_at
             FROM accounts ORDER BY rowid",
        )?;

        let rows = stmt.query_map([], Self::row_to_record)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
