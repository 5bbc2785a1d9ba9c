//! Record store: non-secret account rows keyed by account id

use anyhow::Result;

use crate::models::{AccountId, AccountRecord};

/// Durable storage for account metadata
pub trait RecordStore {
    /// Insert or replace the row for `id`
    fn save_account_row(&mut self, id: &AccountId, record: &AccountRecord) -> Result<()>;

    /// Delete the row for `id`, returning whether one existed
    fn delete_account_row(&mut self, id: &AccountId) -> Result<bool>;

    /// All rows in insertion order
    fn fetch_all_account_rows(&self) -> Result<Vec<(AccountId, AccountRecord)>>;
}

/// In-process record store, used for tests and ephemeral sessions
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordStore {
    rows: Vec<(AccountId, AccountRecord)>,
}

impl MemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a single row
    pub fn row(&self, id: &AccountId) -> Option<&AccountRecord> {
        self.rows.iter().find(|(row_id, _)| row_id == id).map(|(_, r)| r)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RecordStore for MemoryRecordStore {
    fn save_account_row(&mut self, id: &AccountId, record: &AccountRecord) -> Result<()> {
        match self.rows.iter_mut().find(|(row_id, _)| row_id == id) {
            Some((_, existing)) => *existing = record.clone(),
            None => self.rows.push((*id, record.clone())),
        }
        Ok(())
    }

    fn delete_account_row(&mut self, id: &AccountId) -> Result<bool> {
        let before = self.rows.len();
        self.rows.retain(|(row_id, _)| row_id != id);
        Ok(self.rows.len() != before)
    }

    fn fetch_all_account_rows(&self) -> Result<Vec<(AccountId, AccountRecord)>> {
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Account;
    use chrono::Utc;

    #[test]
    fn test_upsert_keeps_position() {
        let mut store = MemoryRecordStore::new();
        let (a, b) = (AccountId::new(), AccountId::new());
        store.save_account_row(&a, &Account::new("a").to_record(Utc::now())).unwrap();
        store.save_account_row(&b, &Account::new("b").to_record(Utc::now())).unwrap();
        store.save_account_row(&a, &Account::new("a2").to_record(Utc::now())).unwrap();

        let rows = store.fetch_all_account_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, a);
        assert_eq!(rows[0].1.short_name.as_deref(), Some("a2"));

        assert!(store.delete_account_row(&a).unwrap());
        assert!(!store.delete_account_row(&a).unwrap());
        assert_eq!(store.len(), 1);
    }
}
