//! Registry entries and their token/metadata lifecycle

use chrono::{DateTime, Utc};

use crate::models::{Account, AccountId, AccountRecord};

/// One account known to the store.
///
/// `revision` increases on every local change that alters state. Refreshes
/// compare it to detect edits that happened while they were in flight.
/// `persisted` is the row as last written to the record store, which can lag
/// behind `account` after a refresh.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub id: AccountId,
    pub account: Account,
    pub created_at: DateTime<Utc>,
    pub revision: u64,
    pub persisted: AccountRecord,
}

/// What applying a new account value would change
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Changes {
    /// New token, if it differs byte for byte from the cached one
    pub token: Option<String>,
    /// New record, if it differs from the stored row
    pub record: Option<AccountRecord>,
}

impl Entry {
    pub fn new(id: AccountId, account: Account, created_at: DateTime<Utc>) -> Self {
        let persisted = account.to_record(created_at);
        Self {
            id,
            account,
            created_at,
            revision: 0,
            persisted,
        }
    }

    /// Rebuild an entry from its record row and vault secret
    pub fn rehydrate(id: AccountId, record: &AccountRecord, token: String) -> Self {
        Self::new(id, Account::from_record(record, token), record.created_at)
    }

    pub fn token(&self) -> Option<&str> {
        self.account.access_token.as_deref()
    }

    pub fn record(&self) -> AccountRecord {
        self.account.to_record(self.created_at)
    }

    /// Merge `incoming` over the current value without touching `self`.
    ///
    /// Metadata fields are replaced; a missing page count keeps the cached one.
    pub fn merged(&self, incoming: &Account) -> Account {
        Account {
            short_name: incoming.short_name.clone(),
            author_name: incoming.author_name.clone(),
            author_url: incoming.author_url.clone(),
            access_token: incoming
                .access_token
                .clone()
                .or_else(|| self.account.access_token.clone()),
            auth_url: incoming.auth_url.clone(),
            page_count: incoming.page_count.or(self.account.page_count),
        }
    }

    /// Compute what the vault and record store need for `next`
    pub fn changes_for(&self, next: &Account) -> Changes {
        let token = match next.access_token.as_deref() {
            Some(token) if Some(token) != self.token() => Some(token.to_string()),
            _ => None,
        };

        let record = next.to_record(self.created_at);
        let record = (record != self.persisted).then_some(record);

        Changes { token, record }
    }

    /// Replace the in-memory value, bumping the revision if anything changed
    pub fn apply(&mut self, next: Account) -> bool {
        if next == self.account {
            return false;
        }
        self.account = next;
        self.revision += 1;
        true
    }
}
