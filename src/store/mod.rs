//! Account store: the in-process authority over known accounts
//!
//! The store pairs each account's secret (in a [`SecretVault`]) with its
//! non-secret metadata (in a [`RecordStore`]) and keeps an in-memory registry
//! in insertion order. Every mutation either completes on both backing stores
//! or is rolled back; if a rollback itself fails, [`AccountStore::reconcile`]
//! cleans up the orphan on the next start.
//!
//! ```text
//!   caller ──► AccountStore ──► SecretVault   (tokens)
//!                  │       └──► RecordStore   (metadata)
//!                  └─────────► TelegraphApi   (refresh, revoke, ...)
//! ```

mod entry;

use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::api::{self, Method, TelegraphApi};
use crate::error::{ApiError, StoreError, StoreResult};
use crate::models::{Account, AccountChanges, AccountId};
use crate::records::RecordStore;
use crate::vault::SecretVault;

use entry::Entry;

/// What an [`AccountStore::edit`] actually wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditOutcome {
    /// The token differed and was rotated in the vault
    pub token_rotated: bool,
    /// Persisted metadata differed and the record row was rewritten
    pub record_saved: bool,
}

/// Orphans removed by [`AccountStore::reconcile`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Record rows that had no secret
    pub orphan_rows: usize,
    /// Secrets that had no record row
    pub orphan_secrets: usize,
}

type InFlight = Arc<Mutex<HashSet<AccountId>>>;

/// Marks an account as refreshing until dropped
struct InFlightGuard {
    id: AccountId,
    set: InFlight,
}

impl InFlightGuard {
    fn acquire(set: &InFlight, id: AccountId) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        inserted.then(|| Self {
            id,
            set: Arc::clone(set),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// A started refresh; hand it back to [`AccountStore::finish_refresh`].
///
/// Dropping the ticket without finishing (an aborted task, a timeout)
/// releases the account for the next refresh.
pub struct RefreshTicket {
    id: AccountId,
    access_token: String,
    revision: u64,
    _guard: InFlightGuard,
}

impl std::fmt::Debug for RefreshTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTicket")
            .field("id", &self.id)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl RefreshTicket {
    /// Account being refreshed
    pub const fn id(&self) -> AccountId {
        self.id
    }

    /// The `getAccountInfo` call to issue
    pub fn method(&self) -> Method {
        Method::account_info(&self.access_token)
    }
}

/// Registry of accounts backed by a vault and a record store
pub struct AccountStore<V, R> {
    vault: V,
    records: R,
    entries: Vec<Entry>,
    current: Option<AccountId>,
    in_flight: InFlight,
}

impl<V: SecretVault, R: RecordStore> AccountStore<V, R> {
    /// Load every account whose record row has a matching secret.
    ///
    /// Rows without a secret are left out of the registry; "current" starts
    /// unset.
    pub fn initialize(vault: V, records: R) -> StoreResult<Self> {
        let rows = records
            .fetch_all_account_rows()
            .map_err(StoreError::Records)?;

        let mut entries = Vec::with_capacity(rows.len());
        for (id, record) in rows {
            match vault.get(&id) {
                Ok(Some(token)) => entries.push(Entry::rehydrate(id, &record, token)),
                Ok(None) => tracing::warn!(%id, "Dropping account row without a stored token"),
                Err(e) => tracing::warn!(%id, "Skipping account, vault read failed: {e:#}"),
            }
        }

        tracing::debug!(count = entries.len(), "Loaded accounts");

        Ok(Self {
            vault,
            records,
            entries,
            current: None,
            in_flight: InFlight::default(),
        })
    }

    /// Delete record rows without a secret and secrets without a record row.
    ///
    /// These are left behind when a write was interrupted between the two
    /// stores, or when a rollback failed.
    pub fn reconcile(&mut self) -> StoreResult<ReconcileReport> {
        let rows = self
            .records
            .fetch_all_account_rows()
            .map_err(StoreError::Records)?;
        let row_ids: HashSet<AccountId> = rows.iter().map(|(id, _)| *id).collect();

        let mut report = ReconcileReport::default();

        for id in &row_ids {
            if self.vault.get(id).map_err(StoreError::Vault)?.is_none() {
                self.records
                    .delete_account_row(id)
                    .map_err(StoreError::Records)?;
                report.orphan_rows += 1;
            }
        }

        for id in self.vault.ids().map_err(StoreError::Vault)? {
            if !row_ids.contains(&id) {
                self.vault.delete(&id).map_err(StoreError::Vault)?;
                report.orphan_secrets += 1;
            }
        }

        if report != ReconcileReport::default() {
            tracing::info!(
                orphan_rows = report.orphan_rows,
                orphan_secrets = report.orphan_secrets,
                "Reconciled account storage"
            );
        }

        Ok(report)
    }

    // ==================== Queries ====================

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no account
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an account
    pub fn get(&self, id: &AccountId) -> Option<&Account> {
        self.position(id).map(|i| &self.entries[i].account)
    }

    /// Position of an account in insertion order
    pub fn position(&self, id: &AccountId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == *id)
    }

    /// Id of the account at `index` in insertion order
    pub fn id_at(&self, index: usize) -> Option<AccountId> {
        self.entries.get(index).map(|e| e.id)
    }

    /// All accounts in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (AccountId, &Account)> {
        self.entries.iter().map(|e| (e.id, &e.account))
    }

    /// The selected account, if any
    pub fn current(&self) -> Option<&Account> {
        self.current.as_ref().and_then(|id| self.get(id))
    }

    /// Id of the selected account, if any
    pub const fn current_id(&self) -> Option<AccountId> {
        self.current
    }

    /// Whether a refresh of `id` is in flight
    pub fn is_refreshing(&self, id: &AccountId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Backing vault
    pub const fn vault(&self) -> &V {
        &self.vault
    }

    /// Backing record store
    pub const fn records(&self) -> &R {
        &self.records
    }

    /// Give back the backing stores
    pub fn into_parts(self) -> (V, R) {
        (self.vault, self.records)
    }

    fn index_of(&self, id: &AccountId) -> StoreResult<usize> {
        self.position(id).ok_or(StoreError::NotFound(*id))
    }

    fn fresh_id(&self) -> AccountId {
        let mut id = AccountId::new();
        while self.position(&id).is_some() {
            id = AccountId::new();
        }
        id
    }

    // ==================== Mutations ====================

    /// Add an authenticated account and persist it.
    ///
    /// Fails with [`StoreError::MissingToken`] and no side effect if the
    /// account has no token.
    pub fn add(&mut self, account: Account) -> StoreResult<AccountId> {
        let token = account
            .access_token
            .clone()
            .ok_or(StoreError::MissingToken)?;

        let id = self.fresh_id();
        let entry = Entry::new(id, account, Utc::now());

        self.vault.put(&id, &token).map_err(StoreError::Vault)?;

        if let Err(e) = self.records.save_account_row(&id, &entry.record()) {
            self.rollback_secret(&id);
            return Err(StoreError::Records(e));
        }

        self.entries.push(entry);
        tracing::info!(%id, "Account added");

        Ok(id)
    }

    /// Replace an account with `new_account`.
    ///
    /// The vault is written only if the token changed, and the record row
    /// only if `new_account` differs from the stored row, so repeating an
    /// edit is a no-op. Metadata applied by an earlier refresh is written
    /// along with the edit.
    pub fn edit(&mut self, id: &AccountId, new_account: Account) -> StoreResult<EditOutcome> {
        if new_account.access_token.is_none() {
            return Err(StoreError::MissingToken);
        }

        let index = self.index_of(id)?;
        let entry = &self.entries[index];
        let changes = entry.changes_for(&new_account);
        let previous_token = entry.token().map(ToString::to_string);

        let mut outcome = EditOutcome::default();

        if let Some(token) = &changes.token {
            self.vault.update(id, token).map_err(StoreError::Vault)?;
            outcome.token_rotated = true;
        }

        if let Some(record) = &changes.record {
            if let Err(e) = self.records.save_account_row(id, record) {
                if outcome.token_rotated {
                    self.rollback_token(id, previous_token.as_deref());
                }
                return Err(StoreError::Records(e));
            }
            outcome.record_saved = true;
        }

        let entry = &mut self.entries[index];
        entry.apply(new_account);
        if let Some(record) = changes.record {
            entry.persisted = record;
        }

        if outcome.token_rotated {
            tracing::info!(%id, "Access token rotated");
        }

        Ok(outcome)
    }

    /// Remove an account from both backing stores and the registry.
    ///
    /// Later accounts move up one position; if the account was current,
    /// nothing is current afterwards.
    pub fn delete(&mut self, id: &AccountId) -> StoreResult<Account> {
        let index = self.index_of(id)?;
        let token = self.entries[index].token().map(ToString::to_string);

        // The row holds the account's position, so it is removed last.
        self.vault.delete(id).map_err(StoreError::Vault)?;

        if let Err(e) = self.records.delete_account_row(id) {
            if let Some(token) = token {
                if let Err(restore) = self.vault.put(id, &token) {
                    tracing::error!(%id, "Failed to restore secret after record error: {restore:#}");
                }
            }
            return Err(StoreError::Records(e));
        }

        let entry = self.entries.remove(index);
        if self.current == Some(*id) {
            self.current = None;
        }

        tracing::info!(%id, "Account deleted");

        Ok(entry.account)
    }

    /// Make `id` the current account, replacing any previous selection
    pub fn select(&mut self, id: &AccountId) -> StoreResult<()> {
        self.index_of(id)?;
        self.current = Some(*id);
        Ok(())
    }

    /// Clear the selection
    pub fn deselect(&mut self) {
        self.current = None;
    }

    /// Write metadata that only exists in memory (after a refresh) to the
    /// record store. Returns whether a row was written.
    pub fn save(&mut self, id: &AccountId) -> StoreResult<bool> {
        let index = self.index_of(id)?;
        let account = self.entries[index].account.clone();
        Ok(self.edit(id, account)?.record_saved)
    }

    fn rollback_secret(&mut self, id: &AccountId) {
        if let Err(e) = self.vault.delete(id) {
            tracing::error!(%id, "Rollback failed, secret left orphaned: {e:#}");
        }
    }

    fn rollback_token(&mut self, id: &AccountId, previous: Option<&str>) {
        let Some(previous) = previous else {
            return;
        };
        if let Err(e) = self.vault.update(id, previous) {
            tracing::error!(%id, "Rollback failed, vault holds the new token: {e:#}");
        }
    }

    // ==================== Remote sync ====================

    /// Start a refresh of `id` from the server.
    ///
    /// Only one refresh per account may be in flight.
    pub fn begin_refresh(&mut self, id: &AccountId) -> StoreResult<RefreshTicket> {
        let index = self.index_of(id)?;
        let entry = &self.entries[index];
        let access_token = entry.token().ok_or(StoreError::MissingToken)?.to_string();

        let guard =
            InFlightGuard::acquire(&self.in_flight, *id).ok_or(StoreError::RefreshInFlight(*id))?;

        Ok(RefreshTicket {
            id: *id,
            access_token,
            revision: entry.revision,
            _guard: guard,
        })
    }

    /// Merge the result of a refresh started with [`Self::begin_refresh`].
    ///
    /// The server wins for metadata unless the account was edited or deleted
    /// while the request was in flight. The cached token is always kept.
    pub fn finish_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Account, ApiError>,
    ) -> StoreResult<Account> {
        let remote = match result {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(id = %ticket.id, "Refresh failed: {e}");
                return Err(StoreError::RefreshFailed(e));
            }
        };

        let index = self.index_of(&ticket.id)?;
        let entry = &mut self.entries[index];

        if entry.revision != ticket.revision {
            tracing::warn!(id = %ticket.id, "Discarding refresh of locally edited account");
            return Err(StoreError::Stale(ticket.id));
        }

        let merged = entry.merged(&Account {
            access_token: None,
            ..remote
        });
        entry.apply(merged);

        Ok(entry.account.clone())
    }

    /// Reload an account's metadata from the server
    pub async fn refresh<A>(&mut self, id: &AccountId, api: &A) -> StoreResult<Account>
    where
        A: TelegraphApi + Sync,
    {
        let ticket = self.begin_refresh(id)?;
        let result = api::query(api, &ticket.method()).await;
        self.finish_refresh(ticket, result)
    }

    /// Create an account on the server and add it
    pub async fn create_remote<A>(
        &mut self,
        api: &A,
        short_name: &str,
        author_name: Option<&str>,
        author_url: Option<&str>,
    ) -> StoreResult<AccountId>
    where
        A: TelegraphApi + Sync,
    {
        let mut account = api::create_account(api, short_name, author_name, author_url).await?;
        account.page_count.get_or_insert(0);
        self.add(account)
    }

    /// Add an existing account by its access token.
    ///
    /// If the token is already known, the existing account's id is returned.
    pub async fn import_token<A>(&mut self, api: &A, access_token: &str) -> StoreResult<AccountId>
    where
        A: TelegraphApi + Sync,
    {
        if let Some(existing) = self.entries.iter().find(|e| e.token() == Some(access_token)) {
            tracing::info!(id = %existing.id, "Token already imported");
            return Ok(existing.id);
        }

        let mut account = api::account_info(api, access_token).await?;
        account.access_token = Some(access_token.to_string());
        self.add(account)
    }

    /// Revoke the account's token on the server and store the new one.
    ///
    /// The returned account carries a fresh `auth_url`.
    pub async fn revoke<A>(&mut self, id: &AccountId, api: &A) -> StoreResult<Account>
    where
        A: TelegraphApi + Sync,
    {
        let index = self.index_of(id)?;
        let token = self.entries[index]
            .token()
            .ok_or(StoreError::MissingToken)?
            .to_string();

        let remote = api::revoke_access_token(api, &token).await?;
        let new_token = remote.access_token.ok_or_else(|| {
            ApiError::BadResponse("revokeAccessToken returned no token".to_string())
        })?;

        let mut next = self.entries[index].account.clone();
        next.access_token = Some(new_token);
        next.auth_url = remote.auth_url;

        if let Err(e) = self.edit(id, next) {
            tracing::error!(%id, "Token revoked on server but not stored locally: {e}");
            return Err(e);
        }

        Ok(self.entries[index].account.clone())
    }

    /// Push metadata changes to the server and store what it returns
    pub async fn push_info<A>(
        &mut self,
        id: &AccountId,
        api: &A,
        changes: &AccountChanges,
    ) -> StoreResult<Account>
    where
        A: TelegraphApi + Sync,
    {
        let index = self.index_of(id)?;
        let token = self.entries[index]
            .token()
            .ok_or(StoreError::MissingToken)?
            .to_string();

        let remote = api::edit_account_info(api, &token, changes).await?;
        let next = self.entries[index].merged(&Account {
            access_token: None,
            ..remote
        });

        self.edit(id, next)?;
        Ok(self.entries[index].account.clone())
    }
}
