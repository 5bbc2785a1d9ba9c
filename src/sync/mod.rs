//! Background refresh over a shared account store
//!
//! The store lock is taken only to start and to finish a refresh, never
//! across the network call, so other callers keep working while requests are
//! in flight. The store's per-account guard serializes refreshes of the same
//! account.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::api::{self, TelegraphApi};
use crate::error::StoreResult;
use crate::models::{Account, AccountId};
use crate::records::RecordStore;
use crate::store::AccountStore;
use crate::vault::SecretVault;

/// Account store shared between tasks
pub type SharedStore<V, R> = Arc<Mutex<AccountStore<V, R>>>;

/// Wrap a store for sharing
pub fn share<V, R>(store: AccountStore<V, R>) -> SharedStore<V, R> {
    Arc::new(Mutex::new(store))
}

/// Refresh one account without holding the lock during the remote call
pub async fn refresh_shared<V, R, A>(
    store: &SharedStore<V, R>,
    api: &A,
    id: AccountId,
) -> StoreResult<Account>
where
    V: SecretVault,
    R: RecordStore,
    A: TelegraphApi + Sync,
{
    let ticket = store.lock().await.begin_refresh(&id)?;
    let result = api::query(api, &ticket.method()).await;
    store.lock().await.finish_refresh(ticket, result)
}

/// Run [`refresh_shared`] on the tokio runtime
pub fn spawn_refresh<V, R, A>(
    store: SharedStore<V, R>,
    api: Arc<A>,
    id: AccountId,
) -> JoinHandle<StoreResult<Account>>
where
    V: SecretVault + Send + 'static,
    R: RecordStore + Send + 'static,
    A: TelegraphApi + Send + Sync + 'static,
{
    tokio::spawn(async move { refresh_shared(&store, api.as_ref(), id).await })
}

/// Refresh every account, one after another.
///
/// Failures are logged and reported per account; they do not stop the run.
pub async fn refresh_all<V, R, A>(
    store: &SharedStore<V, R>,
    api: &A,
) -> Vec<(AccountId, StoreResult<Account>)>
where
    V: SecretVault,
    R: RecordStore,
    A: TelegraphApi + Sync,
{
    let ids: Vec<AccountId> = store.lock().await.iter().map(|(id, _)| id).collect();

    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        let result = refresh_shared(store, api, id).await;
        if let Err(e) = &result {
            tracing::warn!(%id, "Failed to refresh account: {e}");
        }
        results.push((id, result));
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::MockApi;
    use crate::error::{ApiError, StoreError};
    use crate::records::MemoryRecordStore;
    use crate::vault::MemoryVault;
    use serde_json::json;
    use std::future::Future;
    use std::time::Duration;

    /// Transport that never answers
    struct SilentApi;

    impl TelegraphApi for SilentApi {
        fn execute(&self, _method: &Method) -> impl Future<Output = Result<String, ApiError>> + Send {
            std::future::pending()
        }
    }

    fn shared_with(names: &[&str]) -> (SharedStore<MemoryVault, MemoryRecordStore>, Vec<AccountId>) {
        let mut store =
            AccountStore::initialize(MemoryVault::new(), MemoryRecordStore::new()).unwrap();
        let ids = names
            .iter()
            .map(|name| {
                store
                    .add(Account::new(name).with_token(&format!("tok-{name}")))
                    .unwrap()
            })
            .collect();
        (share(store), ids)
    }

    #[tokio::test]
    async fn test_refresh_shared_updates_store() {
        let (store, ids) = shared_with(&["alice"]);
        let api = MockApi::new();
        api.push_ok("getAccountInfo", json!({"short_name": "alice", "page_count": 9}));

        let account = refresh_shared(&store, &api, ids[0]).await.unwrap();
        assert_eq!(account.page_count, Some(9));
        assert_eq!(store.lock().await.get(&ids[0]).unwrap().page_count, Some(9));
    }

    #[tokio::test]
    async fn test_spawned_refresh() {
        let (store, ids) = shared_with(&["alice"]);
        let api = Arc::new(MockApi::new());
        api.push_ok("getAccountInfo", json!({"short_name": "renamed"}));

        let handle = spawn_refresh(Arc::clone(&store), Arc::clone(&api), ids[0]);
        let account = handle.await.unwrap().unwrap();
        assert_eq!(account.label(), "renamed");
    }

    #[tokio::test]
    async fn test_same_account_refresh_is_serialized() {
        let (store, ids) = shared_with(&["alice"]);

        let ticket = store.lock().await.begin_refresh(&ids[0]).unwrap();

        let api = MockApi::new();
        let second = refresh_shared(&store, &api, ids[0]).await;
        assert!(matches!(second, Err(StoreError::RefreshInFlight(_))));
        assert!(api.calls().is_empty());

        store
            .lock()
            .await
            .finish_refresh(ticket, Ok(Account::new("alice")))
            .unwrap();
    }

    #[tokio::test]
    async fn test_aborted_refresh_releases_account() {
        let (store, ids) = shared_with(&["alice"]);

        let handle = spawn_refresh(Arc::clone(&store), Arc::new(SilentApi), ids[0]);
        while !store.lock().await.is_refreshing(&ids[0]) {
            tokio::task::yield_now().await;
        }

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(!store.lock().await.is_refreshing(&ids[0]));

        let api = MockApi::new();
        api.push_ok("getAccountInfo", json!({"short_name": "alice", "page_count": 3}));
        let account = refresh_shared(&store, &api, ids[0]).await.unwrap();
        assert_eq!(account.page_count, Some(3));
    }

    #[tokio::test]
    async fn test_timed_out_refresh_releases_account() {
        let (store, ids) = shared_with(&["alice"]);

        let timed_out = tokio::time::timeout(
            Duration::from_millis(20),
            refresh_shared(&store, &SilentApi, ids[0]),
        )
        .await;
        assert!(timed_out.is_err());

        assert!(store.lock().await.begin_refresh(&ids[0]).is_ok());
    }

    #[tokio::test]
    async fn test_refresh_all_reports_each_account() {
        let (store, ids) = shared_with(&["alice", "bob"]);
        let api = MockApi::new();
        api.push_ok("getAccountInfo", json!({"short_name": "alice", "page_count": 1}));
        api.push_remote_error("getAccountInfo", "ACCESS_TOKEN_INVALID");

        let results = refresh_all(&store, &api).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, ids[0]);
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(StoreError::RefreshFailed(_))));

        let guard = store.lock().await;
        assert_eq!(guard.get(&ids[1]).unwrap().label(), "bob");
    }
}
