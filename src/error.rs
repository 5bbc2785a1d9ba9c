//! Error types returned by the account store and the Telegraph client

use thiserror::Error;

use crate::models::AccountId;

/// Failure talking to the Telegraph API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response body
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with `ok: false`
    #[error("Telegraph error: {0}")]
    Remote(String),

    /// The body could not be parsed or carried neither result nor error
    #[error("bad response: {0}")]
    BadResponse(String),

    /// Request parameters could not be encoded
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Outcome of a failed account store operation.
///
/// A failed operation never leaves a partial mutation behind: either the
/// store state is unchanged, or the failing step was rolled back.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The account carries no access token and cannot be stored
    #[error("account has no access token")]
    MissingToken,

    /// No account with this id is known
    #[error("account {0} not found")]
    NotFound(AccountId),

    /// A refresh for this account is already running
    #[error("refresh already in flight for account {0}")]
    RefreshInFlight(AccountId),

    /// The account was edited locally while a refresh was running; the
    /// server result was discarded
    #[error("account {0} changed while refreshing; server result discarded")]
    Stale(AccountId),

    /// The remote refresh failed; in-memory state is unchanged
    #[error("refresh failed: {0}")]
    RefreshFailed(#[source] ApiError),

    /// Any other remote call failed
    #[error(transparent)]
    Remote(#[from] ApiError),

    /// The secret vault rejected a read or write
    #[error("secret vault error: {0:#}")]
    Vault(#[source] anyhow::Error),

    /// The record store rejected a read or write
    #[error("record store error: {0:#}")]
    Records(#[source] anyhow::Error),
}

/// Result alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
