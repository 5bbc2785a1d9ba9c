//! Account model for Telegraph identities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Locally generated account identifier.
///
/// Never derived from remote data and never reused after deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (used when rehydrating from storage)
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A Telegraph account as the API describes it.
///
/// Every field is optional because each Telegraph method returns a different
/// subset: only `createAccount` and `revokeAccessToken` return a token, and
/// `auth_url` is only present when explicitly requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account name, shown only to the owner above the "Edit/Publish" button
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    /// Default author name for new pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Default profile link for new pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
    /// Access token (secret)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// One-time browser authorization link, valid for five minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    /// Number of pages belonging to the account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

impl Account {
    /// Create an account with only a short name
    pub fn new(short_name: &str) -> Self {
        Self {
            short_name: Some(short_name.to_string()),
            ..Self::default()
        }
    }

    /// Builder-style token setter
    pub fn with_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    /// Whether this account can perform page operations
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Name to show in listings
    pub fn label(&self) -> &str {
        self.short_name
            .as_deref()
            .or(self.author_name.as_deref())
            .unwrap_or("(unnamed)")
    }

    /// Non-secret persistent view of this account.
    ///
    /// The token and the one-time auth URL are never part of a record.
    pub fn to_record(&self, created_at: DateTime<Utc>) -> AccountRecord {
        AccountRecord {
            short_name: self.short_name.clone(),
            author_name: self.author_name.clone(),
            author_url: self.author_url.clone(),
            page_count: self.page_count,
            created_at,
        }
    }

    /// Rebuild an account from a stored record and its vault secret
    pub fn from_record(record: &AccountRecord, access_token: String) -> Self {
        Self {
            short_name: record.short_name.clone(),
            author_name: record.author_name.clone(),
            author_url: record.author_url.clone(),
            access_token: Some(access_token),
            auth_url: None,
            page_count: record.page_count,
        }
    }
}

/// Record Store row: every non-secret field of an [`Account`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account name
    pub short_name: Option<String>,
    /// Default author name
    pub author_name: Option<String>,
    /// Default profile link
    pub author_url: Option<String>,
    /// Cached page count
    pub page_count: Option<u32>,
    /// When the account was added to this client
    pub created_at: DateTime<Utc>,
}

/// Fields to change through `editAccountInfo`; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountChanges {
    /// New account name
    pub short_name: Option<String>,
    /// New default author name
    pub author_name: Option<String>,
    /// New default profile link
    pub author_url: Option<String>,
}

impl AccountChanges {
    /// Whether no field would change
    pub const fn is_empty(&self) -> bool {
        self.short_name.is_none() && self.author_name.is_none() && self.author_url.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_strips_secrets() {
        let mut account = Account::new("alice").with_token("tok1");
        account.auth_url = Some("https://edit.telegra.ph/auth/x".to_string());
        account.page_count = Some(3);

        let record = account.to_record(Utc::now());
        assert_eq!(record.short_name.as_deref(), Some("alice"));
        assert_eq!(record.page_count, Some(3));

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("tok1"));
        assert!(!json.contains("auth"));
    }

    #[test]
    fn test_from_record_restores_token() {
        let record = Account::new("bob").to_record(Utc::now());
        let account = Account::from_record(&record, "secret".to_string());
        assert_eq!(account.access_token.as_deref(), Some("secret"));
        assert_eq!(account.auth_url, None);
        assert!(account.is_authenticated());
    }

    #[test]
    fn test_account_deserializes_api_shape() {
        let json = r#"{"short_name":"Sandbox","author_name":"Anonymous","author_url":"","page_count":7}"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.label(), "Sandbox");
        assert_eq!(account.author_name.as_deref(), Some("Anonymous"));
        assert_eq!(account.page_count, Some(7));
        assert!(!account.is_authenticated());
    }

    #[test]
    fn test_account_id_parse() {
        let id = AccountId::new();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<AccountId>().is_err());
    }
}
