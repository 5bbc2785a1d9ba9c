//! Telegraph API client
//!
//! Methods are described by [`Method`], sent by any [`TelegraphApi`]
//! transport, and unwrapped from the `{ok, result, error}` envelope by
//! [`query`].

pub mod http;
#[cfg(test)]
pub mod mock;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;

use crate::error::ApiError;
use crate::models::{Account, AccountChanges, Node, Page, PageList, PageViews};

pub use http::HttpClient;

/// Default Telegraph API endpoint
pub const DEFAULT_API_URL: &str = "https://api.telegra.ph";

/// Every field `getAccountInfo` can return
pub const ACCOUNT_INFO_FIELDS: [&str; 5] = [
    "short_name",
    "author_name",
    "author_url",
    "auth_url",
    "page_count",
];

/// Transport for Telegraph API calls
pub trait TelegraphApi {
    /// Send a method and return the raw response body
    fn execute(&self, method: &Method) -> impl Future<Output = Result<String, ApiError>> + Send;
}

/// Telegraph API methods with their documented parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// Create a new account; the result carries an access token
    CreateAccount {
        /// 1-32 characters
        short_name: String,
        /// 0-128 characters
        author_name: Option<String>,
        /// 0-512 characters
        author_url: Option<String>,
    },
    /// Update account metadata; only passed fields change
    EditAccountInfo {
        /// Account token
        access_token: String,
        /// Changed fields
        changes: AccountChanges,
    },
    /// Fetch account metadata
    GetAccountInfo {
        /// Account token
        access_token: String,
        /// Fields to return
        fields: Vec<String>,
    },
    /// Revoke the token and issue a new one plus an `auth_url`
    RevokeAccessToken {
        /// Token to revoke
        access_token: String,
    },
    /// Create a page
    CreatePage {
        /// Account token
        access_token: String,
        /// 1-256 characters
        title: String,
        /// Author name shown below the title
        author_name: Option<String>,
        /// Author profile link
        author_url: Option<String>,
        /// Content, up to 64 KB
        content: Vec<Node>,
        /// Return content in the resulting page
        return_content: bool,
    },
    /// Replace the content of an existing page
    EditPage {
        /// Account token
        access_token: String,
        /// Page path
        path: String,
        /// 1-256 characters
        title: String,
        /// Content, up to 64 KB
        content: Vec<Node>,
        /// Author name shown below the title
        author_name: Option<String>,
        /// Author profile link
        author_url: Option<String>,
        /// Return content in the resulting page
        return_content: bool,
    },
    /// Fetch a page
    GetPage {
        /// Page path
        path: String,
        /// Return content in the resulting page
        return_content: bool,
    },
    /// List the pages of an account
    GetPageList {
        /// Account token
        access_token: String,
        /// Index of the first page
        offset: u32,
        /// 0-200
        limit: u32,
    },
    /// Page view counter, optionally narrowed to a year, month, day, or hour
    GetViews {
        /// Page path
        path: String,
        /// 2000-2100
        year: Option<u16>,
        /// 1-12
        month: Option<u8>,
        /// 1-31
        day: Option<u8>,
        /// 0-24
        hour: Option<u8>,
    },
}

impl Method {
    /// `getAccountInfo` asking for every field
    pub fn account_info(access_token: &str) -> Self {
        Self::GetAccountInfo {
            access_token: access_token.to_string(),
            fields: ACCOUNT_INFO_FIELDS.iter().map(ToString::to_string).collect(),
        }
    }

    /// API method name, used as the URL path
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateAccount { .. } => "createAccount",
            Self::EditAccountInfo { .. } => "editAccountInfo",
            Self::GetAccountInfo { .. } => "getAccountInfo",
            Self::RevokeAccessToken { .. } => "revokeAccessToken",
            Self::CreatePage { .. } => "createPage",
            Self::EditPage { .. } => "editPage",
            Self::GetPage { .. } => "getPage",
            Self::GetPageList { .. } => "getPageList",
            Self::GetViews { .. } => "getViews",
        }
    }

    /// Query parameters; absent optionals are omitted
    pub fn params(&self) -> Result<Vec<(&'static str, String)>, ApiError> {
        let mut params = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                params.push((key, value));
            }
        };

        match self {
            Self::CreateAccount {
                short_name,
                author_name,
                author_url,
            } => {
                push("short_name", Some(short_name.clone()));
                push("author_name", author_name.clone());
                push("author_url", author_url.clone());
            }
            Self::EditAccountInfo {
                access_token,
                changes,
            } => {
                push("access_token", Some(access_token.clone()));
                push("short_name", changes.short_name.clone());
                push("author_name", changes.author_name.clone());
                push("author_url", changes.author_url.clone());
            }
            Self::GetAccountInfo {
                access_token,
                fields,
            } => {
                push("access_token", Some(access_token.clone()));
                push("fields", Some(serde_json::to_string(fields)?));
            }
            Self::RevokeAccessToken { access_token } => {
                push("access_token", Some(access_token.clone()));
            }
            Self::CreatePage {
                access_token,
                title,
                author_name,
                author_url,
                content,
                return_content,
            } => {
                push("access_token", Some(access_token.clone()));
                push("title", Some(title.clone()));
                push("author_name", author_name.clone());
                push("author_url", author_url.clone());
                push("content", Some(serde_json::to_string(content)?));
                push("return_content", Some(return_content.to_string()));
            }
            Self::EditPage {
                access_token,
                path,
                title,
                content,
                author_name,
                author_url,
                return_content,
            } => {
                push("access_token", Some(access_token.clone()));
                push("path", Some(path.clone()));
                push("title", Some(title.clone()));
                push("content", Some(serde_json::to_string(content)?));
                push("author_name", author_name.clone());
                push("author_url", author_url.clone());
                push("return_content", Some(return_content.to_string()));
            }
            Self::GetPage {
                path,
                return_content,
            } => {
                push("path", Some(path.clone()));
                push("return_content", Some(return_content.to_string()));
            }
            Self::GetPageList {
                access_token,
                offset,
                limit,
            } => {
                push("access_token", Some(access_token.clone()));
                push("offset", Some(offset.to_string()));
                push("limit", Some(limit.to_string()));
            }
            Self::GetViews {
                path,
                year,
                month,
                day,
                hour,
            } => {
                push("path", Some(path.clone()));
                push("year", year.map(|v| v.to_string()));
                push("month", month.map(|v| v.to_string()));
                push("day", day.map(|v| v.to_string()));
                push("hour", hour.map(|v| v.to_string()));
            }
        }

        Ok(params)
    }

    /// Full request URL against `base`
    pub fn url(&self, base: &str) -> Result<String, ApiError> {
        let query = self
            .params()?
            .into_iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(&value)))
            .collect::<Vec<_>>()
            .join("&");

        let base = base.trim_end_matches('/');
        if query.is_empty() {
            Ok(format!("{base}/{}", self.name()))
        } else {
            Ok(format!("{base}/{}?{query}", self.name()))
        }
    }
}

/// Response envelope shared by every Telegraph method
#[derive(Debug, Deserialize)]
pub struct Response<T> {
    /// Whether the call succeeded
    pub ok: bool,
    /// Payload on success
    pub result: Option<T>,
    /// Error description on failure
    pub error: Option<String>,
}

impl<T> Response<T> {
    /// Unwrap the envelope into its payload or a typed error
    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.ok, self.result, self.error) {
            (true, Some(result), _) => Ok(result),
            (_, _, Some(error)) => Err(ApiError::Remote(error)),
            (ok, None, None) => Err(ApiError::BadResponse(format!(
                "ok={ok} without result or error"
            ))),
            (false, Some(_), None) => Err(ApiError::BadResponse(
                "ok=false without error".to_string(),
            )),
        }
    }
}

/// Send `method` through `api` and decode its result as `T`
pub async fn query<T, A>(api: &A, method: &Method) -> Result<T, ApiError>
where
    T: DeserializeOwned,
    A: TelegraphApi + Sync,
{
    tracing::debug!(method = method.name(), "calling Telegraph");
    let body = api.execute(method).await?;

    let response: Response<T> = serde_json::from_str(&body).map_err(|e| {
        ApiError::BadResponse(format!("{}: {e}", method.name()))
    })?;

    response.into_result()
}

// ==================== Typed helpers ====================

/// Create a remote account
pub async fn create_account<A: TelegraphApi + Sync>(
    api: &A,
    short_name: &str,
    author_name: Option<&str>,
    author_url: Option<&str>,
) -> Result<Account, ApiError> {
    let method = Method::CreateAccount {
        short_name: short_name.to_string(),
        author_name: author_name.map(ToString::to_string),
        author_url: author_url.map(ToString::to_string),
    };
    query(api, &method).await
}

/// Fetch every account field for a token
pub async fn account_info<A: TelegraphApi + Sync>(
    api: &A,
    access_token: &str,
) -> Result<Account, ApiError> {
    query(api, &Method::account_info(access_token)).await
}

/// Push metadata changes for a token
pub async fn edit_account_info<A: TelegraphApi + Sync>(
    api: &A,
    access_token: &str,
    changes: &AccountChanges,
) -> Result<Account, ApiError> {
    let method = Method::EditAccountInfo {
        access_token: access_token.to_string(),
        changes: changes.clone(),
    };
    query(api, &method).await
}

/// Revoke a token; the result carries the new token and `auth_url`
pub async fn revoke_access_token<A: TelegraphApi + Sync>(
    api: &A,
    access_token: &str,
) -> Result<Account, ApiError> {
    let method = Method::RevokeAccessToken {
        access_token: access_token.to_string(),
    };
    query(api, &method).await
}

/// List pages of an account
pub async fn page_list<A: TelegraphApi + Sync>(
    api: &A,
    access_token: &str,
    offset: u32,
    limit: u32,
) -> Result<PageList, ApiError> {
    let method = Method::GetPageList {
        access_token: access_token.to_string(),
        offset,
        limit: limit.min(200),
    };
    query(api, &method).await
}

/// Fetch a page with its content
pub async fn get_page<A: TelegraphApi + Sync>(api: &A, path: &str) -> Result<Page, ApiError> {
    let method = Method::GetPage {
        path: path.to_string(),
        return_content: true,
    };
    query(api, &method).await
}

/// Publish a new page authored by `account`
pub async fn create_page<A: TelegraphApi + Sync>(
    api: &A,
    access_token: &str,
    account: &Account,
    title: &str,
    content: Vec<Node>,
) -> Result<Page, ApiError> {
    let method = Method::CreatePage {
        access_token: access_token.to_string(),
        title: title.to_string(),
        author_name: account.author_name.clone(),
        author_url: account.author_url.clone(),
        content,
        return_content: false,
    };
    query(api, &method).await
}

/// Replace the title and content of `page`, keeping its author line
pub async fn edit_page<A: TelegraphApi + Sync>(
    api: &A,
    access_token: &str,
    page: &Page,
    title: &str,
    content: Vec<Node>,
) -> Result<Page, ApiError> {
    let method = Method::EditPage {
        access_token: access_token.to_string(),
        path: page.path.clone(),
        title: title.to_string(),
        content,
        author_name: page.author_name.clone(),
        author_url: page.author_url.clone(),
        return_content: false,
    };
    query(api, &method).await
}

/// Total views of a page
pub async fn views<A: TelegraphApi + Sync>(api: &A, path: &str) -> Result<PageViews, ApiError> {
    let method = Method::GetViews {
        path: path.to_string(),
        year: None,
        month: None,
        day: None,
        hour: None,
    };
    query(api, &method).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::models::text_to_nodes;

    #[test]
    fn test_params_skip_absent_optionals() {
        let method = Method::CreateAccount {
            short_name: "Sandbox".to_string(),
            author_name: None,
            author_url: Some("https://t.me/x".to_string()),
        };
        let params = method.params().unwrap();
        assert_eq!(
            params,
            vec![
                ("short_name", "Sandbox".to_string()),
                ("author_url", "https://t.me/x".to_string()),
            ]
        );
    }

    #[test]
    fn test_url_encodes_values() {
        let method = Method::account_info("abc");
        let url = method.url("https://api.telegra.ph/").unwrap();
        assert!(url.starts_with("https://api.telegra.ph/getAccountInfo?access_token=abc&fields="));
        assert!(url.contains("%22short_name%22"));
        assert!(url.contains("%22page_count%22"));
    }

    #[test]
    fn test_page_content_is_json() {
        let method = Method::CreatePage {
            access_token: "t".to_string(),
            title: "Title".to_string(),
            author_name: None,
            author_url: None,
            content: vec![Node::paragraph("Untitled")],
            return_content: false,
        };
        let params = method.params().unwrap();
        let content = params.iter().find(|(k, _)| *k == "content").unwrap();
        assert_eq!(content.1, r#"[{"tag":"p","children":["Untitled"]}]"#);
        assert!(params.contains(&("return_content", "false".to_string())));
    }

    #[test]
    fn test_envelope_unwrapping() {
        let ok: Response<PageViews> = serde_json::from_str(r#"{"ok":true,"result":{"views":4}}"#).unwrap();
        assert_eq!(ok.into_result().unwrap().views, 4);

        let err: Response<PageViews> =
            serde_json::from_str(r#"{"ok":false,"error":"ACCESS_TOKEN_INVALID"}"#).unwrap();
        assert!(matches!(err.into_result(), Err(ApiError::Remote(e)) if e == "ACCESS_TOKEN_INVALID"));

        let empty: Response<PageViews> = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(matches!(empty.into_result(), Err(ApiError::BadResponse(_))));
    }

    #[tokio::test]
    async fn test_query_rejects_malformed_body() {
        let api = MockApi::new();
        api.push_raw("getPage", "<html>");
        let result = get_page(&api, "Sample-01-01").await;
        assert!(matches!(result, Err(ApiError::BadResponse(_))));
    }

    #[tokio::test]
    async fn test_edit_page_keeps_author_line() {
        let api = MockApi::new();
        let page_json = serde_json::json!({
            "path": "Sample-01-01",
            "url": "https://telegra.ph/Sample-01-01",
            "title": "Sample",
            "description": "",
            "author_name": "Alice",
            "author_url": "https://t.me/alice",
            "views": 3
        });
        api.push_ok("getPage", page_json.clone());
        api.push_ok("editPage", page_json);

        let page = get_page(&api, "Sample-01-01").await.unwrap();
        edit_page(&api, "tok", &page, "Renamed", text_to_nodes("New body"))
            .await
            .unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        let params = calls[1].params().unwrap();
        assert_eq!(calls[1].name(), "editPage");
        assert!(params.contains(&("access_token", "tok".to_string())));
        assert!(params.contains(&("path", "Sample-01-01".to_string())));
        assert!(params.contains(&("title", "Renamed".to_string())));
        assert!(params.contains(&("author_name", "Alice".to_string())));
        assert!(params.contains(&("author_url", "https://t.me/alice".to_string())));
        assert!(params.contains(&(
            "content",
            r#"[{"tag":"p","children":["New body"]}]"#.to_string()
        )));
    }

    #[tokio::test]
    async fn test_page_list_caps_limit() {
        let api = MockApi::new();
        api.push_ok("getPageList", serde_json::json!({"total_count": 0, "pages": []}));
        let list = page_list(&api, "tok", 0, 500).await.unwrap();
        assert_eq!(list.total_count, 0);

        let calls = api.calls();
        assert!(matches!(
            calls.as_slice(),
            [Method::GetPageList { limit: 200, .. }]
        ));
    }
}
