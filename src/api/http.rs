//! HTTPS transport for the Telegraph API

use reqwest::Client;
use std::time::Duration;

use super::{DEFAULT_API_URL, Method, TelegraphApi};
use crate::error::ApiError;

/// Telegraph API client over HTTPS GET with query parameters
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a client against the public Telegraph endpoint
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_API_URL, Duration::from_secs(30))
    }

    /// Create a client against a custom endpoint with a request timeout
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("inkpot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl TelegraphApi for HttpClient {
    async fn execute(&self, method: &Method) -> Result<String, ApiError> {
        // The URL carries the access token; never log it.
        let url = method.url(&self.base_url)?;

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        let body = response.text().await?;

        // Telegraph reports method errors as 200 + ok=false; anything else
        // without a JSON body is a transport-level failure.
        if !status.is_success() && !body.trim_start().starts_with('{') {
            return Err(ApiError::Transport(format!(
                "{} returned HTTP {status}",
                method.name()
            )));
        }

        tracing::debug!(method = method.name(), %status, bytes = body.len(), "Telegraph responded");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimmed() {
        let client =
            HttpClient::with_base_url("https://api.telegra.ph/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "https://api.telegra.ph");
    }
}
