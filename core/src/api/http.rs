//! HTTP Chat API
//!
//! `reqwest`-based client for the chat server's JSON endpoints.

use std::time::Duration;

use async_trait::async_trait;

use super::traits::{ApiError, ChatApi};
use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::message::{Message, MessageId};

/// HTTP client for the chat server
#[derive(Clone, Debug)]
pub struct HttpChatApi {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpChatApi {
    /// Create a client for `base_url` with the default timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an absolute http(s) URL or the
    /// HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with an explicit request timeout
    ///
    /// # Errors
    ///
    /// Same as [`HttpChatApi::new`].
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(base_url)?;
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// The server base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get messages endpoint URL
    fn messages_url(&self) -> String {
        format!("{}/messages", self.base_url)
    }
}

/// Validate a server URL and strip any trailing slash
fn normalize_base_url(raw: &str) -> Result<String, ApiError> {
    let invalid = |reason: String| ApiError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let parsed = reqwest::Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme {other:?}"))),
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Turn a non-success response into [`ApiError::Status`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn fetch_messages(&self, from: MessageId) -> Result<Vec<Message>, ApiError> {
        let response = self
            .http_client
            .get(self.messages_url())
            .query(&[("from", from.to_string())])
            .send()
            .await?;

        let messages = check_status(response).await?.json::<Vec<Message>>().await?;
        tracing::trace!(from = %from, count = messages.len(), "Fetched messages");
        Ok(messages)
    }

    async fn post_message(&self, message: &Message) -> Result<(), ApiError> {
        let response = self
            .http_client
            .post(self.messages_url())
            .json(message)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}
