//! Chat API Traits
//!
//! The controller only needs two operations from the server: fetch the page
//! after a watermark, and create a message. Implementations handle transport
//! details.

use async_trait::async_trait;
use thiserror::Error;

use crate::message::{Message, MessageId};

/// Errors talking to the chat server
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, timeout or body decoding failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The configured server URL cannot be used
    #[error("invalid server URL {url:?}: {reason}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Chat server operations
///
/// Implement this trait to point the controller at a different server or a
/// test double.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Fetch messages with id strictly greater than `from`, ascending
    ///
    /// `MessageId::ZERO` fetches the whole history. An empty page means
    /// nothing new.
    async fn fetch_messages(&self, from: MessageId) -> Result<Vec<Message>, ApiError>;

    /// Create a message; the server replaces the placeholder id
    async fn post_message(&self, message: &Message) -> Result<(), ApiError>;
}
