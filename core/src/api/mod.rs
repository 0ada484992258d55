//! Chat Server API
//!
//! This module provides access to the chat server through a trait so the
//! controller can run against the real HTTP server or a test double.
//!
//! # Endpoints
//!
//! - `GET /messages?from=<id>` - messages with id strictly greater than `from`
//! - `POST /messages` - create a message (server assigns the id)
//!
//! # Usage
//!
//! ```ignore
//! use chat_core::api::{ChatApi, HttpChatApi};
//! use chat_core::MessageId;
//!
//! let api = HttpChatApi::new("http://localhost:7070")?;
//! let page = api.fetch_messages(MessageId::ZERO).await?;
//! ```

mod http;
mod traits;

pub use http::HttpChatApi;
pub use traits::{ApiError, ChatApi};
