//! Chat Core - Headless Client Logic for anon-chat
//!
//! This crate holds everything an anonymous chat client needs apart from
//! drawing pixels: the message model, the persisted session identity, the
//! HTTP API client, and the controller that polls for new messages and
//! posts outgoing ones.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              UI Surface (TUI)                │
//! │   composer ──send──┐     ┌── message list    │
//! └────────────────────┼─────┼───────────────────┘
//!                      │     │ messages / loading
//! ┌────────────────────┼─────┼───────────────────┐
//! │               ChatController                 │
//! │  ┌──────────┐  ┌───────────┐  ┌───────────┐  │
//! │  │ Identity │  │ PollTimer │  │  ChatApi  │  │
//! │  │  Store   │  │  (3 s)    │  │  (HTTP)   │  │
//! │  └──────────┘  └───────────┘  └───────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ChatController`]: owns messages, loading flag and watermark
//! - [`ChatApi`] / [`HttpChatApi`]: the server's two endpoints
//! - [`KeyValueStore`]: where the session identity lives
//! - [`ChatConfig`]: layered configuration (CLI, env, TOML, defaults)
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use chat_core::{ChatController, FileStore, HttpChatApi, load_config};
//!
//! let config = load_config()?;
//! let api = HttpChatApi::with_timeout(&config.server_url, config.request_timeout)?;
//! let mut controller = ChatController::new(Arc::new(api), config.controller_config());
//! controller.initialize(&FileStore::open_default().unwrap())?;
//!
//! loop {
//!     let change = controller.step().await;
//!     if change.messages {
//!         println!("{} messages", controller.messages().len());
//!     }
//! }
//! ```
//!
//! # No TUI Dependencies
//!
//! This crate has no dependency on ratatui or crossterm.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod config;
pub mod controller;
pub mod identity;
pub mod message;
pub mod timer;

pub use api::{ApiError, ChatApi, HttpChatApi};
pub use config::{
    default_config_path, load_config, load_config_from_path, ChatConfig, ConfigError,
    ConfigOverrides, ConfigSource,
};
pub use controller::{
    ChatController, ControllerConfig, ControllerEvent, FetchKind, FetchRequest, StateChange,
};
pub use identity::{
    get_or_create_user_id, FileStore, KeyValueStore, MemoryStore, StorageError, USER_ID_KEY,
};
pub use message::{Message, MessageId, UserId};
pub use timer::PollTimer;
