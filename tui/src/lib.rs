//! Chat TUI - Terminal interface for anon-chat
//!
//! A full-screen terminal client for an anonymous chat server. All chat
//! logic lives in `chat-core`; this crate draws it and turns key presses
//! into controller calls.
//!
//! # Architecture
//!
//! - **App**: one `tokio::select!` loop over terminal input, controller
//!   events and a frame tick
//! - **Widgets**: chat bubbles ([`widgets::MessageList`]) and the input box
//!   ([`widgets::Composer`])
//! - **Theme**: the colour palette

pub mod app;
pub mod theme;
pub mod widgets;

pub use app::App;
