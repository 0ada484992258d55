//! Widgets
//!
//! - [`message_list`]: chat bubbles in a scrollable pane
//! - [`composer`]: the message input box

pub mod composer;
pub mod message_list;

pub use composer::{Composer, ComposerView};
pub use message_list::{MessageList, MessageListState};
