//! Theme and Colors
//!
//! The chat palette. Own bubbles use a fixed pale green; everyone else gets a
//! colour derived from their user id (see [`crate::widgets::message_list`]).

use ratatui::style::Color;

// ============================================================================
// Message Bubbles
// ============================================================================

/// Own message background (#dcf8c6)
pub const OWN_BUBBLE_BG: Color = Color::Rgb(0xdc, 0xf8, 0xc6);

/// Own message text
pub const OWN_BUBBLE_FG: Color = Color::Black;

/// Text on other authors' bubbles
pub const OTHER_BUBBLE_FG: Color = Color::White;

// ============================================================================
// UI Colors
// ============================================================================

/// Title and accents
pub const ACCENT: Color = Color::Rgb(37, 211, 102);

/// Loading indicator
pub const LOADING_YELLOW: Color = Color::Rgb(255, 223, 128);

/// Composer text
pub const INPUT_TEXT: Color = Color::Rgb(130, 220, 130);

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Scroll indicators
pub const SCROLL_HINT: Color = Color::Rgb(120, 120, 120);

