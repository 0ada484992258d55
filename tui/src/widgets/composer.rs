//! Composer Widget
//!
//! The message input box: a separator line carrying the send label, then the
//! wrapped text being typed. Submitting hands the raw text back to the caller
//! and clears the box.
//!
//! While a send is in progress the composer is disabled: edits and submits
//! are ignored and the label reads "Sending...".

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthStr;

use crate::theme::{ACCENT, DIM_GRAY, INPUT_TEXT};

/// Shown in an empty, enabled composer
pub const PLACEHOLDER: &str = "Type a message...";

/// Label while idle
pub const SEND_LABEL: &str = "Send";

/// Label while a send is in progress
pub const SENDING_LABEL: &str = "Sending...";

/// Text being composed
#[derive(Debug, Default)]
pub struct Composer {
    buffer: String,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.buffer.trim().is_empty()
    }

    /// Apply an editing key; returns true if the text changed
    ///
    /// Ignored entirely while `loading`.
    pub fn handle_key(&mut self, key: KeyEvent, loading: bool) -> bool {
        if loading {
            return false;
        }

        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let changed = !self.buffer.is_empty();
                self.buffer.clear();
                changed
            }
            KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => false,
            KeyCode::Char(c) => {
                self.buffer.push(c);
                true
            }
            KeyCode::Backspace => self.buffer.pop().is_some(),
            _ => false,
        }
    }

    /// Take the text for sending
    ///
    /// Returns the untrimmed text and clears the box, unless the text is
    /// blank or a send is already in progress, in which case nothing changes.
    pub fn submit(&mut self, loading: bool) -> Option<String> {
        if loading || self.is_blank() {
            return None;
        }
        Some(std::mem::take(&mut self.buffer))
    }
}

/// Renders a [`Composer`]
pub struct ComposerView<'a> {
    composer: &'a Composer,
    loading: bool,
}

impl<'a> ComposerView<'a> {
    pub fn new(composer: &'a Composer, loading: bool) -> Self {
        Self { composer, loading }
    }

    fn label(&self) -> (&'static str, Style) {
        if self.loading {
            (SENDING_LABEL, Style::default().fg(DIM_GRAY))
        } else if self.composer.is_blank() {
            (SEND_LABEL, Style::default().fg(DIM_GRAY))
        } else {
            (SEND_LABEL, Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
        }
    }
}

impl Widget for ComposerView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        // Separator with the send label at its right end
        let separator = "-".repeat(usize::from(area.width));
        buf.set_string(area.x, area.y, &separator, Style::default().fg(DIM_GRAY));

        let (label, label_style) = self.label();
        let label = format!("[ {label} ]");
        let label_width = u16::try_from(label.width()).unwrap_or(u16::MAX);
        if label_width + 2 <= area.width {
            buf.set_string(
                area.right() - label_width - 1,
                area.y,
                &label,
                label_style,
            );
        }

        let text_height = usize::from(area.height.saturating_sub(1));
        let text_width = usize::from(area.width.saturating_sub(1));
        if text_width < 5 || text_height < 1 {
            return;
        }

        let text_area_y = area.y + 1;

        if self.composer.text().is_empty() {
            let (text, style) = if self.loading {
                ("> ", Style::default().fg(DIM_GRAY))
            } else {
                ("> ", Style::default().fg(INPUT_TEXT))
            };
            buf.set_string(area.x, text_area_y, text, style);
            if !self.loading {
                buf.set_string(
                    area.x + 2,
                    text_area_y,
                    PLACEHOLDER,
                    Style::default().fg(DIM_GRAY).add_modifier(Modifier::ITALIC),
                );
            }
            return;
        }

        let full_input = if self.loading {
            format!("> {}", self.composer.text())
        } else {
            format!("> {}_", self.composer.text())
        };
        let wrapped: Vec<String> = textwrap::wrap(&full_input, text_width)
            .iter()
            .map(|s| s.to_string())
            .collect();

        // Most recent lines win
        let skip = wrapped.len().saturating_sub(text_height);
        let text_style = if self.loading {
            Style::default().fg(DIM_GRAY)
        } else {
            Style::default().fg(INPUT_TEXT)
        };

        for (row, line) in (text_area_y..area.bottom()).zip(wrapped.iter().skip(skip)) {
            buf.set_string(area.x, row, line, text_style);
        }

        if skip > 0 {
            buf.set_string(area.x + 1, area.y, "^", Style::default().fg(DIM_GRAY));
        }
    }
}
