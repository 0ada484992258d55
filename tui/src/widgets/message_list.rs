//! MessageList Widget
//!
//! Renders the conversation as chat bubbles. Own messages sit on the right
//! with a fixed pale green background; everyone else sits on the left with
//! white text on a colour derived from their user id.
//!
//! Layout is a pure function of the messages, the current user and the pane
//! width ([`layout_messages`]). The only state carried between frames is the
//! scroll position in [`MessageListState`].

use std::collections::HashMap;

use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::StatefulWidget;
use textwrap::wrap;
use unicode_width::UnicodeWidthStr;

use chat_core::{Message, UserId};

use crate::theme::{OTHER_BUBBLE_FG, OWN_BUBBLE_BG, OWN_BUBBLE_FG, SCROLL_HINT};

/// Number of trailing user id characters that pick an author colour
const COLOR_SUFFIX_LEN: usize = 6;

/// Whose message a bubble shows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BubbleKind {
    /// Written by the current user
    Own,
    /// Written by someone else
    Other,
}

/// Resolved appearance of one message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BubbleStyle {
    pub kind: BubbleKind,
    pub background: Color,
    pub foreground: Color,
}

impl BubbleStyle {
    /// Own bubbles hug the right edge
    pub fn alignment(&self) -> Alignment {
        match self.kind {
            BubbleKind::Own => Alignment::Right,
            BubbleKind::Other => Alignment::Left,
        }
    }

    pub fn style(&self) -> Style {
        Style::default().fg(self.foreground).bg(self.background)
    }
}

/// Colour for an author, from the last six characters of their id
///
/// Six hex digits are used directly as `#rrggbb`. Anything else is hashed,
/// so the same suffix always yields the same colour.
pub fn author_color(user_id: &str) -> Color {
    let chars: Vec<char> = user_id.chars().collect();
    let suffix: String = chars[chars.len().saturating_sub(COLOR_SUFFIX_LEN)..]
        .iter()
        .collect();

    if suffix.len() == COLOR_SUFFIX_LEN && suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        if let Ok(rgb) = u32::from_str_radix(&suffix, 16) {
            let [_, r, g, b] = rgb.to_be_bytes();
            return Color::Rgb(r, g, b);
        }
    }

    hashed_color(&suffix)
}

/// FNV-1a over the key, each channel squeezed into 48..192
fn hashed_color(key: &str) -> Color {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in key.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }

    let [_, r, g, b] = hash.to_be_bytes();
    let squeeze = |channel: u8| 48 + channel % 144;
    Color::Rgb(squeeze(r), squeeze(g), squeeze(b))
}

/// Style for one message, memoising author colours in `palette`
pub fn bubble_style(
    message: &Message,
    current_user: Option<&UserId>,
    palette: &mut HashMap<String, Color>,
) -> BubbleStyle {
    if current_user.is_some_and(|me| message.is_from(me)) {
        return BubbleStyle {
            kind: BubbleKind::Own,
            background: OWN_BUBBLE_BG,
            foreground: OWN_BUBBLE_FG,
        };
    }

    let background = *palette
        .entry(message.user_id.as_str().to_string())
        .or_insert_with(|| author_color(message.user_id.as_str()));

    BubbleStyle {
        kind: BubbleKind::Other,
        background,
        foreground: OTHER_BUBBLE_FG,
    }
}

/// Widest a bubble may get: three quarters of the pane
pub fn max_bubble_width(pane_width: u16) -> usize {
    (usize::from(pane_width) * 3 / 4).max(3)
}

/// Lay every message out as bubble lines, one blank line between messages
///
/// The colour map is rebuilt on every call.
pub fn layout_messages(
    messages: &[Message],
    current_user: Option<&UserId>,
    pane_width: u16,
) -> Vec<Line<'static>> {
    let mut palette = HashMap::new();
    // One column of padding on each side
    let text_width = max_bubble_width(pane_width).saturating_sub(2).max(1);

    let mut lines = Vec::new();
    for message in messages {
        let style = bubble_style(message, current_user, &mut palette);
        let wrapped = wrap_content(&message.content, text_width);
        let inner_width = wrapped.iter().map(|l| l.width()).max().unwrap_or(0);

        for text in wrapped {
            let pad = " ".repeat(inner_width - text.width());
            let body = format!(" {text}{pad} ");
            lines.push(Line::from(Span::styled(body, style.style())).alignment(style.alignment()));
        }
        lines.push(Line::default());
    }
    lines
}

fn wrap_content(content: &str, width: usize) -> Vec<String> {
    let mut wrapped: Vec<String> = content
        .lines()
        .flat_map(|line| {
            if line.is_empty() {
                vec![String::new()]
            } else {
                wrap(line, width)
                    .into_iter()
                    .map(|cow| cow.to_string())
                    .collect()
            }
        })
        .collect();

    if wrapped.is_empty() {
        wrapped.push(String::new());
    }
    wrapped
}

/// Scroll position of the message pane
#[derive(Debug, Default)]
pub struct MessageListState {
    /// Scroll offset (lines from bottom, 0 = latest)
    scroll_offset: usize,
    /// Total content lines at the last render
    total_lines: usize,
    /// Pane height at the last render
    viewport_height: usize,
    /// Animating back to the newest message
    following: bool,
}

impl MessageListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    /// Furthest the pane can scroll up
    pub fn max_scroll(&self) -> usize {
        self.total_lines.saturating_sub(self.viewport_height)
    }

    /// Half a pane, at least one line
    pub fn page_size(&self) -> usize {
        (self.viewport_height / 2).max(1)
    }

    /// Scroll towards older messages
    pub fn scroll_up(&mut self, lines: usize) {
        self.following = false;
        self.scroll_offset = (self.scroll_offset + lines).min(self.max_scroll());
    }

    /// Scroll towards newer messages
    pub fn scroll_down(&mut self, lines: usize) {
        self.following = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_top(&mut self) {
        self.following = false;
        self.scroll_offset = self.max_scroll();
    }

    /// Jump to the newest message
    pub fn scroll_to_bottom(&mut self) {
        self.following = false;
        self.scroll_offset = 0;
    }

    /// Glide to the newest message over the next few frames
    pub fn follow_latest(&mut self) {
        self.following = self.scroll_offset > 0;
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    /// Advance the glide by one frame; returns true while moving
    pub fn tick(&mut self) -> bool {
        if !self.following {
            return false;
        }

        // Halve the remaining distance each frame
        let step = self.scroll_offset.div_ceil(2).max(1);
        self.scroll_offset = self.scroll_offset.saturating_sub(step);
        if self.scroll_offset == 0 {
            self.following = false;
        }
        true
    }
}

/// The scrollable message pane
pub struct MessageList<'a> {
    messages: &'a [Message],
    current_user: Option<&'a UserId>,
}

impl<'a> MessageList<'a> {
    pub fn new(messages: &'a [Message], current_user: Option<&'a UserId>) -> Self {
        Self {
            messages,
            current_user,
        }
    }
}

impl StatefulWidget for MessageList<'_> {
    type State = MessageListState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let lines = layout_messages(self.messages, self.current_user, area.width);
        let height = usize::from(area.height);

        state.total_lines = lines.len();
        state.viewport_height = height;
        state.scroll_offset = state.scroll_offset.min(state.max_scroll());

        let visible_end = state.total_lines - state.scroll_offset;
        let visible_start = visible_end.saturating_sub(height);

        for (row, line) in (area.y..area.bottom()).zip(&lines[visible_start..visible_end]) {
            let line_width = u16::try_from(line.width()).unwrap_or(u16::MAX).min(area.width);
            let x = match line.alignment {
                Some(Alignment::Right) => area.right() - line_width,
                _ => area.x,
            };
            buf.set_line(x, row, line, area.right() - x);
        }

        let hint = Style::default().fg(SCROLL_HINT);
        if visible_start > 0 {
            buf.set_string(area.right() - 1, area.y, "▲", hint);
        }
        if state.scroll_offset > 0 {
            buf.set_string(area.right() - 1, area.bottom() - 1, "▼", hint);
        }
    }
}
