//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, mouse, resize)
//! - ChatController for polling and sending
//! - Composer and message list state for rendering
//!
//! Everything runs on one task. The loop waits on whichever comes first:
//! a terminal event, a controller event (fetch/post completion or poll
//! tick), or the frame tick that drives the scroll animation. The screen is
//! redrawn after each of them.

use std::time::Duration;

use crossterm::event::{
    Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};

use chat_core::{ChatApi, ChatController, ControllerEvent, StateChange};

use crate::theme::{ACCENT, DIM_GRAY, LOADING_YELLOW};
use crate::widgets::{Composer, ComposerView, MessageList, MessageListState};

/// Window title
pub const TITLE: &str = "Anonymous chat";

/// Shown while the controller is loading
pub const LOADING_TEXT: &str = "Loading...";

/// Input box height (separator plus text lines)
const INPUT_HEIGHT: u16 = 4;

/// Frame tick for animations
const FRAME_DURATION: Duration = Duration::from_millis(60);

/// Lines per mouse wheel notch
const WHEEL_LINES: usize = 3;

/// Main application state
pub struct App<A: ChatApi + 'static> {
    /// Is the app still running?
    running: bool,
    /// Chat state and network orchestration
    controller: ChatController<A>,
    /// Text being typed
    composer: Composer,
    /// Message pane scroll position
    list_state: MessageListState,
    /// Server shown in the status bar
    server_label: String,
}

impl<A: ChatApi + 'static> App<A> {
    /// Create an app around an already initialised controller
    pub fn new(controller: ChatController<A>, server_label: impl Into<String>) -> Self {
        Self {
            running: true,
            controller,
            composer: Composer::new(),
            list_state: MessageListState::new(),
            server_label: server_label.into(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn controller(&self) -> &ChatController<A> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ChatController<A> {
        &mut self.controller
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn list_state(&self) -> &MessageListState {
        &self.list_state
    }

    /// Main event loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        // Create async event stream for non-blocking terminal events
        let mut event_stream = EventStream::new();

        // Render initial frame immediately so user sees UI
        terminal.draw(|frame| self.draw(frame))?;

        while self.running {
            tokio::select! {
                biased;

                // Terminal events - highest priority
                maybe_event = event_stream.next() => match maybe_event {
                    Some(Ok(event)) => self.handle_terminal_event(event),
                    Some(Err(e)) => tracing::warn!(error = %e, "Terminal event error"),
                    None => {
                        tracing::info!("Terminal event stream closed");
                        self.running = false;
                    }
                },

                // Fetch/post completions and poll ticks
                Some(event) = self.controller.next_event() => {
                    self.handle_controller_event(event);
                }

                // Frame tick - keeps animations moving
                () = tokio::time::sleep(FRAME_DURATION) => {}
            }

            self.update();
            terminal.draw(|frame| self.draw(frame))?;
        }

        tracing::info!("Chat UI exiting");
        Ok(())
    }

    fn handle_terminal_event(&mut self, event: Event) {
        match event {
            // Only handle Press events (not Release or Repeat)
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            // Layout is recomputed from the frame area on every draw
            _ => {}
        }
    }

    /// Apply a controller event and react to what it changed
    pub fn handle_controller_event(&mut self, event: ControllerEvent) {
        let change = self.controller.apply(event);
        self.on_state_change(change);
    }

    fn on_state_change(&mut self, change: StateChange) {
        if change.messages && !self.controller.messages().is_empty() {
            self.list_state.follow_latest();
        }
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            // Quit
            KeyCode::Esc => self.running = false,
            KeyCode::Char('c') if ctrl => self.running = false,

            // Submit message
            KeyCode::Enter => {
                if let Some(content) = self.composer.submit(self.controller.loading()) {
                    if self.controller.send(&content) {
                        tracing::debug!(len = content.len(), "Message submitted");
                    }
                }
            }

            // Conversation scrolling
            KeyCode::PageUp => {
                let page = self.list_state.page_size();
                self.list_state.scroll_up(page);
            }
            KeyCode::PageDown => {
                let page = self.list_state.page_size();
                self.list_state.scroll_down(page);
            }
            KeyCode::Home if ctrl => self.list_state.scroll_to_top(),
            KeyCode::End if ctrl => self.list_state.scroll_to_bottom(),

            // Typing
            _ => {
                self.composer.handle_key(key, self.controller.loading());
            }
        }
    }

    /// Handle mouse input
    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.list_state.scroll_up(WHEEL_LINES),
            MouseEventKind::ScrollDown => self.list_state.scroll_down(WHEEL_LINES),
            _ => {}
        }
    }

    /// Update animations
    pub fn update(&mut self) {
        self.list_state.tick();
    }

    /// Render the UI
    pub fn draw(&mut self, frame: &mut Frame) {
        let loading = self.controller.loading();

        let [title_area, loading_area, list_area, input_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let title = Paragraph::new(Line::from(Span::styled(
            TITLE,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(title, title_area);

        if loading {
            let indicator = Paragraph::new(Span::styled(
                LOADING_TEXT,
                Style::default().fg(LOADING_YELLOW),
            ))
            .alignment(Alignment::Center);
            frame.render_widget(indicator, loading_area);
        }

        frame.render_stateful_widget(
            MessageList::new(self.controller.messages(), self.controller.user_id()),
            list_area,
            &mut self.list_state,
        );

        frame.render_widget(ComposerView::new(&self.composer, loading), input_area);

        frame.render_widget(
            Paragraph::new(self.status_line()).style(Style::default().fg(DIM_GRAY)),
            status_area,
        );
    }

    fn status_line(&self) -> String {
        let scroll_info = match self.list_state.scroll_offset() {
            0 => String::new(),
            lines => format!(" [^{lines} lines - Ctrl+End for latest]"),
        };

        format!(
            " {} | Enter send | PgUp/PgDn scroll | Esc quit{}",
            self.server_label, scroll_info
        )
    }
}
