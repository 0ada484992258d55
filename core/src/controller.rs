//! Chat Controller - The Client State Core
//!
//! The controller owns everything the chat surface displays:
//! - The message list (append-only, arrival order)
//! - The loading flag
//! - The session's user id
//! - The watermark (id of the newest message, cursor for the next fetch)
//!
//! # Execution Model
//!
//! Nothing here blocks. Network calls run on spawned tasks and report back
//! as [`ControllerEvent`]s on an internal channel; poll timer ticks arrive on
//! the same channel. The owning loop feeds each event back through
//! [`ChatController::apply`], so all state changes happen one at a time on a
//! single task and no locking is needed.
//!
//! ```ignore
//! let mut controller = ChatController::new(Arc::new(api), ControllerConfig::default());
//! controller.initialize(&store)?;
//!
//! loop {
//!     tokio::select! {
//!         Some(event) = controller.next_event() => {
//!             let change = controller.apply(event);
//!             if change.messages { /* scroll to newest */ }
//!         }
//!         // ... terminal input, frame ticks
//!     }
//! }
//! ```
//!
//! # Fetch Discipline
//!
//! At most one fetch is outstanding at a time:
//! - A poll tick that fires while a fetch is in flight is dropped; the next
//!   tick retries from the same cursor.
//! - A post-send refresh requested while a fetch is in flight is queued and
//!   dispatched as soon as the slot frees, from the watermark current at that
//!   moment.
//! - An identity change starts a new initial load that supersedes anything in
//!   flight; results of superseded fetches are discarded.
//!
//! This keeps two fetches from the same cursor from appending the same page
//! twice.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::api::{ApiError, ChatApi};
use crate::identity::{get_or_create_user_id, KeyValueStore, StorageError};
use crate::message::{Message, MessageId, UserId};
use crate::timer::PollTimer;

/// Default period between poll ticks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Controller configuration
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Period of the recurring fetch
    pub poll_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Why a fetch was issued
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchKind {
    /// Full history load after identity is resolved
    Initial,
    /// Timer-driven incremental fetch
    Poll,
    /// Immediate incremental fetch after successful sends
    Refresh {
        /// Number of sends that finish when this fetch completes
        senders: usize,
    },
}

/// A dispatched fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    /// Why it was issued
    pub kind: FetchKind,
    /// Exclusive lower bound that was requested
    pub from: MessageId,
    /// Initial-load generation it belongs to
    pub generation: u64,
}

/// Completions and ticks delivered to the owning loop
#[derive(Debug)]
pub enum ControllerEvent {
    /// A poll timer fired
    Tick {
        /// Which timer sent it; ticks from a cancelled timer are ignored
        timer: u64,
    },
    /// A fetch finished
    Fetched {
        /// The request that produced this result
        request: FetchRequest,
        /// Page of messages or the failure
        result: Result<Vec<Message>, ApiError>,
    },
    /// A message create finished
    Posted {
        /// Success or the failure
        result: Result<(), ApiError>,
    },
}

/// What an applied event changed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StateChange {
    /// The message list grew or was replaced
    pub messages: bool,
    /// The loading flag flipped
    pub loading: bool,
}

impl StateChange {
    /// Whether anything visible changed
    #[must_use]
    pub fn any(self) -> bool {
        self.messages || self.loading
    }

    /// Combine two changes
    #[must_use]
    pub fn merge(self, other: StateChange) -> StateChange {
        StateChange {
            messages: self.messages || other.messages,
            loading: self.loading || other.loading,
        }
    }
}

/// The chat controller
pub struct ChatController<A: ChatApi + 'static> {
    /// Server API
    api: Arc<A>,
    /// Configuration
    config: ControllerConfig,
    /// Messages in arrival order
    messages: Vec<Message>,
    /// Resolved session identity
    user_id: Option<UserId>,
    /// Initial load outstanding
    initial_loading: bool,
    /// Sends not yet finished (post and follow-up refresh)
    pending_sends: usize,
    /// The single outstanding fetch, if any
    in_flight: Option<FetchRequest>,
    /// Successful sends waiting for a refresh to be dispatched
    queued_refresh: usize,
    /// Bumped by every initial load
    generation: u64,
    /// Recurring fetch timer
    poll_timer: Option<PollTimer>,
    /// Id handed to the most recently started timer
    timer_id: u64,
    /// Event channel (spawned tasks and timer hold clones of the sender)
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
}

impl<A: ChatApi + 'static> ChatController<A> {
    /// Create a controller; nothing happens until an identity is set
    pub fn new(api: Arc<A>, config: ControllerConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            api,
            config,
            messages: Vec::new(),
            user_id: None,
            initial_loading: false,
            pending_sends: 0,
            in_flight: None,
            queued_refresh: 0,
            generation: 0,
            poll_timer: None,
            timer_id: 0,
            events_tx,
            events_rx,
        }
    }

    // =========================================================================
    // State accessors
    // =========================================================================

    /// Messages in arrival order
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True while the initial load or a send is outstanding
    #[must_use]
    pub fn loading(&self) -> bool {
        self.initial_loading || self.pending_sends > 0
    }

    /// The session identity, once resolved
    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// Id of the newest message, `None` while the list is empty
    #[must_use]
    pub fn last_message_id(&self) -> Option<MessageId> {
        self.messages.last().map(|m| m.id.clone())
    }

    /// Whether the poll timer is running
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poll_timer.as_ref().is_some_and(PollTimer::is_active)
    }

    /// The outstanding fetch, if any
    #[must_use]
    pub fn fetch_in_flight(&self) -> Option<FetchRequest> {
        self.in_flight.clone()
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Cursor for the next incremental fetch
    fn watermark(&self) -> MessageId {
        self.last_message_id().unwrap_or(MessageId::ZERO)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Resolve the session identity from `store` and start chatting
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be read or persisted.
    pub fn initialize(&mut self, store: &dyn KeyValueStore) -> Result<UserId, StorageError> {
        let user_id = get_or_create_user_id(store)?;
        self.set_user_id(user_id.clone());
        Ok(user_id)
    }

    /// Set the session identity
    ///
    /// On a new identity the poll timer is restarted and the full history is
    /// loaded again. Setting the current identity again does nothing.
    /// Returns whether the identity changed.
    pub fn set_user_id(&mut self, user_id: UserId) -> bool {
        if self.user_id.as_ref() == Some(&user_id) {
            return false;
        }

        tracing::info!(user_id = %user_id, "Session identity set");
        self.user_id = Some(user_id);
        self.restart_polling();
        self.load_initial();
        true
    }

    /// Cancel the poll timer
    ///
    /// Polling stays off until the identity changes.
    pub fn stop_polling(&mut self) {
        if let Some(timer) = self.poll_timer.take() {
            timer.cancel();
        }
    }

    fn restart_polling(&mut self) {
        self.stop_polling();
        self.timer_id += 1;
        self.poll_timer = Some(PollTimer::start(
            self.config.poll_interval,
            self.timer_id,
            self.events_tx.clone(),
        ));
    }

    fn load_initial(&mut self) {
        self.generation += 1;
        self.initial_loading = true;
        self.dispatch_fetch(FetchKind::Initial, MessageId::ZERO);
    }

    /// Fetch messages newer than the watermark
    ///
    /// Dropped (returns `false`) before an identity is set or while another
    /// fetch is outstanding.
    pub fn poll_tick(&mut self) -> bool {
        if self.user_id.is_none() {
            return false;
        }
        if let Some(in_flight) = &self.in_flight {
            tracing::trace!(?in_flight, "Fetch already in flight, skipping poll tick");
            return false;
        }

        self.dispatch_fetch(FetchKind::Poll, self.watermark());
        true
    }

    /// Post a message
    ///
    /// Whitespace-only content and sends before an identity is set are
    /// ignored (returns `false`) without touching the network. Otherwise the
    /// controller is loading until the post, and on success the follow-up
    /// refresh, have completed.
    pub fn send(&mut self, content: &str) -> bool {
        if content.trim().is_empty() {
            return false;
        }
        let Some(user_id) = self.user_id.clone() else {
            tracing::warn!("Cannot send before the session identity is resolved");
            return false;
        };

        self.pending_sends += 1;

        let message = Message::outgoing(user_id, content);
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = api.post_message(&message).await;
            let _ = tx.send(ControllerEvent::Posted { result });
        });

        tracing::debug!(len = content.len(), "Message send dispatched");
        true
    }

    fn dispatch_fetch(&mut self, kind: FetchKind, from: MessageId) {
        let request = FetchRequest {
            kind,
            from,
            generation: self.generation,
        };
        self.in_flight = Some(request.clone());

        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = api.fetch_messages(request.from.clone()).await;
            let _ = tx.send(ControllerEvent::Fetched { request, result });
        });
    }

    /// Dispatch a queued refresh if the fetch slot is free
    fn dispatch_queued_refresh(&mut self) {
        if self.in_flight.is_none() && self.queued_refresh > 0 {
            let senders = std::mem::take(&mut self.queued_refresh);
            self.dispatch_fetch(FetchKind::Refresh { senders }, self.watermark());
        }
    }

    // =========================================================================
    // Event handling
    // =========================================================================

    /// Wait for the next completion or tick
    ///
    /// Cancel-safe: dropping the future loses nothing.
    pub async fn next_event(&mut self) -> Option<ControllerEvent> {
        self.events_rx.recv().await
    }

    /// Wait for the next event and apply it
    pub async fn step(&mut self) -> StateChange {
        match self.next_event().await {
            Some(event) => self.apply(event),
            None => StateChange::default(),
        }
    }

    /// Apply every event that is already waiting, without blocking
    pub fn process_pending(&mut self) -> StateChange {
        let mut change = StateChange::default();
        while let Ok(event) = self.events_rx.try_recv() {
            change = change.merge(self.apply(event));
        }
        change
    }

    /// Apply one event to the controller state
    pub fn apply(&mut self, event: ControllerEvent) -> StateChange {
        let was_loading = self.loading();

        let messages = match event {
            ControllerEvent::Tick { timer } => {
                if self.poll_timer.as_ref().is_some_and(|t| t.id() == timer) {
                    self.poll_tick();
                } else {
                    tracing::trace!(timer, "Ignoring tick from a stopped timer");
                }
                false
            }
            ControllerEvent::Posted { result } => {
                self.on_posted(result);
                false
            }
            ControllerEvent::Fetched { request, result } => self.on_fetched(request, result),
        };

        StateChange {
            messages,
            loading: was_loading != self.loading(),
        }
    }

    fn on_posted(&mut self, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                // Refresh right away instead of waiting for the next tick
                self.queued_refresh += 1;
                self.dispatch_queued_refresh();
            }
            Err(e) => {
                tracing::error!(error = %e, "Error sending message");
                self.finish_sends(1);
            }
        }
    }

    fn on_fetched(
        &mut self,
        request: FetchRequest,
        result: Result<Vec<Message>, ApiError>,
    ) -> bool {
        let stale = request.generation != self.generation;
        if !stale {
            self.in_flight = None;
        }

        let mut changed = false;
        match result {
            Ok(page) if stale => {
                tracing::debug!(
                    count = page.len(),
                    ?request,
                    "Discarding result of superseded fetch"
                );
            }
            Ok(page) => changed = self.apply_page(request.kind, page),
            Err(e) => match request.kind {
                FetchKind::Initial => {
                    tracing::warn!(error = %e, "Error loading initial messages");
                }
                FetchKind::Poll | FetchKind::Refresh { .. } => {
                    tracing::warn!(error = %e, from = %request.from, "Error fetching messages");
                }
            },
        }

        match request.kind {
            FetchKind::Initial if !stale => self.initial_loading = false,
            FetchKind::Refresh { senders } => self.finish_sends(senders),
            _ => {}
        }

        self.dispatch_queued_refresh();
        changed
    }

    /// Incorporate a page; returns whether the list changed
    fn apply_page(&mut self, kind: FetchKind, page: Vec<Message>) -> bool {
        if page.is_empty() {
            return false;
        }

        match kind {
            FetchKind::Initial => {
                tracing::info!(count = page.len(), "Loaded initial messages");
                self.messages = page;
            }
            FetchKind::Poll | FetchKind::Refresh { .. } => {
                tracing::debug!(count = page.len(), "Received new messages");
                self.messages.extend(page);
            }
        }
        true
    }

    fn finish_sends(&mut self, count: usize) {
        self.pending_sends = self.pending_sends.saturating_sub(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    /// Records calls; serves scripted fetch pages
    #[derive(Default)]
    struct ScriptedApi {
        pages: Mutex<Vec<Vec<Message>>>,
        fetches: Mutex<Vec<MessageId>>,
        posts: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl ChatApi for ScriptedApi {
        async fn fetch_messages(&self, from: MessageId) -> Result<Vec<Message>, ApiError> {
            self.fetches.lock().push(from);
            let mut pages = self.pages.lock();
            Ok(if pages.is_empty() {
                Vec::new()
            } else {
                pages.remove(0)
            })
        }

        async fn post_message(&self, message: &Message) -> Result<(), ApiError> {
            self.posts.lock().push(message.clone());
            Ok(())
        }
    }

    fn msg(id: u64, user: &str, content: &str) -> Message {
        Message::new(MessageId::Number(id), user, content)
    }

    #[tokio::test]
    async fn test_nothing_happens_before_identity() {
        let api = Arc::new(ScriptedApi::default());
        let mut controller = ChatController::new(api.clone(), ControllerConfig::default());

        assert!(!controller.poll_tick());
        assert!(!controller.send("hello"));
        assert!(!controller.is_polling());
        assert!(!controller.loading());
        assert!(api.fetches.lock().is_empty());
    }

    #[tokio::test]
    async fn test_initial_load_sets_messages_and_watermark() {
        let api = Arc::new(ScriptedApi::default());
        api.pages.lock().push(vec![msg(1, "a", "hi")]);
        let mut controller = ChatController::new(api.clone(), ControllerConfig::default());

        assert!(controller.set_user_id(UserId::new("me")));
        assert!(controller.loading());
        assert!(controller.is_polling());

        let change = controller.step().await;
        assert_eq!(change, StateChange { messages: true, loading: true });
        assert!(!controller.loading());
        assert_eq!(controller.messages(), &[msg(1, "a", "hi")]);
        assert_eq!(controller.last_message_id(), Some(MessageId::Number(1)));
        assert_eq!(*api.fetches.lock(), vec![MessageId::ZERO]);
    }

    #[tokio::test]
    async fn test_same_identity_is_noop() {
        let api = Arc::new(ScriptedApi::default());
        let mut controller = ChatController::new(api.clone(), ControllerConfig::default());

        assert!(controller.set_user_id(UserId::new("me")));
        controller.step().await;
        assert!(!controller.set_user_id(UserId::new("me")));
        assert!(controller.fetch_in_flight().is_none());
    }

    #[tokio::test]
    async fn test_poll_tick_dropped_while_fetch_in_flight() {
        let api = Arc::new(ScriptedApi::default());
        let mut controller = ChatController::new(api.clone(), ControllerConfig::default());
        controller.set_user_id(UserId::new("me"));

        // Initial load still outstanding
        assert!(!controller.poll_tick());
        controller.step().await;
        assert!(controller.poll_tick());
        assert!(!controller.poll_tick());
    }

    #[tokio::test]
    async fn test_whitespace_send_never_reaches_network() {
        let api = Arc::new(ScriptedApi::default());
        let mut controller = ChatController::new(api.clone(), ControllerConfig::default());
        controller.set_user_id(UserId::new("me"));
        controller.step().await;

        assert!(!controller.send("   \t\n"));
        assert!(!controller.send(""));
        assert!(!controller.loading());
        assert!(api.posts.lock().is_empty());
    }

    #[test]
    fn test_state_change_merge() {
        let a = StateChange { messages: true, loading: false };
        let b = StateChange { messages: false, loading: true };
        assert_eq!(a.merge(b), StateChange { messages: true, loading: true });
        assert!(!StateChange::default().any());
    }
}
