//! Central runtime state for an interactive session.
//!
//! Everything the event loop mutates lives here: the transcript and its wire
//! history, the composer document with its trigger/menu state, the context
//! catalog, stream bookkeeping, and the modal picker. All mutation happens
//! synchronously inside one event handler at a time, so a menu commit and a
//! trigger re-evaluation can never interleave.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::api::{ChatMessage, UserProfile};
use crate::auth::SessionStatus;
use crate::core::catalog::ContextCatalog;
use crate::core::composer::{find_trigger, Document, MentionMenu};
use crate::core::message::Message;
use crate::logging::LoggingState;
use crate::ui::picker::PickerState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskMode {
    #[default]
    Agent,
    Research,
    Ask,
}

impl TaskMode {
    pub const ALL: [TaskMode; 3] = [TaskMode::Agent, TaskMode::Research, TaskMode::Ask];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskMode::Agent => "agent",
            TaskMode::Research => "research",
            TaskMode::Ask => "ask",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskMode::Agent => "Agent",
            TaskMode::Research => "Research",
            TaskMode::Ask => "Ask",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|task| task.as_str() == value)
    }
}

/// Everything a spawned stream task needs, handed out by [`App::begin_stream`].
pub struct StreamTicket {
    pub stream_id: u64,
    pub cancel_token: CancellationToken,
    pub api_messages: Vec<ChatMessage>,
}

pub struct App {
    pub transcript: Vec<Message>,
    pub document: Document,
    pub menu: MentionMenu,
    pub catalog: ContextCatalog,
    pub session: SessionStatus,
    pub profile: Option<UserProfile>,
    pub model: String,
    pub task: TaskMode,
    pub disabled: bool,
    pub logging: LoggingState,
    pub picker: Option<PickerState>,
    /// Lines scrolled up from the bottom of the transcript; 0 keeps the view
    /// pinned while streaming.
    pub scroll_from_bottom: u16,
    pub is_streaming: bool,

    api_history: Vec<ChatMessage>,
    current_stream_id: u64,
    cancel_token: Option<CancellationToken>,
    current_response: String,
    last_trigger_query: Option<String>,
    menu_dismissed: bool,
}

impl App {
    pub fn new(model: String, task: TaskMode, logging: LoggingState) -> Self {
        Self {
            transcript: Vec::new(),
            document: Document::new(),
            menu: MentionMenu::default(),
            catalog: ContextCatalog::new(),
            session: SessionStatus::signed_out(),
            profile: None,
            model,
            task,
            disabled: false,
            logging,
            picker: None,
            scroll_from_bottom: 0,
            is_streaming: false,
            api_history: Vec::new(),
            current_stream_id: 0,
            cancel_token: None,
            current_response: String::new(),
            last_trigger_query: None,
            menu_dismissed: false,
        }
    }

    // ---- composer wiring ----

    /// Re-evaluate trigger state after any content or caret change, refresh
    /// the candidate menu, reconcile mention-attached context, and start the
    /// debounce window when the query changed.
    pub fn refresh_after_edit(&mut self, now: Instant) {
        let query = find_trigger(&self.document.text_before_caret()).map(|m| m.query);

        if query != self.last_trigger_query {
            // A changed query lifts an Escape dismissal.
            self.menu_dismissed = false;
            if query.is_some() && self.session.authenticated {
                self.catalog.schedule_search(query.clone(), now);
            }
            self.last_trigger_query = query.clone();
        }

        let effective = if self.menu_dismissed { None } else { query };
        self.menu
            .refresh(effective.as_deref(), &self.catalog.mention_items());
        self.catalog.reconcile_mentions(&self.document.mention_ids());
    }

    /// Escape while the trigger is live: hide the menu until the query
    /// changes again.
    pub fn dismiss_menu(&mut self) {
        if self.menu.is_active() {
            self.menu_dismissed = true;
            self.menu.refresh(None, &[]);
        }
    }

    /// Commit the highlighted candidate: splice the token in, attach the
    /// referenced item, and drop the menu. Returns the committed pair.
    pub fn commit_selected_mention(&mut self) -> Option<(String, String)> {
        let item = self.menu.selected_item()?.clone();
        let trigger = find_trigger(&self.document.text_before_caret())?;
        self.document
            .commit_mention(trigger.len_chars(), &item.value, &item.label);
        self.catalog.note_mention_committed(&item.value);
        self.menu.close();
        self.last_trigger_query = None;
        self.menu_dismissed = false;
        self.catalog.reconcile_mentions(&self.document.mention_ids());
        Some((item.value, item.label))
    }

    /// The submission gate. Plain Enter lands here only when the menu is
    /// closed; an empty or whitespace-only document is a silent no-op that
    /// leaves all state untouched.
    pub fn submit(&mut self) -> Option<(String, String)> {
        if self.disabled || self.menu.is_open() {
            return None;
        }
        let raw_visible = self.document.visible_text();
        if raw_visible.trim().is_empty() {
            return None;
        }
        let processed = self.document.processed_text();
        let visible = raw_visible.trim().to_string();

        self.document.clear();
        self.refresh_after_edit(Instant::now());
        Some((visible, processed))
    }

    // ---- transcript / wire history ----

    /// Record a sent message: visible text in the transcript, processed text
    /// on the wire, and an empty assistant entry for the stream to fill.
    pub fn push_user_exchange(&mut self, visible: &str, processed: &str) {
        let message = Message::user(visible);
        let _ = self.logging.log_message(&message);
        self.transcript.push(message);
        self.transcript.push(Message::assistant(""));
        self.api_history.push(ChatMessage {
            role: "user".to_string(),
            content: processed.to_string(),
        });
    }

    pub fn push_app_info(&mut self, content: impl Into<String>) {
        self.transcript.push(Message::app_info(content));
    }

    pub fn push_app_error(&mut self, content: impl Into<String>) {
        self.transcript.push(Message::app_error(content));
    }

    // ---- streaming ----

    /// Start a new stream generation. Any previous stream becomes stale: its
    /// id stops matching and its chunks are ignored on arrival.
    pub fn begin_stream(&mut self) -> StreamTicket {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.current_stream_id += 1;
        self.current_response.clear();
        self.is_streaming = true;
        self.scroll_from_bottom = 0;

        let cancel_token = CancellationToken::new();
        self.cancel_token = Some(cancel_token.clone());
        StreamTicket {
            stream_id: self.current_stream_id,
            cancel_token,
            api_messages: self.api_history.clone(),
        }
    }

    fn is_current(&self, stream_id: u64) -> bool {
        stream_id == self.current_stream_id
    }

    /// Append a delta to the in-progress assistant message. Chunks from a
    /// superseded stream are dropped.
    pub fn apply_stream_chunk(&mut self, stream_id: u64, content: &str) -> bool {
        if !self.is_current(stream_id) || !self.is_streaming {
            return false;
        }
        self.current_response.push_str(content);
        if let Some(last) = self.transcript.last_mut() {
            if last.is_assistant() {
                last.content.push_str(content);
            }
        }
        true
    }

    pub fn apply_stream_error(&mut self, stream_id: u64, message: String) {
        if !self.is_current(stream_id) {
            return;
        }
        self.push_app_error(message);
    }

    /// The stream ended. The completed response joins the wire history so
    /// the next request carries it.
    pub fn finish_stream(&mut self, stream_id: u64) {
        if !self.is_current(stream_id) || !self.is_streaming {
            return;
        }
        self.is_streaming = false;
        self.cancel_token = None;
        self.record_assistant_response();
    }

    /// User-initiated stop: terminate the in-flight stream and keep the
    /// partial output — no rollback, no resend.
    pub fn cancel_stream(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if self.is_streaming {
            self.is_streaming = false;
            self.record_assistant_response();
        }
    }

    fn record_assistant_response(&mut self) {
        if self.current_response.is_empty() {
            return;
        }
        let message = Message::assistant(self.current_response.clone());
        let _ = self.logging.log_message(&message);
        self.api_history.push(ChatMessage {
            role: "assistant".to_string(),
            content: self.current_response.clone(),
        });
        self.current_response.clear();
    }

    // ---- scrollback ----

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    pub fn pin_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }

    #[cfg(test)]
    pub fn api_history(&self) -> &[ChatMessage] {
        &self.api_history
    }
}
