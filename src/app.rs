use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use cryptoguide_core::{
    suggestions_for_selection, AnswerBackend, Config, InputBuffer, Protocol, ProtocolSelection,
    QueryDispatcher, SubmitOutcome, Suggestion,
};

use crate::tui::{self, AppEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Unknown,
    Online,
    /// Reachable, but its answering pipeline did not initialize.
    Degraded,
    Offline,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub selection: ProtocolSelection,
    pub input: InputBuffer,
    pub dispatcher: QueryDispatcher,

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the chat area, set during render
    pub chat_total_lines: u16,
    pub follow_bottom: bool,
    pub show_excerpts: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Backend
    pub backend_url: String,
    pub backend_status: BackendStatus,
    pub status_message: Option<String>,

    default_protocol: Protocol,
    query_task: Option<JoinHandle<SubmitOutcome>>,
    events: Option<mpsc::UnboundedSender<AppEvent>>,
}

impl App {
    pub fn new(
        backend: Arc<dyn AnswerBackend>,
        backend_url: impl Into<String>,
        default_protocol: Protocol,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            selection: ProtocolSelection::new(default_protocol),
            input: InputBuffer::new(),
            dispatcher: QueryDispatcher::new(backend),

            chat_scroll: 0,
            chat_height: 0,
            chat_total_lines: 0,
            follow_bottom: true,
            show_excerpts: false,

            animation_frame: 0,

            backend_url: backend_url.into(),
            backend_status: BackendStatus::Unknown,
            status_message: None,

            default_protocol,
            query_task: None,
            events: None,
        }
    }

    /// Connects the app to the event loop: conversation changes and health
    /// probe results arrive as events from now on.
    pub fn attach(&mut self, events: mpsc::UnboundedSender<AppEvent>) {
        tui::forward_conversation(self.dispatcher.store(), events.clone());
        self.events = Some(events);
        self.probe_backend();
    }

    pub fn is_loading(&self) -> bool {
        self.dispatcher.store().is_loading()
    }

    pub fn suggestions(&self) -> &'static [Suggestion] {
        suggestions_for_selection(&self.selection)
    }

    /// Sends the staged input. Ignored while a question is in flight or
    /// when the input is blank.
    pub fn submit(&mut self) {
        match self
            .dispatcher
            .submit_input(&mut self.input, &self.selection)
        {
            Ok(pending) => {
                self.status_message = None;
                self.input_mode = InputMode::Normal;
                self.follow_bottom = true;
                self.query_task = Some(tokio::spawn(pending.run()));
            }
            Err(reason) => debug!(?reason, "submission ignored"),
        }
    }

    /// Stages the n-th suggestion (zero-based) in the input without sending it.
    pub fn stage_suggestion(&mut self, index: usize) {
        if let Some(suggestion) = self.suggestions().get(index) {
            self.input.stage(suggestion.text);
            self.input_mode = InputMode::Editing;
        }
    }

    /// Throws the session away and starts a fresh one, like reloading a page.
    pub fn reload(&mut self) {
        if let Some(task) = self.query_task.take() {
            task.abort();
        }

        let backend = Arc::clone(self.dispatcher.backend());
        self.dispatcher = QueryDispatcher::new(backend);
        self.selection = ProtocolSelection::new(self.default_protocol);
        self.input.clear();
        self.input_mode = InputMode::Editing;
        self.chat_scroll = 0;
        self.chat_total_lines = 0;
        self.follow_bottom = true;
        self.show_excerpts = false;
        self.status_message = None;
        self.backend_status = BackendStatus::Unknown;
        info!("session reloaded");

        if let Some(events) = self.events.clone() {
            tui::forward_conversation(self.dispatcher.store(), events);
        }
        self.probe_backend();
    }

    fn probe_backend(&self) {
        let Some(events) = self.events.clone() else {
            return;
        };
        let backend = Arc::clone(self.dispatcher.backend());
        tokio::spawn(async move {
            let status = match backend.health().await {
                Ok(health) if health.is_ready() => BackendStatus::Online,
                Ok(health) => {
                    warn!(status = %health.status, "backend pipeline not ready");
                    BackendStatus::Degraded
                }
                Err(err) => {
                    warn!(error = %err, "backend health probe failed");
                    BackendStatus::Offline
                }
            };
            let _ = events.send(AppEvent::Health(status));
        });
    }

    /// Called whenever the conversation store changes.
    pub fn on_conversation_changed(&mut self) {
        if self
            .query_task
            .as_ref()
            .is_some_and(|task| task.is_finished())
        {
            self.query_task = None;
        }
        if self.follow_bottom {
            self.scroll_chat_to_bottom();
        }
    }

    pub fn save_default_protocol(&mut self) {
        let protocol = self.selection.selected();
        match Config::save_default_protocol(protocol) {
            Ok(()) => {
                self.default_protocol = protocol;
                self.status_message = Some(format!("{} saved as default", protocol.display_name()));
            }
            Err(err) => {
                warn!(error = %err, "could not save config");
                self.status_message = Some("Could not save config".to_string());
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling
    fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = (self.chat_scroll.saturating_add(lines)).min(self.max_scroll());
        self.follow_bottom = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_bottom = false;
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_chat_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_bottom = false;
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.follow_bottom = true;
    }

    pub fn input_title(&self) -> String {
        if self.selection.compare_mode() {
            format!(
                " Compare {} vs {}... ",
                self.selection.selected().display_name(),
                self.selection.compare_protocol().display_name()
            )
        } else {
            format!(" Ask about {}... ", self.selection.selected().display_name())
        }
    }
}
