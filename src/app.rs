use crate::api::InferenceBackend;
use crate::conversation::{ConversationStore, Rejection};
use crate::errors::{InferenceError, StoreError};
use crate::models::InferenceResult;
use crate::status_indicator::StatusIndicator;
use log::debug;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

pub type InferenceReply = Result<InferenceResult, InferenceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    History,
}

/// A prompt accepted by the store, ready to be sent on its own task.
pub struct PendingRequest {
    pub prompt: String,
    pub backend: Arc<dyn InferenceBackend>,
    pub cancel: CancellationToken,
}

/// Runs the request and posts the reply back to the UI loop.
pub fn dispatch(request: PendingRequest, replies: UnboundedSender<InferenceReply>) {
    tokio::spawn(async move {
        let result = request
            .backend
            .infer_cancellable(&request.prompt, &request.cancel)
            .await;
        // the receiver only goes away when the app is shutting down
        let _ = replies.send(result);
    });
}

pub struct App {
    pub store: ConversationStore,
    pub input: String,
    pub focus: Focus,
    pub selected_history: usize,
    /// Lines scrolled up from the bottom of the conversation.
    pub chat_scroll: u16,
    pub status_indicator: StatusIndicator,
    pub should_quit: bool,
    pending: Option<CancellationToken>,
}

impl App {
    pub fn new(store: ConversationStore) -> App {
        App {
            store,
            input: String::new(),
            focus: Focus::Input,
            selected_history: 0,
            chat_scroll: 0,
            status_indicator: StatusIndicator::new(),
            should_quit: false,
            pending: None,
        }
    }

    /// Hands the typed prompt to the store. Returns the request to dispatch when
    /// the store accepted it.
    pub fn submit_input(&mut self) -> Option<PendingRequest> {
        match self.store.begin_submit(&self.input) {
            Ok(prompt) => {
                self.input.clear();
                self.chat_scroll = 0;
                self.status_indicator.clear_status();
                self.status_indicator.set_thinking(true);
                let cancel = CancellationToken::new();
                self.pending = Some(cancel.clone());
                Some(PendingRequest {
                    prompt,
                    backend: self.store.backend(),
                    cancel,
                })
            }
            Err(Rejection::Blank) => None,
            Err(Rejection::Busy) => {
                self.status_indicator
                    .set_status("Still waiting for the previous reply");
                None
            }
        }
    }

    pub fn apply_reply(&mut self, reply: InferenceReply) {
        self.pending = None;
        self.status_indicator.set_thinking(false);
        match self.store.finish_submit(reply) {
            Ok(()) => {
                self.status_indicator.clear_status();
                self.chat_scroll = 0;
            }
            Err(InferenceError::Cancelled) => {
                self.status_indicator.set_status("Request cancelled");
            }
            Err(e) => {
                self.status_indicator
                    .set_error(format!("Request failed ({}): {}", e.reason(), e));
            }
        }
    }

    /// Cancels the in-flight request, if any. Returns whether one was pending.
    pub fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(token) => {
                debug!("Cancelling pending request");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn new_chat(&mut self) {
        match self.store.start_new_chat() {
            Ok(()) => {
                self.chat_scroll = 0;
                self.focus = Focus::Input;
                self.status_indicator.set_status("Started a new chat");
            }
            Err(e) => self.report_store_error(e),
        }
    }

    pub fn open_selected(&mut self) {
        match self.store.select_history(self.selected_history) {
            Ok(()) => {
                self.chat_scroll = 0;
                self.focus = Focus::Input;
                self.status_indicator.clear_status();
            }
            Err(e) => self.report_store_error(e),
        }
    }

    pub fn delete_selected(&mut self) {
        match self.store.delete_history(self.selected_history) {
            Ok(()) => {
                let len = self.store.history().len();
                if self.selected_history >= len {
                    self.selected_history = len.saturating_sub(1);
                }
                self.status_indicator.set_status("Conversation deleted");
            }
            Err(e) => self.report_store_error(e),
        }
    }

    pub fn select_previous(&mut self) {
        self.selected_history = self.selected_history.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        let len = self.store.history().len();
        if self.selected_history + 1 < len {
            self.selected_history += 1;
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input if !self.store.history().is_empty() => Focus::History,
            _ => Focus::Input,
        };
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(3);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(3);
    }

    fn report_store_error(&mut self, e: StoreError) {
        match e {
            StoreError::Busy => self
                .status_indicator
                .set_status("Wait for the reply or press Esc to cancel"),
            StoreError::Index(e) => self.status_indicator.set_error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status_indicator::StatusKind;
    use crate::storage::MemoryStore;
    use crate::testing::{reply, ScriptedBackend};

    fn app() -> App {
        App::new(ConversationStore::new(
            ScriptedBackend::with(vec![]),
            Box::new(MemoryStore::new()),
        ))
    }

    #[test]
    fn test_submit_input_clears_input_and_marks_busy() {
        let mut app = app();
        app.input = "Hello".to_string();

        let request = app.submit_input().expect("accepted");

        assert_eq!(request.prompt, "Hello");
        assert!(app.input.is_empty());
        assert!(app.store.is_busy());
        assert!(app.status_indicator.is_thinking());
    }

    #[test]
    fn test_blank_input_is_not_sent() {
        let mut app = app();
        app.input = "   ".to_string();
        assert!(app.submit_input().is_none());
        assert_eq!(app.input, "   ");
    }

    #[test]
    fn test_busy_input_is_kept() {
        let mut app = app();
        app.input = "first".to_string();
        app.submit_input().unwrap();
        app.input = "second".to_string();

        assert!(app.submit_input().is_none());
        assert_eq!(app.input, "second");
    }

    #[test]
    fn test_apply_reply_error_shows_reason() {
        let mut app = app();
        app.input = "Hello".to_string();
        app.submit_input().unwrap();

        app.apply_reply(Err(InferenceError::Unreachable("refused".into())));

        assert!(!app.store.is_busy());
        assert_eq!(app.status_indicator.kind(), StatusKind::Error);
        assert!(app.status_indicator.status_text().contains("unreachable"));
        assert_eq!(app.store.active().len(), 1);
    }

    #[test]
    fn test_cancel_marks_token() {
        let mut app = app();
        app.input = "Hello".to_string();
        let request = app.submit_input().unwrap();

        assert!(app.cancel_pending());
        assert!(request.cancel.is_cancelled());
        assert!(!app.cancel_pending());
    }

    #[tokio::test]
    async fn test_dispatch_round_trip() {
        let backend = ScriptedBackend::with(vec![reply("Hi!", 2, 50)]);
        let mut app = App::new(ConversationStore::new(backend, Box::new(MemoryStore::new())));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        app.input = "Hello".to_string();
        dispatch(app.submit_input().unwrap(), tx);
        let result = rx.recv().await.unwrap();
        app.apply_reply(result);

        assert_eq!(app.store.active().len(), 2);
        assert_eq!(app.store.active()[1].tokens_per_sec(), Some(50));
        assert!(!app.status_indicator.is_thinking());
    }

    #[test]
    fn test_delete_selected_clamps_selection() {
        let slots = MemoryStore::new();
        slots.insert("chat_history", r#"[["Q1","A1"],["Q2","A2"]]"#);
        let mut app = App::new(ConversationStore::restore(
            ScriptedBackend::with(vec![]),
            Box::new(slots),
        ));
        app.select_next();
        assert_eq!(app.selected_history, 1);

        app.delete_selected();

        assert_eq!(app.selected_history, 0);
        assert_eq!(app.store.history().len(), 1);
    }

    #[test]
    fn test_new_chat_while_busy_reports() {
        let mut app = app();
        app.input = "Hello".to_string();
        app.submit_input().unwrap();

        app.new_chat();

        assert!(app.status_indicator.status_text().contains("Esc"));
        assert_eq!(app.store.active().len(), 1);
    }
}
