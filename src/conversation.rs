// src/conversation.rs

use crate::api::InferenceBackend;
use crate::constants::{ACTIVE_CHAT_SLOT, CHAT_HISTORY_SLOT, HISTORY_TITLE_WIDTH};
use crate::errors::{IndexError, InferenceError, StoreError};
use crate::models::{ArchivedConversation, ChatMessage, InferenceResult};
use crate::storage::{load_json, save_json, SlotStore};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Why a prompt was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Empty or whitespace-only prompt.
    Blank,
    /// Another reply is still pending.
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Answered(ChatMessage),
    Rejected(Rejection),
}

/// The active conversation plus the archive of past ones, for one session.
///
/// Every change to the active conversation or the archive is written to its slot
/// straight away. Storage failures are logged and never abort an operation.
pub struct ConversationStore {
    backend: Arc<dyn InferenceBackend>,
    storage: Box<dyn SlotStore>,
    active: Vec<ChatMessage>,
    history: Vec<ArchivedConversation>,
    current_chat_index: Option<usize>,
    busy: bool,
}

impl ConversationStore {
    /// An empty store. Nothing is read from `storage`.
    pub fn new(backend: Arc<dyn InferenceBackend>, storage: Box<dyn SlotStore>) -> Self {
        Self {
            backend,
            storage,
            active: Vec::new(),
            history: Vec::new(),
            current_chat_index: None,
            busy: false,
        }
    }

    /// A store primed from the two persisted slots. Missing or unreadable slots
    /// come back empty.
    pub fn restore(backend: Arc<dyn InferenceBackend>, storage: Box<dyn SlotStore>) -> Self {
        let active: Vec<ChatMessage> = load_slot(storage.as_ref(), ACTIVE_CHAT_SLOT);
        let history: Vec<ArchivedConversation> = load_slot(storage.as_ref(), CHAT_HISTORY_SLOT);
        info!(
            "Restored {} active messages and {} archived conversations",
            active.len(),
            history.len()
        );

        Self {
            active,
            history,
            ..Self::new(backend, storage)
        }
    }

    pub fn active(&self) -> &[ChatMessage] {
        &self.active
    }

    pub fn history(&self) -> &[ArchivedConversation] {
        &self.history
    }

    pub fn current_chat_index(&self) -> Option<usize> {
        self.current_chat_index
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn history_titles(&self) -> Vec<String> {
        self.history
            .iter()
            .map(|c| c.title(HISTORY_TITLE_WIDTH))
            .collect()
    }

    /// Backend handle for callers that run the request on their own task.
    pub fn backend(&self) -> Arc<dyn InferenceBackend> {
        Arc::clone(&self.backend)
    }

    /// Sends `prompt` and appends the reply. On failure only the user turn remains.
    pub async fn submit(&mut self, prompt: &str) -> Result<SubmitOutcome, InferenceError> {
        let prompt = match self.begin_submit(prompt) {
            Ok(prompt) => prompt,
            Err(rejection) => return Ok(SubmitOutcome::Rejected(rejection)),
        };
        let backend = self.backend();
        let result = backend.infer(&prompt).await;
        self.finish_answer(result)
    }

    /// Like `submit`, but the request is abandoned when `cancel` fires.
    pub async fn submit_cancellable(
        &mut self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<SubmitOutcome, InferenceError> {
        let prompt = match self.begin_submit(prompt) {
            Ok(prompt) => prompt,
            Err(rejection) => return Ok(SubmitOutcome::Rejected(rejection)),
        };
        let backend = self.backend();
        let result = backend.infer_cancellable(&prompt, cancel).await;
        self.finish_answer(result)
    }

    /// First half of a submit: appends the user turn and marks the store busy.
    /// Returns the prompt to send.
    pub fn begin_submit(&mut self, prompt: &str) -> Result<String, Rejection> {
        if prompt.trim().is_empty() {
            return Err(Rejection::Blank);
        }
        if self.busy {
            debug!("Ignoring submit while a reply is pending");
            return Err(Rejection::Busy);
        }

        self.active.push(ChatMessage::user(prompt));
        self.persist_active();
        self.busy = true;
        Ok(prompt.to_string())
    }

    /// Second half of a submit: appends the reply on success. Busy is cleared
    /// either way.
    pub fn finish_submit(
        &mut self,
        result: Result<InferenceResult, InferenceError>,
    ) -> Result<(), InferenceError> {
        if !self.busy {
            warn!("Dropping inference result with no pending submit");
            return Ok(());
        }
        self.busy = false;

        match result {
            Ok(result) => {
                self.active.push(ChatMessage::ai(result));
                self.persist_active();
                Ok(())
            }
            Err(e) => {
                warn!("Inference failed ({}): {}", e.reason(), e);
                Err(e)
            }
        }
    }

    fn finish_answer(
        &mut self,
        result: Result<InferenceResult, InferenceError>,
    ) -> Result<SubmitOutcome, InferenceError> {
        self.finish_submit(result)?;
        match self.active.last() {
            Some(reply) => Ok(SubmitOutcome::Answered(reply.clone())),
            None => Err(InferenceError::BadResponse(
                "conversation cleared while waiting".to_string(),
            )),
        }
    }

    /// Archives a non-empty active conversation and starts an empty one.
    ///
    /// The current index becomes the archive length before this call, even when
    /// nothing was archived; in that case it points one past the last entry.
    pub fn start_new_chat(&mut self) -> Result<(), StoreError> {
        if self.busy {
            return Err(StoreError::Busy);
        }

        let previous_len = self.history.len();
        if !self.active.is_empty() {
            self.history
                .push(ArchivedConversation::from_messages(&self.active));
            self.persist_history();
        }
        self.current_chat_index = Some(previous_len);
        self.active.clear();
        self.persist_active();
        Ok(())
    }

    /// Replaces the active conversation with a copy of `history[index]`.
    pub fn select_history(&mut self, index: usize) -> Result<(), StoreError> {
        self.check_index(index)?;
        if self.busy {
            return Err(StoreError::Busy);
        }

        self.active = self.history[index].to_messages();
        self.current_chat_index = Some(index);
        self.persist_active();
        Ok(())
    }

    /// Removes `history[index]`, keeping the current index on the same conversation.
    pub fn delete_history(&mut self, index: usize) -> Result<(), StoreError> {
        self.check_index(index)?;
        if self.busy {
            return Err(StoreError::Busy);
        }

        self.history.remove(index);
        self.persist_history();

        match self.current_chat_index {
            Some(current) if current == index => {
                self.active.clear();
                self.persist_active();
                self.current_chat_index = None;
            }
            Some(current) if index < current => {
                self.current_chat_index = Some(current - 1);
            }
            _ => {}
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), IndexError> {
        if index < self.history.len() {
            Ok(())
        } else {
            Err(IndexError {
                index,
                len: self.history.len(),
            })
        }
    }

    fn persist_active(&self) {
        let result = if self.active.is_empty() {
            self.storage.remove(ACTIVE_CHAT_SLOT)
        } else {
            save_json(self.storage.as_ref(), ACTIVE_CHAT_SLOT, &self.active)
        };
        if let Err(e) = result {
            warn!("Failed to save active chat: {}", e);
        }
    }

    fn persist_history(&self) {
        let result = if self.history.is_empty() {
            self.storage.remove(CHAT_HISTORY_SLOT)
        } else {
            save_json(self.storage.as_ref(), CHAT_HISTORY_SLOT, &self.history)
        };
        if let Err(e) = result {
            warn!("Failed to save chat history: {}", e);
        }
    }
}

fn load_slot<T: DeserializeOwned + Default>(storage: &dyn SlotStore, slot: &str) -> T {
    match load_json(storage, slot) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            warn!("Ignoring unreadable slot: {}", e);
            T::default()
        }
    }
}
