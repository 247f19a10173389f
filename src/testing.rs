//! Test doubles shared by unit tests.

use crate::api::InferenceBackend;
use crate::errors::InferenceError;
use crate::models::InferenceResult;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays canned results and records every prompt it receives.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<InferenceResult, InferenceError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn with(replies: Vec<Result<InferenceResult, InferenceError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn infer(&self, prompt: &str) -> Result<InferenceResult, InferenceError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InferenceError::Unreachable("no scripted reply".into())))
    }
}

pub fn reply(text: &str, duration: u64, tokens_per_sec: u64) -> Result<InferenceResult, InferenceError> {
    Ok(InferenceResult {
        text: text.to_string(),
        duration,
        tokens_per_sec,
    })
}
