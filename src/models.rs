// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    /// Sender implied by a turn's position in a strictly alternating conversation.
    pub fn from_position(position: usize) -> Self {
        if position % 2 == 0 {
            Sender::User
        } else {
            Sender::Ai
        }
    }
}

/// One conversation turn. Only `ai` turns can carry timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ChatMessageRecord")]
pub struct ChatMessage {
    text: String,
    sender: Sender,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u64>,
    #[serde(rename = "tokensPerSec", skip_serializing_if = "Option::is_none")]
    tokens_per_sec: Option<u64>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            duration: None,
            tokens_per_sec: None,
        }
    }

    pub fn ai(result: InferenceResult) -> Self {
        Self {
            text: result.text,
            sender: Sender::Ai,
            duration: Some(result.duration),
            tokens_per_sec: Some(result.tokens_per_sec),
        }
    }

    /// An `ai` turn restored from the archive, which keeps no timing.
    pub fn ai_untimed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Ai,
            duration: None,
            tokens_per_sec: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn duration(&self) -> Option<u64> {
        self.duration
    }

    pub fn tokens_per_sec(&self) -> Option<u64> {
        self.tokens_per_sec
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// On-disk shape of a message; user turns lose any stray timing on load.
#[derive(Deserialize)]
pub struct ChatMessageRecord {
    pub text: String,
    pub sender: Sender,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default, rename = "tokensPerSec")]
    pub tokens_per_sec: Option<u64>,
}

impl From<ChatMessageRecord> for ChatMessage {
    fn from(record: ChatMessageRecord) -> Self {
        match record.sender {
            Sender::User => ChatMessage::user(record.text),
            Sender::Ai => ChatMessage {
                text: record.text,
                sender: Sender::Ai,
                duration: record.duration,
                tokens_per_sec: record.tokens_per_sec,
            },
        }
    }
}

/// Normalized output of one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceResult {
    pub text: String,
    /// Whole seconds, never below 1.
    pub duration: u64,
    pub tokens_per_sec: u64,
}

/// A turn as kept in the archive: text and sender, no timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedTurn {
    pub text: String,
    pub sender: Sender,
}

/// Archived turns may be bare strings (older archives) or `{text, sender}` objects.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum StoredTurn {
    Plain(String),
    Tagged(ArchivedTurn),
}

/// A past conversation in the history archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<StoredTurn>", into = "Vec<ArchivedTurn>")]
pub struct ArchivedConversation {
    turns: Vec<ArchivedTurn>,
}

impl ArchivedConversation {
    /// Snapshot of an active conversation, order preserved.
    pub fn from_messages(messages: &[ChatMessage]) -> Self {
        Self {
            turns: messages
                .iter()
                .map(|m| ArchivedTurn {
                    text: m.text().to_string(),
                    sender: m.sender(),
                })
                .collect(),
        }
    }

    /// Rebuilds active messages. Restored `ai` turns carry no timing.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|turn| match turn.sender {
                Sender::User => ChatMessage::user(turn.text.clone()),
                Sender::Ai => ChatMessage::ai_untimed(turn.text.clone()),
            })
            .collect()
    }

    pub fn turns(&self) -> &[ArchivedTurn] {
        &self.turns
    }

    pub fn texts(&self) -> Vec<&str> {
        self.turns.iter().map(|t| t.text.as_str()).collect()
    }

    /// Short label for the history sidebar: the first user turn, truncated.
    pub fn title(&self, max_chars: usize) -> String {
        let first = self
            .turns
            .iter()
            .find(|t| t.sender == Sender::User)
            .map(|t| t.text.trim())
            .unwrap_or("");
        let line = first.lines().next().unwrap_or("");
        if line.chars().count() > max_chars {
            let cut: String = line.chars().take(max_chars.saturating_sub(1)).collect();
            format!("{}…", cut)
        } else if line.is_empty() {
            "(untitled)".to_string()
        } else {
            line.to_string()
        }
    }
}

impl From<Vec<StoredTurn>> for ArchivedConversation {
    fn from(stored: Vec<StoredTurn>) -> Self {
        let turns = stored
            .into_iter()
            .enumerate()
            .map(|(position, turn)| match turn {
                StoredTurn::Plain(text) => ArchivedTurn {
                    text,
                    sender: Sender::from_position(position),
                },
                StoredTurn::Tagged(turn) => turn,
            })
            .collect();
        Self { turns }
    }
}

impl From<ArchivedConversation> for Vec<ArchivedTurn> {
    fn from(conversation: ArchivedConversation) -> Self {
        conversation.turns
    }
}

/// Logs details of each API call.
#[derive(Debug, Clone)]
pub struct ApiCallLog {
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub request_summary: String,
    /// 0 when no HTTP response was received.
    pub response_status: u16,
    pub response_time_ms: u128,
}
