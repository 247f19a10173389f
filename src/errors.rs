// src/errors.rs

use thiserror::Error;

/// Failure of a single generation request.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference server unreachable: {0}")]
    Unreachable(String),
    #[error("inference server returned {status}: {body}")]
    ServerError { status: u16, body: String },
    #[error("malformed inference response: {0}")]
    BadResponse(String),
    #[error("inference request timed out")]
    TimedOut,
    #[error("inference request cancelled")]
    Cancelled,
}

impl InferenceError {
    /// Stable short name used in logs and the status bar.
    pub fn reason(&self) -> &'static str {
        match self {
            InferenceError::Unreachable(_) => "unreachable",
            InferenceError::ServerError { .. } => "server_error",
            InferenceError::BadResponse(_) => "bad_response",
            InferenceError::TimedOut => "timed_out",
            InferenceError::Cancelled => "cancelled",
        }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InferenceError::TimedOut
        } else if e.is_decode() {
            InferenceError::BadResponse(e.to_string())
        } else {
            InferenceError::Unreachable(e.to_string())
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("history index {index} out of range (history has {len} entries)")]
pub struct IndexError {
    pub index: usize,
    pub len: usize,
}

/// Why a conversation store operation was refused. State is unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("a reply is still pending")]
    Busy,
}

/// Storage read/write failure. The conversation store logs these and carries on.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage i/o error on slot '{slot}': {source}")]
    Io {
        slot: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse slot '{slot}': {source}")]
    Parse {
        slot: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum MelchatError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl MelchatError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        MelchatError::Config(msg.into())
    }
}

pub type MelchatResult<T> = Result<T, MelchatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_names() {
        assert_eq!(InferenceError::Unreachable("x".into()).reason(), "unreachable");
        assert_eq!(
            InferenceError::ServerError {
                status: 500,
                body: String::new()
            }
            .reason(),
            "server_error"
        );
        assert_eq!(InferenceError::BadResponse("x".into()).reason(), "bad_response");
        assert_eq!(InferenceError::TimedOut.reason(), "timed_out");
        assert_eq!(InferenceError::Cancelled.reason(), "cancelled");
    }

    #[test]
    fn test_index_error_message() {
        let err = IndexError { index: 3, len: 2 };
        assert_eq!(
            err.to_string(),
            "history index 3 out of range (history has 2 entries)"
        );
    }
}
