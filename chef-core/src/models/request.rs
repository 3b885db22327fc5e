//! Pending request records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Most options a choice prompt may carry (one letter label each).
pub const MAX_OPTIONS: usize = 26;

/// How the eventual reply to a prompt is interpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestKind {
    FreeText,
    SingleChoice {
        options: Vec<String>,
        #[serde(default)]
        allow_freeform: bool,
    },
    YesNo,
    PhotoRequest,
}

impl RequestKind {
    /// Short name for logs and listings
    pub fn name(&self) -> &'static str {
        match self {
            RequestKind::FreeText => "text",
            RequestKind::SingleChoice { .. } => "choice",
            RequestKind::YesNo => "confirm",
            RequestKind::PhotoRequest => "photo",
        }
    }

    /// Whether `result` is a legal answer for this kind
    pub fn accepts(&self, result: &RequestResult) -> bool {
        match (self, result) {
            (RequestKind::FreeText, RequestResult::Text(_)) => true,
            (RequestKind::SingleChoice { options, .. }, RequestResult::Choice(index)) => {
                *index < options.len()
            }
            (RequestKind::SingleChoice { allow_freeform, .. }, RequestResult::Text(_)) => {
                *allow_freeform
            }
            (RequestKind::YesNo, RequestResult::Confirm(_)) => true,
            (RequestKind::PhotoRequest, RequestResult::Photo(_) | RequestResult::NoAnswer) => true,
            _ => false,
        }
    }
}

/// Typed answer stored once a request resolves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RequestResult {
    Text(String),
    Choice(usize),
    Confirm(bool),
    Photo(PathBuf),
    /// The operator explicitly declined to answer (photo cancel keyword).
    NoAnswer,
}

/// Answer to a choice prompt: a picked option or free-form fallback text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceAnswer {
    Index(usize),
    Freeform(String),
}

/// One outstanding prompt awaiting a human reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: Uuid,
    pub kind: RequestKind,
    pub prompt: String,
    /// Chat the prompt was posted to; replies from other chats never match.
    pub origin_chat_id: i64,
    /// Outbound message carrying the prompt (and its buttons)
    pub origin_message_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RequestResult>,
    #[serde(default)]
    pub expired: bool,
}

impl PendingRequest {
    pub fn new(kind: RequestKind, prompt: String, origin_chat_id: i64, origin_message_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            prompt,
            origin_chat_id,
            origin_message_id,
            created_at: Utc::now(),
            resolved_at: None,
            result: None,
            expired: false,
        }
    }

    /// Still waiting for an answer
    pub fn is_open(&self) -> bool {
        self.result.is_none() && !self.expired
    }

    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }

    /// Set the result. Returns false (and changes nothing) when the request is
    /// already resolved, expired, or `result` does not fit the kind.
    pub fn resolve(&mut self, result: RequestResult) -> bool {
        if !self.is_open() || !self.kind.accepts(&result) {
            return false;
        }
        self.result = Some(result);
        self.resolved_at = Some(Utc::now());
        true
    }

    /// Human-readable form of the result, used to mark the prompt as answered
    pub fn describe_result(&self) -> Option<String> {
        let result = self.result.as_ref()?;
        let text = match (result, &self.kind) {
            (RequestResult::Choice(index), RequestKind::SingleChoice { options, .. }) => {
                options.get(*index).cloned().unwrap_or_else(|| index.to_string())
            }
            (RequestResult::Choice(index), _) => index.to_string(),
            (RequestResult::Text(text), _) => text.clone(),
            (RequestResult::Confirm(true), _) => "Yes".to_string(),
            (RequestResult::Confirm(false), _) => "No".to_string(),
            (RequestResult::Photo(_), _) => "photo received".to_string(),
            (RequestResult::NoAnswer, _) => "skipped".to_string(),
        };
        Some(text)
    }
}
