//! Inbound events from the chat backend's update feed

use serde::{Deserialize, Serialize};

/// One update delivered by the chat backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Monotonic, never reused; the poller's cursor.
    pub sequence: i64,
    pub chat_id: i64,
    pub message_id: i64,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Plain text message typed by the operator
    Text { text: String },
    /// Button press on one of our outbound messages
    Callback {
        callback_id: String,
        data: String,
        origin_message_id: i64,
    },
    /// Image attachment; `file_id` refers to the highest-resolution variant
    Photo {
        file_id: String,
        #[serde(default)]
        caption: Option<String>,
    },
    /// Anything else (stickers, edits, service messages); consumed, never matched
    Unsupported,
}

impl InboundEvent {
    pub fn text(sequence: i64, chat_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            sequence,
            chat_id,
            message_id,
            payload: EventPayload::Text { text: text.into() },
        }
    }

    pub fn callback(
        sequence: i64,
        chat_id: i64,
        origin_message_id: i64,
        callback_id: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            sequence,
            chat_id,
            message_id: origin_message_id,
            payload: EventPayload::Callback {
                callback_id: callback_id.into(),
                data: data.into(),
                origin_message_id,
            },
        }
    }

    pub fn photo(sequence: i64, chat_id: i64, message_id: i64, file_id: impl Into<String>) -> Self {
        Self {
            sequence,
            chat_id,
            message_id,
            payload: EventPayload::Photo {
                file_id: file_id.into(),
                caption: None,
            },
        }
    }
}
