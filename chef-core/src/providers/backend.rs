//! Chat backend: the outbound/inbound operations the client consumes

use crate::error::Result;
use crate::models::InboundEvent;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One inline button: visible label plus the callback payload it sends back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

/// Rows of inline buttons attached to an outbound message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Every callback payload on the keyboard, in display order
    pub fn payloads(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.data.as_str())
    }
}

/// Identifies a delivered outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Which part of a sent message an edit replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Text,
    Caption,
}

/// Replacement content for a sent message. Edits always drop the keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEdit {
    pub target: EditTarget,
    pub text: String,
}

/// Operations consumed from a chat backend (e.g. the Telegram Bot API).
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logging (e.g. "telegram").
    fn name(&self) -> &str;

    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<SentMessage>;

    async fn send_photo(
        &self,
        chat_id: &str,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<SentMessage>;

    async fn edit_message(&self, chat_id: i64, message_id: i64, edit: &MessageEdit) -> Result<()>;

    /// Events with sequence strictly greater than `after`, waiting up to
    /// `timeout` when none are queued yet.
    async fn fetch_events(&self, after: i64, timeout: Duration) -> Result<Vec<InboundEvent>>;

    /// Highest sequence number currently held by the backend, if any.
    async fn latest_sequence(&self) -> Result<Option<i64>>;

    /// Tell the backend everything up to and including `sequence` is consumed.
    async fn acknowledge(&self, sequence: i64) -> Result<()>;

    /// Dismiss the loading state of a pressed button, optionally with a toast.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    /// Download an attachment into `dest_dir`, naming it `stem` plus the
    /// backend's file extension. Returns the local path.
    async fn download_file(&self, file_id: &str, dest_dir: &Path, stem: &str) -> Result<PathBuf>;
}
