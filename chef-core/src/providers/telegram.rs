//! Telegram chat backend: Bot API over HTTPS (sendMessage, getUpdates, ...)

use crate::error::{ChefError, Result};
use crate::models::{EventPayload, InboundEvent, DEFAULT_API_BASE};
use crate::providers::{ChatBackend, EditTarget, Keyboard, MessageEdit, SentMessage};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bot API limit for message text
pub const MAX_MESSAGE_CHARS: usize = 4096;
/// Bot API limit for photo captions
pub const MAX_CAPTION_CHARS: usize = 1024;

/// Slack on top of the long-poll timeout before the HTTP request gives up
const HTTP_GRACE_SECS: u64 = 10;

/// Telegram backend. Token is only ever placed in request URLs, never logged.
pub struct TelegramBackend {
    token: String,
    api_base: String,
    client: Client,
}

impl TelegramBackend {
    pub fn new(token: String) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE.to_string())
    }

    /// Point at a self-hosted Bot API server (or a local stub in tests)
    pub fn with_api_base(token: String, api_base: String) -> Self {
        Self {
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        let res = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(redact)?;
        decode_envelope(method, res).await
    }

    async fn get_updates(&self, body: serde_json::Value, wait: Duration) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            body,
            wait + Duration::from_secs(HTTP_GRACE_SECS),
        )
        .await
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(HTTP_GRACE_SECS * 3)
}

/// reqwest errors carry the request URL, which embeds the bot token
fn redact(err: reqwest::Error) -> ChefError {
    ChefError::Network(err.without_url())
}

async fn decode_envelope<T: DeserializeOwned>(method: &str, res: reqwest::Response) -> Result<T> {
    let status = res.status();
    let text = res.text().await.map_err(redact)?;
    let envelope: ApiResponse<T> = match serde_json::from_str(&text) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(ChefError::HttpStatus {
                status: status.as_u16(),
                body: text,
            })
        }
        Err(e) => {
            return Err(ChefError::MalformedResponse(format!("{}: {}", method, e)));
        }
    };
    if !status.is_success() || !envelope.ok {
        return Err(ChefError::HttpStatus {
            status: envelope.error_code.unwrap_or(status.as_u16()),
            body: envelope.description.unwrap_or_default(),
        });
    }
    envelope
        .result
        .ok_or_else(|| ChefError::MalformedResponse(format!("{}: missing result", method)))
}

/// Cut `text` to at most `max` characters
/// Whole seconds for getUpdates. A sub-second wait rounds up so the last
/// moments before a deadline do not spin on zero-second polls.
fn long_poll_secs(wait: Duration) -> u64 {
    if wait.subsec_nanos() > 0 {
        wait.as_secs() + 1
    } else {
        wait.as_secs()
    }
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Split text into message-sized chunks, breaking at newlines where possible
pub fn split_message(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn keyboard_markup(keyboard: Option<&Keyboard>) -> serde_json::Value {
    let rows: Vec<Vec<serde_json::Value>> = keyboard
        .map(|kb| {
            kb.rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| serde_json::json!({ "text": b.label, "callback_data": b.data }))
                        .collect()
                })
                .collect()
        })
        .unwrap_or_default();
    serde_json::json!({ "inline_keyboard": rows })
}

#[async_trait]
impl ChatBackend for TelegramBackend {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<SentMessage> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": truncate_chars(text, MAX_MESSAGE_CHARS),
        });
        if keyboard.is_some() {
            body["reply_markup"] = keyboard_markup(keyboard);
        }
        let msg: TelegramMessage = self.call("sendMessage", body, default_timeout()).await?;
        Ok(msg.sent())
    }

    async fn send_photo(
        &self,
        chat_id: &str,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<SentMessage> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo.jpg".to_string());
        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", reqwest::multipart::Part::bytes(bytes).file_name(file_name));
        if let Some(caption) = caption {
            form = form.text("caption", truncate_chars(caption, MAX_CAPTION_CHARS));
        }
        let res = self
            .client
            .post(self.method_url("sendPhoto"))
            .timeout(Duration::from_secs(120))
            .multipart(form)
            .send()
            .await
            .map_err(redact)?;
        let msg: TelegramMessage = decode_envelope("sendPhoto", res).await?;
        Ok(msg.sent())
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, edit: &MessageEdit) -> Result<()> {
        let (method, field, limit) = match edit.target {
            EditTarget::Text => ("editMessageText", "text", MAX_MESSAGE_CHARS),
            EditTarget::Caption => ("editMessageCaption", "caption", MAX_CAPTION_CHARS),
        };
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "reply_markup": keyboard_markup(None),
        });
        body[field] = serde_json::Value::String(truncate_chars(&edit.text, limit));
        // Result is the edited Message, or `true` for inline messages
        let _: serde_json::Value = self.call(method, body, default_timeout()).await?;
        Ok(())
    }

    async fn fetch_events(&self, after: i64, timeout: Duration) -> Result<Vec<InboundEvent>> {
        let secs = long_poll_secs(timeout);
        let body = serde_json::json!({
            "offset": after + 1,
            "timeout": secs,
            "allowed_updates": ["message", "callback_query"],
        });
        let mut updates = self.get_updates(body, Duration::from_secs(secs)).await?;
        updates.retain(|u| u.update_id > after);
        updates.sort_by_key(|u| u.update_id);
        Ok(updates.into_iter().map(Update::into_event).collect())
    }

    async fn latest_sequence(&self) -> Result<Option<i64>> {
        let body = serde_json::json!({ "offset": -1, "limit": 1, "timeout": 0 });
        let updates = self.get_updates(body, Duration::ZERO).await?;
        Ok(updates.iter().map(|u| u.update_id).max())
    }

    async fn acknowledge(&self, sequence: i64) -> Result<()> {
        // getUpdates with a higher offset confirms everything below it
        let body = serde_json::json!({ "offset": sequence + 1, "limit": 1, "timeout": 0 });
        self.get_updates(body, Duration::ZERO).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut body = serde_json::json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = serde_json::Value::String(text.to_string());
        }
        let _: bool = self
            .call("answerCallbackQuery", body, default_timeout())
            .await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str, dest_dir: &Path, stem: &str) -> Result<PathBuf> {
        let file: TelegramFile = self
            .call(
                "getFile",
                serde_json::json!({ "file_id": file_id }),
                default_timeout(),
            )
            .await?;
        let remote_path = file
            .file_path
            .ok_or_else(|| ChefError::MalformedResponse("getFile: missing file_path".into()))?;

        let res = self
            .client
            .get(self.file_url(&remote_path))
            .timeout(Duration::from_secs(120))
            .send()
            .await
            .map_err(redact)?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ChefError::HttpStatus { status, body });
        }
        let bytes = res.bytes().await.map_err(redact)?;

        let extension = Path::new(&remote_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg");
        tokio::fs::create_dir_all(dest_dir).await?;
        let local = dest_dir.join(format!("{}.{}", stem, extension));
        tokio::fs::write(&local, &bytes).await?;
        tracing::debug!(path = %local.display(), size = bytes.len(), "Downloaded attachment");
        Ok(local)
    }
}

// --- Bot API wire types ---

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<TelegramMessage>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
}

#[derive(Deserialize)]
struct TelegramMessage {
    message_id: i64,
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Deserialize)]
struct PhotoSize {
    file_id: String,
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct Document {
    file_id: String,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Deserialize)]
struct CallbackQuery {
    id: String,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<TelegramMessage>,
}

#[derive(Deserialize)]
struct TelegramFile {
    #[serde(default)]
    file_path: Option<String>,
}

impl TelegramMessage {
    fn sent(&self) -> SentMessage {
        SentMessage {
            chat_id: self.chat.id,
            message_id: self.message_id,
        }
    }

    /// Largest photo variant, or an image sent as a document
    fn image_file_id(&self) -> Option<String> {
        if let Some(sizes) = &self.photo {
            return sizes
                .iter()
                .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
                .map(|p| p.file_id.clone());
        }
        self.document
            .as_ref()
            .filter(|d| {
                d.mime_type
                    .as_deref()
                    .is_some_and(|m| m.starts_with("image/"))
            })
            .map(|d| d.file_id.clone())
    }
}

impl Update {
    /// Every update becomes an event so the offset can move past it
    fn into_event(self) -> InboundEvent {
        let sequence = self.update_id;
        if let Some(query) = self.callback_query {
            // The origin message is absent when it is too old to access; the
            // press still has to be answered, so it matches no request.
            let (chat_id, message_id) = query
                .message
                .map(|origin| (origin.chat.id, origin.message_id))
                .unwrap_or((0, 0));
            return InboundEvent::callback(
                sequence,
                chat_id,
                message_id,
                query.id,
                query.data.unwrap_or_default(),
            );
        }
        let Some(msg) = self.message else {
            return InboundEvent {
                sequence,
                chat_id: 0,
                message_id: 0,
                payload: EventPayload::Unsupported,
            };
        };
        let payload = if let Some(file_id) = msg.image_file_id() {
            EventPayload::Photo {
                file_id,
                caption: msg.caption.clone(),
            }
        } else if let Some(text) = msg.text.clone() {
            EventPayload::Text { text }
        } else {
            EventPayload::Unsupported
        };
        InboundEvent {
            sequence,
            chat_id: msg.chat.id,
            message_id: msg.message_id,
            payload,
        }
    }
}
