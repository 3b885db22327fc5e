//! Coordination client: dispatch prompts to the operator and collect answers.
//!
//! Two ways to use it:
//! - blocking: `ask_*` sends the prompt and polls until the answer arrives or
//!   the timeout passes (`None`);
//! - queued: `submit_*` sends and returns the request id, later `check`/`take`
//!   (possibly from another process sharing a [`FileQueue`](crate::store::FileQueue)).

use crate::error::{ChefError, Result};
use crate::models::{
    ChoiceAnswer, Configuration, LabelStyle, PendingRequest, RequestKind, RequestResult,
};
use crate::poller::{PollReport, ResponsePoller};
use crate::providers::telegram::{split_message, MAX_MESSAGE_CHARS};
use crate::providers::{keyboard, ChatBackend, EditTarget, Keyboard, MessageEdit, SentMessage};
use crate::store::PendingStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

/// Tunables for a client, usually derived from [`Configuration`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Wait limit for text/choice/confirm prompts; `None` waits forever
    pub ask_timeout: Option<Duration>,
    /// Wait limit for photo prompts; `None` waits forever
    pub photo_timeout: Option<Duration>,
    /// Server-side long poll per fetch
    pub long_poll: Duration,
    /// Pause after a transient poll failure
    pub retry_delay: Duration,
    pub label_style: LabelStyle,
    pub scratch_dir: PathBuf,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from_config(&Configuration::default())
    }
}

impl ClientOptions {
    pub fn from_config(config: &Configuration) -> Self {
        let limit = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        Self {
            ask_timeout: limit(config.ask_timeout_seconds),
            photo_timeout: limit(config.photo_timeout_seconds),
            long_poll: Duration::from_secs(config.poll_timeout_seconds),
            retry_delay: Duration::from_secs(2),
            label_style: config.choice_labels,
            scratch_dir: config.scratch_dir(),
        }
    }
}

/// Sends prompts through a [`ChatBackend`] and tracks them in a [`PendingStore`].
pub struct ChefClient<B, S> {
    backend: Arc<B>,
    store: S,
    chat_id: String,
    options: ClientOptions,
    poller: Mutex<ResponsePoller>,
}

impl<B, S> ChefClient<B, S>
where
    B: ChatBackend,
    S: PendingStore,
{
    pub fn new(backend: Arc<B>, store: S, chat_id: impl Into<String>, options: ClientOptions) -> Self {
        let poller = ResponsePoller::new(
            options.long_poll,
            options.scratch_dir.clone(),
            options.label_style,
        );
        Self {
            backend,
            store,
            chat_id: chat_id.into(),
            options,
            poller: Mutex::new(poller),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    // --- fire-and-forget ---

    /// Informational message. Never fails: send errors are logged only.
    pub async fn notify(&self, message: &str) {
        if message.trim().is_empty() {
            tracing::warn!("Skipping empty notification");
            return;
        }
        for chunk in split_message(message, MAX_MESSAGE_CHARS) {
            if let Err(e) = self.backend.send_message(&self.chat_id, &chunk, None).await {
                tracing::warn!(backend = self.backend.name(), error = %e, "Notification not delivered");
                return;
            }
        }
        tracing::debug!(chars = message.chars().count(), "Notification sent");
    }

    /// Upload a local image. Fails before any network call if the file is missing.
    pub async fn send_photo(&self, path: &Path, caption: Option<&str>) -> Result<SentMessage> {
        if !path.is_file() {
            return Err(ChefError::FileNotFound(path.to_path_buf()));
        }
        let sent = self.backend.send_photo(&self.chat_id, path, caption).await?;
        tracing::info!(path = %path.display(), message_id = sent.message_id, "Photo sent");
        if let Some(caption) = caption {
            let edit = MessageEdit {
                target: EditTarget::Caption,
                text: keyboard::answered_text(caption, "delivered"),
            };
            self.edit_best_effort(sent.chat_id, sent.message_id, &edit).await;
        }
        Ok(sent)
    }

    // --- non-blocking dispatch ---

    pub async fn submit_text(&self, prompt: &str) -> Result<Uuid> {
        keyboard::validate_prompt(prompt)?;
        self.dispatch(RequestKind::FreeText, prompt, prompt.trim().to_string(), None)
            .await
    }

    pub async fn submit_choice(
        &self,
        prompt: &str,
        options: &[String],
        allow_freeform: bool,
    ) -> Result<Uuid> {
        keyboard::validate_prompt(prompt)?;
        keyboard::validate_options(options)?;
        let style = self.options.label_style;
        let text = keyboard::render_choice_prompt(prompt, options, style);
        let kb = keyboard::choice_keyboard(options, style);
        let kind = RequestKind::SingleChoice {
            options: options.to_vec(),
            allow_freeform,
        };
        self.dispatch(kind, prompt, text, Some(kb)).await
    }

    pub async fn submit_confirm(&self, prompt: &str) -> Result<Uuid> {
        keyboard::validate_prompt(prompt)?;
        let text = keyboard::render_confirm_prompt(prompt);
        self.dispatch(
            RequestKind::YesNo,
            prompt,
            text,
            Some(keyboard::confirm_keyboard()),
        )
        .await
    }

    pub async fn submit_photo(&self, prompt: &str) -> Result<Uuid> {
        keyboard::validate_prompt(prompt)?;
        let text = keyboard::render_photo_prompt(prompt);
        self.dispatch(RequestKind::PhotoRequest, prompt, text, None)
            .await
    }

    /// Send the prompt, then record how to read its answer
    async fn dispatch(
        &self,
        kind: RequestKind,
        prompt: &str,
        text: String,
        keyboard: Option<Keyboard>,
    ) -> Result<Uuid> {
        // Cursor must exist before the prompt goes out, or a quick reply
        // would be swallowed as backlog.
        {
            let mut poller = self.poller.lock().await;
            poller.prime(self.backend.as_ref(), &self.store).await?;
        }
        let sent = self
            .backend
            .send_message(&self.chat_id, &text, keyboard.as_ref())
            .await?;
        let request = PendingRequest::new(
            kind,
            prompt.trim().to_string(),
            sent.chat_id,
            sent.message_id,
        );
        let id = request.id;
        tracing::info!(
            request_id = %id,
            kind = request.kind.name(),
            message_id = sent.message_id,
            "Prompt dispatched"
        );
        self.store.insert(request).await?;
        Ok(id)
    }

    // --- blocking ---

    /// Ask for free text. `None` when the prompt times out.
    pub async fn ask_text(&self, prompt: &str) -> Result<Option<String>> {
        let id = self.submit_text(prompt).await?;
        let answer = self.wait(id, self.options.ask_timeout).await?;
        Ok(answer.and_then(|r| match r.result {
            Some(RequestResult::Text(text)) => Some(text),
            _ => None,
        }))
    }

    /// Ask the operator to pick one option
    pub async fn ask_choice(
        &self,
        prompt: &str,
        options: &[String],
        allow_freeform: bool,
    ) -> Result<Option<ChoiceAnswer>> {
        let id = self.submit_choice(prompt, options, allow_freeform).await?;
        let answer = self.wait(id, self.options.ask_timeout).await?;
        Ok(answer.and_then(|r| match r.result {
            Some(RequestResult::Choice(index)) => Some(ChoiceAnswer::Index(index)),
            Some(RequestResult::Text(text)) => Some(ChoiceAnswer::Freeform(text)),
            _ => None,
        }))
    }

    pub async fn ask_confirm(&self, prompt: &str) -> Result<Option<bool>> {
        let id = self.submit_confirm(prompt).await?;
        let answer = self.wait(id, self.options.ask_timeout).await?;
        Ok(answer.and_then(|r| match r.result {
            Some(RequestResult::Confirm(value)) => Some(value),
            _ => None,
        }))
    }

    /// Ask for an image. `None` when the operator skips or the prompt times out.
    pub async fn ask_photo(&self, prompt: &str) -> Result<Option<PathBuf>> {
        let id = self.submit_photo(prompt).await?;
        let answer = self.wait(id, self.options.photo_timeout).await?;
        Ok(answer.and_then(|r| match r.result {
            Some(RequestResult::Photo(path)) => Some(path),
            _ => None,
        }))
    }

    /// Poll until request `id` resolves (returned and removed from the store),
    /// is cancelled elsewhere, or `timeout` passes. A timed-out request is
    /// marked expired and left in the store.
    pub async fn wait(&self, id: Uuid, timeout: Option<Duration>) -> Result<Option<PendingRequest>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if let Some(request) = self.store.take(id).await? {
                return Ok(Some(request));
            }
            match self.store.get(id).await? {
                Some(request) if request.is_open() => {}
                _ => {
                    tracing::info!(request_id = %id, "Request closed without an answer");
                    return Ok(None);
                }
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        if self.store.expire(id).await? {
                            tracing::info!(request_id = %id, "Request timed out");
                            return Ok(None);
                        }
                        // Answered (or closed) just before the deadline
                        continue;
                    }
                    self.options.long_poll.min(deadline - now)
                }
                None => self.options.long_poll,
            };

            if let Err(e) = self.poll(wait).await {
                if !e.is_transient() {
                    return Err(e);
                }
                tracing::warn!(request_id = %id, error = %e, "Poll failed, retrying");
                tokio::time::sleep(self.options.retry_delay).await;
            }
        }
    }

    // --- polling & bookkeeping ---

    /// One poll pass with the given long-poll wait; resolved prompts are
    /// marked answered in the chat.
    pub async fn poll(&self, wait: Duration) -> Result<PollReport> {
        let _lock = self.store.lock_poll().await?;
        let report = {
            let mut poller = self.poller.lock().await;
            poller.set_long_poll(wait);
            poller.poll_once(self.backend.as_ref(), &self.store).await?
        };
        for request in &report.resolved {
            self.mark_answered(request).await;
        }
        Ok(report)
    }

    /// Run one quick poll pass and return the current state of request `id`
    pub async fn check(&self, id: Uuid) -> Result<PendingRequest> {
        self.poll(Duration::ZERO).await?;
        self.store.get(id).await?.ok_or(ChefError::NotFound(id))
    }

    /// Remove and return a resolved request; `None` while still open
    pub async fn take(&self, id: Uuid) -> Result<Option<PendingRequest>> {
        self.store.take(id).await
    }

    /// Withdraw a request before it is answered
    pub async fn cancel(&self, id: Uuid) -> Result<PendingRequest> {
        let mut request = self.store.remove(id).await?.ok_or(ChefError::NotFound(id))?;
        if request.is_open() {
            request.expired = true;
            let edit = MessageEdit {
                target: EditTarget::Text,
                text: format!("{}\n\n✖ cancelled", request.prompt),
            };
            self.edit_best_effort(request.origin_chat_id, request.origin_message_id, &edit)
                .await;
        }
        tracing::info!(request_id = %id, "Request cancelled");
        Ok(request)
    }

    /// Remove every stored request
    pub async fn clear(&self) -> Result<usize> {
        let removed = self.store.clear().await?;
        tracing::info!(removed, "Cleared pending requests");
        Ok(removed)
    }

    /// Every stored request, oldest first
    pub async fn pending(&self) -> Result<Vec<PendingRequest>> {
        self.store.list().await
    }

    async fn mark_answered(&self, request: &PendingRequest) {
        let Some(answer) = request.describe_result() else {
            return;
        };
        let edit = MessageEdit {
            target: EditTarget::Text,
            text: keyboard::answered_text(&request.prompt, &answer),
        };
        self.edit_best_effort(request.origin_chat_id, request.origin_message_id, &edit)
            .await;
    }

    async fn edit_best_effort(&self, chat_id: i64, message_id: i64, edit: &MessageEdit) {
        if let Err(e) = self.backend.edit_message(chat_id, message_id, edit).await {
            tracing::warn!(message_id, error = %e, "Failed to update answered message");
        }
    }
}
