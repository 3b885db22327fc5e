//! Response poller: fetch inbound events and resolve the requests they answer

use crate::error::Result;
use crate::models::{
    EventPayload, InboundEvent, LabelStyle, PendingRequest, RequestKind, RequestResult,
};
use crate::providers::{reply, ChatBackend};
use crate::store::PendingStore;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of one poll pass
#[derive(Debug, Default)]
pub struct PollReport {
    /// Events examined (matched or not)
    pub examined: usize,
    /// Requests resolved during this pass, in event order
    pub resolved: Vec<PendingRequest>,
    /// Highest sequence consumed after the pass
    pub offset: i64,
}

impl PollReport {
    pub fn resolved_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.resolved.iter().map(|r| r.id)
    }
}

/// Owns the update cursor for one logical session.
pub struct ResponsePoller {
    offset: Option<i64>,
    long_poll: Duration,
    scratch_dir: PathBuf,
    label_style: LabelStyle,
}

impl ResponsePoller {
    pub fn new(long_poll: Duration, scratch_dir: PathBuf, label_style: LabelStyle) -> Self {
        Self {
            offset: None,
            long_poll,
            scratch_dir,
            label_style,
        }
    }

    /// Start from a known cursor instead of priming from the backend
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    pub fn set_long_poll(&mut self, long_poll: Duration) {
        self.long_poll = long_poll;
    }

    /// Establish the cursor: the store's saved offset, else the backend's
    /// newest event so history from before this session is never read as an
    /// answer.
    pub async fn prime<B, S>(&mut self, backend: &B, store: &S) -> Result<i64>
    where
        B: ChatBackend + ?Sized,
        S: PendingStore + ?Sized,
    {
        if let Some(offset) = self.offset {
            return Ok(offset);
        }
        if let Some(saved) = store.load_offset().await? {
            self.offset = Some(saved);
            return Ok(saved);
        }
        let offset = match backend.latest_sequence().await? {
            Some(latest) => {
                if let Err(e) = backend.acknowledge(latest).await {
                    tracing::warn!(error = %e, "Failed to acknowledge backlog");
                }
                latest
            }
            None => 0,
        };
        tracing::debug!(offset, backend = backend.name(), "Primed poll offset");
        self.offset = Some(offset);
        store.save_offset(offset).await?;
        Ok(offset)
    }

    /// Run one fetch and match every event in it
    pub async fn poll_once<B, S>(&mut self, backend: &B, store: &S) -> Result<PollReport>
    where
        B: ChatBackend + ?Sized,
        S: PendingStore + ?Sized,
    {
        // Another process sharing the store may have moved the cursor.
        if let Some(saved) = store.load_offset().await? {
            if self.offset.map_or(true, |current| saved > current) {
                self.offset = Some(saved);
            }
        }
        let start = self.prime(backend, store).await?;
        let events = backend.fetch_events(start, self.long_poll).await?;
        let report = self.process_events(events, backend, store).await;
        if report.offset != start {
            store.save_offset(report.offset).await?;
        }
        Ok(report)
    }

    /// Match a batch of events. The offset moves past each event once it has
    /// been examined; events at or below the offset are skipped.
    pub async fn process_events<B, S>(
        &mut self,
        events: Vec<InboundEvent>,
        backend: &B,
        store: &S,
    ) -> PollReport
    where
        B: ChatBackend + ?Sized,
        S: PendingStore + ?Sized,
    {
        let mut offset = self.offset.unwrap_or(0);
        let mut report = PollReport {
            offset,
            ..PollReport::default()
        };
        for event in events {
            if event.sequence <= offset {
                continue;
            }
            match self.handle_event(&event, backend, store).await {
                Ok(Some(request)) => {
                    tracing::info!(
                        request_id = %request.id,
                        kind = request.kind.name(),
                        sequence = event.sequence,
                        "Request resolved"
                    );
                    report.resolved.push(request);
                }
                Ok(None) => {
                    tracing::debug!(sequence = event.sequence, "Event matched no request");
                }
                Err(e) => {
                    tracing::warn!(sequence = event.sequence, error = %e, "Failed to handle event");
                }
            }
            offset = event.sequence;
            self.offset = Some(offset);
            report.examined += 1;
        }
        report.offset = offset;
        report
    }

    async fn handle_event<B, S>(
        &self,
        event: &InboundEvent,
        backend: &B,
        store: &S,
    ) -> Result<Option<PendingRequest>>
    where
        B: ChatBackend + ?Sized,
        S: PendingStore + ?Sized,
    {
        match &event.payload {
            EventPayload::Callback {
                callback_id,
                data,
                origin_message_id,
            } => {
                let outcome = self
                    .handle_callback(event.chat_id, *origin_message_id, data, store)
                    .await;
                let toast = match &outcome {
                    Ok(Some(_)) => Some("Got it"),
                    Ok(None) => Some("This prompt is no longer waiting for an answer"),
                    Err(_) => None,
                };
                if let Err(e) = backend.answer_callback(callback_id, toast).await {
                    tracing::warn!(error = %e, "Failed to answer button press");
                }
                outcome
            }
            EventPayload::Text { text } => {
                let Some(request) = newest_open(store, event.chat_id, |_| true).await? else {
                    return Ok(None);
                };
                match reply::parse_text(&request.kind, text, self.label_style) {
                    Some(result) => store.resolve(request.id, result).await,
                    None => Ok(None),
                }
            }
            EventPayload::Photo { file_id, .. } => {
                let Some(request) = newest_open(store, event.chat_id, |k| {
                    matches!(k, RequestKind::PhotoRequest)
                })
                .await?
                else {
                    return Ok(None);
                };
                let path = backend
                    .download_file(file_id, &self.scratch_dir, &request.id.to_string())
                    .await?;
                store.resolve(request.id, RequestResult::Photo(path)).await
            }
            EventPayload::Unsupported => Ok(None),
        }
    }

    async fn handle_callback<S>(
        &self,
        chat_id: i64,
        origin_message_id: i64,
        data: &str,
        store: &S,
    ) -> Result<Option<PendingRequest>>
    where
        S: PendingStore + ?Sized,
    {
        let requests = store.list().await?;
        let Some(request) = requests
            .into_iter()
            .find(|r| r.origin_chat_id == chat_id && r.origin_message_id == origin_message_id)
        else {
            return Ok(None);
        };
        match reply::parse_callback(&request.kind, data) {
            Some(result) => store.resolve(request.id, result).await,
            None => Ok(None),
        }
    }
}

/// Most recently created open request in `chat_id` whose kind passes `filter`
async fn newest_open<S, F>(store: &S, chat_id: i64, filter: F) -> Result<Option<PendingRequest>>
where
    S: PendingStore + ?Sized,
    F: Fn(&RequestKind) -> bool,
{
    Ok(store
        .list()
        .await?
        .into_iter()
        .filter(|r| r.origin_chat_id == chat_id && r.is_open() && filter(&r.kind))
        .max_by_key(|r| r.created_at))
}
