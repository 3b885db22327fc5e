//! Pending request storage: in-memory for blocking callers, one JSON file per
//! request for callers that dispatch and collect in separate processes.

mod file_queue;
mod memory;

pub use file_queue::FileQueue;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{PendingRequest, RequestResult};
use async_trait::async_trait;
use uuid::Uuid;

/// Held for the duration of one poll pass. Dropping it releases the lock.
#[derive(Debug, Default)]
pub struct PollLock {
    _file: Option<std::fs::File>,
}

/// Storage for pending requests and the poller cursor.
#[async_trait]
pub trait PendingStore: Send + Sync {
    async fn insert(&self, request: PendingRequest) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<PendingRequest>>;

    /// All stored requests, oldest first
    async fn list(&self) -> Result<Vec<PendingRequest>>;

    /// Set the result of an open request. Returns the updated record only when
    /// this call resolved it; an already-resolved, expired, missing or
    /// mismatched request yields `None` and is left untouched.
    async fn resolve(&self, id: Uuid, result: RequestResult) -> Result<Option<PendingRequest>>;

    /// Mark a request expired without removing it. Returns false if it was
    /// missing or already closed.
    async fn expire(&self, id: Uuid) -> Result<bool>;

    /// Remove and return a request regardless of state
    async fn remove(&self, id: Uuid) -> Result<Option<PendingRequest>>;

    /// Remove every request. Returns how many were removed.
    async fn clear(&self) -> Result<usize>;

    /// Highest event sequence already consumed, if a poller ever ran
    async fn load_offset(&self) -> Result<Option<i64>>;

    async fn save_offset(&self, offset: i64) -> Result<()>;

    /// Serialize poll passes between processes sharing this store
    async fn lock_poll(&self) -> Result<PollLock> {
        Ok(PollLock::default())
    }

    /// Remove and return a request once it has resolved; open requests stay
    async fn take(&self, id: Uuid) -> Result<Option<PendingRequest>> {
        match self.get(id).await? {
            Some(request) if request.is_resolved() => self.remove(id).await,
            _ => Ok(None),
        }
    }
}
