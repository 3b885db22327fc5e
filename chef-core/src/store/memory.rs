//! In-memory pending request store

use crate::error::Result;
use crate::models::{PendingRequest, RequestResult};
use crate::store::PendingStore;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Requests live for the lifetime of the process. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Vec<PendingRequest>>>,
    offset: Arc<RwLock<Option<i64>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingStore for MemoryStore {
    async fn insert(&self, request: PendingRequest) -> Result<()> {
        self.inner.write().await.push(request);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PendingRequest>> {
        Ok(self.inner.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<PendingRequest>> {
        let mut requests = self.inner.read().await.clone();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn resolve(&self, id: Uuid, result: RequestResult) -> Result<Option<PendingRequest>> {
        let mut guard = self.inner.write().await;
        let Some(request) = guard.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if request.resolve(result) {
            Ok(Some(request.clone()))
        } else {
            Ok(None)
        }
    }

    async fn expire(&self, id: Uuid) -> Result<bool> {
        let mut guard = self.inner.write().await;
        match guard.iter_mut().find(|r| r.id == id) {
            Some(request) if request.is_open() => {
                request.expired = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove(&self, id: Uuid) -> Result<Option<PendingRequest>> {
        let mut guard = self.inner.write().await;
        Ok(guard
            .iter()
            .position(|r| r.id == id)
            .map(|pos| guard.remove(pos)))
    }

    async fn clear(&self) -> Result<usize> {
        let mut guard = self.inner.write().await;
        let count = guard.len();
        guard.clear();
        Ok(count)
    }

    async fn load_offset(&self) -> Result<Option<i64>> {
        Ok(*self.offset.read().await)
    }

    async fn save_offset(&self, offset: i64) -> Result<()> {
        *self.offset.write().await = Some(offset);
        Ok(())
    }
}
