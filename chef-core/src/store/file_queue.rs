//! File-backed queue: one `<id>.json` per request in a shared directory
//!
//! Each record is replaced atomically (temp file + rename), so a crash can at
//! worst lose the write in flight and never corrupts another record.

use crate::error::{ChefError, Result};
use crate::models::{PendingRequest, RequestResult};
use crate::store::{PendingStore, PollLock};
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use uuid::Uuid;

const OFFSET_FILE: &str = "offset.json";
const POLL_LOCK_FILE: &str = "poll.lock";
/// Longer than one long-poll cycle of another process
const POLL_LOCK_WAIT: Duration = Duration::from_secs(120);
/// Record locks only cover a single read-modify-write
const RECORD_LOCK_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize, Deserialize)]
struct OffsetRecord {
    offset: i64,
}

/// Queue directory shared across process invocations
#[derive(Debug, Clone)]
pub struct FileQueue {
    dir: PathBuf,
}

impl FileQueue {
    /// Open (creating if needed) the queue directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            ChefError::Storage(format!("cannot create queue dir {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, value)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| {
            ChefError::Storage(format!("failed to persist {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    fn lock_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.lock", id))
    }

    /// Exclusive lock on one record, held across its read-modify-write so
    /// resolve, expire and remove from different processes never interleave.
    async fn lock_record(&self, id: Uuid) -> Result<std::fs::File> {
        let path = self.lock_path(id);
        let deadline = tokio::time::Instant::now() + RECORD_LOCK_WAIT;
        loop {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(file),
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(ChefError::Storage(format!(
                            "timed out waiting for lock on request {}",
                            id
                        )));
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Delete a record and its lock file. Caller holds the record lock.
    fn remove_locked(&self, id: Uuid) -> Result<Option<PendingRequest>> {
        let path = self.record_path(id);
        let request = match read_record_file(&path) {
            Ok(request) => request,
            Err(ChefError::Storage(msg)) => {
                tracing::warn!(request_id = %id, error = %msg, "Removing corrupt record");
                None
            }
            Err(e) => return Err(e),
        };
        let removed = match std::fs::remove_file(&path) {
            Ok(()) => Ok(request),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        };
        self.drop_lock_file(id);
        removed
    }

    /// Only called once the record is gone; waiters on the unlinked lock find
    /// the record missing when they get it.
    fn drop_lock_file(&self, id: Uuid) {
        let _ = std::fs::remove_file(self.lock_path(id));
    }

    fn read_record(&self, id: Uuid) -> Result<Option<PendingRequest>> {
        read_record_file(&self.record_path(id))
    }

    fn write_record(&self, request: &PendingRequest) -> Result<()> {
        self.write_json(&self.record_path(request.id), request)
    }

    /// Ids of every record file in the directory
    fn record_ids(&self) -> Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

fn read_record_file(path: &Path) -> Result<Option<PendingRequest>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ChefError::Storage(format!("corrupt record {}: {}", path.display(), e)))
}

#[async_trait]
impl PendingStore for FileQueue {
    async fn insert(&self, request: PendingRequest) -> Result<()> {
        self.write_record(&request)?;
        tracing::debug!(request_id = %request.id, dir = %self.dir.display(), "Queued request");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PendingRequest>> {
        self.read_record(id)
    }

    async fn list(&self) -> Result<Vec<PendingRequest>> {
        let mut requests = Vec::new();
        for id in self.record_ids()? {
            match self.read_record(id) {
                Ok(Some(request)) => requests.push(request),
                // Removed by another process between read_dir and read
                Ok(None) => {}
                Err(e) => tracing::warn!(request_id = %id, error = %e, "Skipping unreadable record"),
            }
        }
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn resolve(&self, id: Uuid, result: RequestResult) -> Result<Option<PendingRequest>> {
        let _lock = self.lock_record(id).await?;
        let Some(mut request) = self.read_record(id)? else {
            self.drop_lock_file(id);
            return Ok(None);
        };
        if !request.resolve(result) {
            return Ok(None);
        }
        self.write_record(&request)?;
        Ok(Some(request))
    }

    async fn expire(&self, id: Uuid) -> Result<bool> {
        let _lock = self.lock_record(id).await?;
        match self.read_record(id)? {
            Some(mut request) if request.is_open() => {
                request.expired = true;
                self.write_record(&request)?;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                self.drop_lock_file(id);
                Ok(false)
            }
        }
    }

    async fn remove(&self, id: Uuid) -> Result<Option<PendingRequest>> {
        let _lock = self.lock_record(id).await?;
        self.remove_locked(id)
    }

    async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for id in self.record_ids()? {
            let _lock = self.lock_record(id).await?;
            let existed = self.record_path(id).exists();
            self.remove_locked(id)?;
            if existed {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn load_offset(&self) -> Result<Option<i64>> {
        let path = self.dir.join(OFFSET_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let record: OffsetRecord = serde_json::from_str(&content)?;
                Ok(Some(record.offset))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_offset(&self, offset: i64) -> Result<()> {
        self.write_json(&self.dir.join(OFFSET_FILE), &OffsetRecord { offset })
    }

    async fn lock_poll(&self) -> Result<PollLock> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(POLL_LOCK_FILE))?;
        let deadline = tokio::time::Instant::now() + POLL_LOCK_WAIT;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(PollLock { _file: Some(file) }),
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(ChefError::Storage(
                            "timed out waiting for another poller to finish".into(),
                        ));
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
