//! Dispatch operations: validation, outbound formatting, blocking answers.

mod common;

use async_trait::async_trait;
use chef_core::models::{ChoiceAnswer, PendingRequest, RequestKind, RequestResult, MAX_OPTIONS};
use chef_core::providers::EditTarget;
use chef_core::store::{MemoryStore, PendingStore};
use chef_core::{ChefClient, ChefError, Result};
use common::{test_options, MockBackend, Scripted, CHAT};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn client(backend: &Arc<MockBackend>, scratch: &Path) -> ChefClient<MockBackend, MemoryStore> {
    ChefClient::new(
        Arc::clone(backend),
        MemoryStore::new(),
        CHAT,
        test_options(scratch),
    )
}

fn colors() -> Vec<String> {
    vec!["Red".into(), "Green".into(), "Blue".into()]
}

#[tokio::test]
async fn test_invalid_options_send_nothing() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());

    let none: Vec<String> = Vec::new();
    let err = client.submit_choice("Pick", &none, false).await.unwrap_err();
    assert!(matches!(err, ChefError::InvalidOptions { count: 0, .. }));

    let too_many: Vec<String> = (0..=MAX_OPTIONS).map(|i| i.to_string()).collect();
    let err = client.ask_choice("Pick", &too_many, false).await.unwrap_err();
    assert!(matches!(err, ChefError::InvalidOptions { count: 27, .. }));

    assert!(backend.sent().is_empty());
    assert!(client.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_prompt_rejected() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());

    assert!(matches!(
        client.submit_text("   ").await,
        Err(ChefError::EmptyPrompt)
    ));
    assert!(matches!(
        client.submit_choice("", &colors(), false).await,
        Err(ChefError::EmptyPrompt)
    ));
    assert!(matches!(
        client.ask_confirm("\n").await,
        Err(ChefError::EmptyPrompt)
    ));
    assert!(backend.sent().is_empty());
}

#[tokio::test]
async fn test_send_photo_missing_file() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());

    let err = client
        .send_photo(Path::new("/missing/path.png"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ChefError::FileNotFound(p) if p == Path::new("/missing/path.png")));
    assert!(backend.state.lock().unwrap().photos.is_empty());
}

#[tokio::test]
async fn test_send_photo_marks_caption_delivered() {
    let scratch = tempdir().unwrap();
    let image = scratch.path().join("shot.png");
    std::fs::write(&image, b"png").unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());

    let sent = client.send_photo(&image, Some("Build output")).await.unwrap();
    assert_eq!(backend.state.lock().unwrap().photos, vec![image.clone()]);

    let edits = backend.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].1, sent.message_id);
    assert_eq!(edits[0].2.target, EditTarget::Caption);
    assert!(edits[0].2.text.contains("✅"));
}

#[tokio::test]
async fn test_notify_swallows_send_failure() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());

    backend.set_fail_sends(true);
    client.notify("Build started").await;
    assert!(backend.sent().is_empty());

    backend.set_fail_sends(false);
    client.notify("Build finished").await;
    assert_eq!(backend.last_sent().text, "Build finished");
    assert_eq!(backend.last_sent().chat, CHAT);
}

#[tokio::test]
async fn test_ask_send_failure_propagates() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());

    backend.set_fail_sends(true);
    let err = client.submit_text("Name?").await.unwrap_err();
    assert!(matches!(err, ChefError::HttpStatus { status: 502, .. }));
    assert!(err.is_transient());
    assert!(client.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_choice_buttons_map_back_to_every_index() {
    for n in [1usize, 2, 13, MAX_OPTIONS] {
        let scratch = tempdir().unwrap();
        let backend = Arc::new(MockBackend::new());
        let client = client(&backend, scratch.path());
        let options: Vec<String> = (0..n).map(|i| format!("option {}", i)).collect();

        let mut ids = Vec::new();
        for _ in 0..n {
            ids.push(client.submit_choice("Pick", &options, false).await.unwrap());
        }
        let sent = backend.sent();
        for (i, record) in sent.iter().enumerate() {
            let keyboard = record.keyboard.as_ref().unwrap();
            let payloads: Vec<&str> = keyboard.payloads().collect();
            assert_eq!(payloads.len(), n);
            backend.push_button(record.message_id, payloads[i]);
        }

        client.poll(std::time::Duration::ZERO).await.unwrap();
        for (i, id) in ids.iter().enumerate() {
            let request = client.take(*id).await.unwrap().unwrap();
            assert_eq!(
                request.result,
                Some(chef_core::models::RequestResult::Choice(i))
            );
        }
    }
}

#[tokio::test]
async fn test_ask_choice_typed_number() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());
    backend.script(Scripted::Text("2"));

    let answer = client.ask_choice("Pick one", &colors(), false).await.unwrap();
    assert_eq!(answer, Some(ChoiceAnswer::Index(1)));

    let prompt = backend.last_sent();
    assert!(prompt.text.contains("A. Red"));
    assert!(prompt.text.contains("B. Green"));

    // Prompt edited to show the answer, buttons dropped
    let edits = backend.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].1, prompt.message_id);
    assert_eq!(edits[0].2.text, "Pick one\n\n✅ Green");

    // Resolved request handed back and removed
    assert!(client.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ask_choice_freeform_fallback() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());
    backend.script(Scripted::Text("Purple please"));

    let answer = client.ask_choice("Color?", &colors(), true).await.unwrap();
    assert_eq!(answer, Some(ChoiceAnswer::Freeform("Purple please".into())));
}

#[tokio::test]
async fn test_ask_confirm_button_and_text() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());

    backend.script(Scripted::Button("confirm:no"));
    assert_eq!(client.ask_confirm("Deploy?").await.unwrap(), Some(false));
    let callbacks = backend.state.lock().unwrap().callbacks.clone();
    assert_eq!(callbacks.len(), 1);

    backend.script(Scripted::Text("OK"));
    assert_eq!(client.ask_confirm("Really?").await.unwrap(), Some(true));
}

#[tokio::test]
async fn test_ask_text_timeout_leaves_expired_request() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());

    let answer = client.ask_text("Anyone there?").await.unwrap();
    assert_eq!(answer, None);

    let stale = client.pending().await.unwrap();
    assert_eq!(stale.len(), 1);
    assert!(stale[0].expired);
    assert!(stale[0].result.is_none());

    // A late reply no longer lands on the expired request
    backend.push_text("I'm here");
    client.poll(std::time::Duration::ZERO).await.unwrap();
    assert!(client.store().get(stale[0].id).await.unwrap().unwrap().result.is_none());
}

/// Store where another process answers every request at the moment the
/// waiting caller tries to expire it
struct AnsweredAtDeadline {
    inner: MemoryStore,
}

#[async_trait]
impl PendingStore for AnsweredAtDeadline {
    async fn insert(&self, request: PendingRequest) -> Result<()> {
        self.inner.insert(request).await
    }

    async fn get(&self, id: uuid::Uuid) -> Result<Option<PendingRequest>> {
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<PendingRequest>> {
        self.inner.list().await
    }

    async fn resolve(&self, id: uuid::Uuid, result: RequestResult) -> Result<Option<PendingRequest>> {
        self.inner.resolve(id, result).await
    }

    async fn expire(&self, id: uuid::Uuid) -> Result<bool> {
        self.inner
            .resolve(id, RequestResult::Text("just in time".into()))
            .await?;
        self.inner.expire(id).await
    }

    async fn remove(&self, id: uuid::Uuid) -> Result<Option<PendingRequest>> {
        self.inner.remove(id).await
    }

    async fn clear(&self) -> Result<usize> {
        self.inner.clear().await
    }

    async fn load_offset(&self) -> Result<Option<i64>> {
        self.inner.load_offset().await
    }

    async fn save_offset(&self, offset: i64) -> Result<()> {
        self.inner.save_offset(offset).await
    }
}

#[tokio::test]
async fn test_answer_landing_at_deadline_is_returned() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = ChefClient::new(
        Arc::clone(&backend),
        AnsweredAtDeadline {
            inner: MemoryStore::new(),
        },
        CHAT,
        test_options(scratch.path()),
    );

    let answer = client.ask_text("Anyone there?").await.unwrap();
    assert_eq!(answer.as_deref(), Some("just in time"));
    assert!(client.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ask_photo_skip_is_no_answer() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());
    backend.script(Scripted::Text("skip"));

    let answer = client.ask_photo("Send a screenshot").await.unwrap();
    assert_eq!(answer, None);
    assert!(backend.last_sent().text.contains("skip"));
    assert!(client.pending().await.unwrap().is_empty(), "skip resolves, not times out");
}

#[tokio::test]
async fn test_ask_photo_downloads_attachment() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());
    backend.script(Scripted::Photo("file-abc"));

    let path = client.ask_photo("Send a screenshot").await.unwrap().unwrap();
    assert!(path.starts_with(scratch.path()));
    assert_eq!(std::fs::read(&path).unwrap(), b"file-abc");
}

#[tokio::test]
async fn test_edit_failure_does_not_fail_ask() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());
    backend.set_fail_edits(true);
    backend.script(Scripted::Text("Ada"));

    assert_eq!(
        client.ask_text("Name?").await.unwrap(),
        Some("Ada".to_string())
    );
}

#[tokio::test]
async fn test_cancel_removes_and_marks_message() {
    let scratch = tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, scratch.path());

    let id = client.submit_confirm("Ship it?").await.unwrap();
    let cancelled = client.cancel(id).await.unwrap();
    assert!(cancelled.expired);
    assert!(matches!(cancelled.kind, RequestKind::YesNo));
    assert!(client.pending().await.unwrap().is_empty());
    assert!(backend.edits()[0].2.text.contains("cancelled"));

    assert!(matches!(client.cancel(id).await, Err(ChefError::NotFound(_))));
}
