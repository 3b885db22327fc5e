//! Scripted in-process chat backend for dispatcher and poller tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chef_core::models::{InboundEvent, LabelStyle};
use chef_core::providers::{ChatBackend, Keyboard, MessageEdit, SentMessage};
use chef_core::{ChefError, ClientOptions, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

pub const CHAT_ID: i64 = 42;
pub const CHAT: &str = "42";

/// Reply delivered on the next fetch after a prompt has been sent
#[derive(Debug, Clone)]
pub enum Scripted {
    Text(&'static str),
    /// Button press on the most recently sent message
    Button(&'static str),
    Photo(&'static str),
}

#[derive(Debug, Clone)]
pub struct SentRecord {
    pub chat: String,
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub message_id: i64,
}

#[derive(Default)]
pub struct MockState {
    pub next_message_id: i64,
    pub next_sequence: i64,
    pub sent: Vec<SentRecord>,
    pub photos: Vec<PathBuf>,
    pub edits: Vec<(i64, i64, MessageEdit)>,
    pub events: Vec<InboundEvent>,
    pub callbacks: Vec<(String, Option<String>)>,
    pub acknowledged: Vec<i64>,
    pub downloads: Vec<String>,
    pub script: VecDeque<Scripted>,
    pub fetch_calls: usize,
    pub fail_sends: bool,
    pub fail_edits: bool,
}

pub struct MockBackend {
    pub state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_message_id: 100,
                next_sequence: 1,
                ..MockState::default()
            }),
        }
    }

    /// Pretend the chat already holds `count` old messages
    pub fn with_history(count: usize) -> Self {
        let backend = Self::new();
        for i in 0..count {
            backend.push_text(&format!("old message {}", i));
        }
        backend
    }

    pub fn push_event(&self, make: impl FnOnce(i64) -> InboundEvent) -> i64 {
        let mut state = self.state.lock().unwrap();
        let seq = state.next_sequence;
        state.next_sequence += 1;
        state.events.push(make(seq));
        seq
    }

    pub fn push_text(&self, text: &str) -> i64 {
        let text = text.to_string();
        self.push_event(|seq| InboundEvent::text(seq, CHAT_ID, 1000 + seq, text))
    }

    pub fn push_text_from(&self, chat_id: i64, text: &str) -> i64 {
        let text = text.to_string();
        self.push_event(|seq| InboundEvent::text(seq, chat_id, 1000 + seq, text))
    }

    pub fn push_button(&self, message_id: i64, data: &str) -> i64 {
        let data = data.to_string();
        self.push_event(|seq| {
            InboundEvent::callback(seq, CHAT_ID, message_id, format!("cb{}", seq), data)
        })
    }

    pub fn push_photo(&self, file_id: &str) -> i64 {
        let file_id = file_id.to_string();
        self.push_event(|seq| InboundEvent::photo(seq, CHAT_ID, 1000 + seq, file_id))
    }

    pub fn script(&self, reply: Scripted) {
        self.state.lock().unwrap().script.push_back(reply);
    }

    pub fn sent(&self) -> Vec<SentRecord> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn last_sent(&self) -> SentRecord {
        self.sent().last().cloned().expect("nothing sent")
    }

    pub fn edits(&self) -> Vec<(i64, i64, MessageEdit)> {
        self.state.lock().unwrap().edits.clone()
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_sends = fail;
    }

    pub fn set_fail_edits(&self, fail: bool) {
        self.state.lock().unwrap().fail_edits = fail;
    }

    fn play_script(state: &mut MockState) {
        let Some(last_id) = state.sent.last().map(|s| s.message_id) else {
            return;
        };
        let Some(reply) = state.script.pop_front() else {
            return;
        };
        let seq = state.next_sequence;
        state.next_sequence += 1;
        let event = match reply {
            Scripted::Text(text) => InboundEvent::text(seq, CHAT_ID, 1000 + seq, text),
            Scripted::Button(data) => {
                InboundEvent::callback(seq, CHAT_ID, last_id, format!("cb{}", seq), data)
            }
            Scripted::Photo(file_id) => InboundEvent::photo(seq, CHAT_ID, 1000 + seq, file_id),
        };
        state.events.push(event);
    }
}

fn unavailable() -> ChefError {
    ChefError::HttpStatus {
        status: 502,
        body: "Bad Gateway".into(),
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<SentMessage> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(unavailable());
        }
        let message_id = state.next_message_id;
        state.next_message_id += 1;
        state.sent.push(SentRecord {
            chat: chat_id.to_string(),
            text: text.to_string(),
            keyboard: keyboard.cloned(),
            message_id,
        });
        Ok(SentMessage {
            chat_id: CHAT_ID,
            message_id,
        })
    }

    async fn send_photo(
        &self,
        _chat_id: &str,
        path: &Path,
        _caption: Option<&str>,
    ) -> Result<SentMessage> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(unavailable());
        }
        let message_id = state.next_message_id;
        state.next_message_id += 1;
        state.photos.push(path.to_path_buf());
        Ok(SentMessage {
            chat_id: CHAT_ID,
            message_id,
        })
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, edit: &MessageEdit) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_edits {
            return Err(unavailable());
        }
        state.edits.push((chat_id, message_id, edit.clone()));
        Ok(())
    }

    async fn fetch_events(&self, after: i64, timeout: Duration) -> Result<Vec<InboundEvent>> {
        let events: Vec<InboundEvent> = {
            let mut state = self.state.lock().unwrap();
            state.fetch_calls += 1;
            Self::play_script(&mut state);
            state
                .events
                .iter()
                .filter(|e| e.sequence > after)
                .cloned()
                .collect()
        };
        if events.is_empty() && !timeout.is_zero() {
            tokio::time::sleep(timeout.min(Duration::from_millis(5))).await;
        }
        Ok(events)
    }

    async fn latest_sequence(&self) -> Result<Option<i64>> {
        let state = self.state.lock().unwrap();
        Ok(state.events.iter().map(|e| e.sequence).max())
    }

    async fn acknowledge(&self, sequence: i64) -> Result<()> {
        self.state.lock().unwrap().acknowledged.push(sequence);
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .callbacks
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(())
    }

    async fn download_file(&self, file_id: &str, dest_dir: &Path, stem: &str) -> Result<PathBuf> {
        self.state.lock().unwrap().downloads.push(file_id.to_string());
        std::fs::create_dir_all(dest_dir)?;
        let path = dest_dir.join(format!("{}.jpg", stem));
        std::fs::write(&path, file_id.as_bytes())?;
        Ok(path)
    }
}

/// Short timeouts so blocking calls finish quickly in tests
pub fn test_options(scratch: &Path) -> ClientOptions {
    ClientOptions {
        ask_timeout: Some(Duration::from_millis(300)),
        photo_timeout: Some(Duration::from_millis(300)),
        long_poll: Duration::from_millis(20),
        retry_delay: Duration::from_millis(5),
        label_style: LabelStyle::Letters,
        scratch_dir: scratch.to_path_buf(),
    }
}
