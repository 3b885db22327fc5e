//! Chat providers: the backend trait, the Telegram implementation, and the
//! prompt rendering / reply parsing shared by dispatcher and poller.
//!
//! **Invalid replies**: text that does not parse for the request it targets
//! (e.g. "maybe" for a yes/no prompt) leaves the request open; the event is
//! still consumed. See `reply::parse_text`.

mod backend;
pub mod keyboard;
pub mod reply;
pub mod telegram;

pub use backend::{Button, ChatBackend, EditTarget, Keyboard, MessageEdit, SentMessage};
pub use telegram::TelegramBackend;
