//! # Chef Core Library
//!
//! Ask a human operator questions over a chat backend (Telegram) and wait for
//! typed answers: free text, a choice, yes/no, or a photo.

pub mod client;
pub mod error;
pub mod models;
pub mod poller;
pub mod providers;
pub mod services;
pub mod store;

pub use client::{ChefClient, ClientOptions};
pub use error::{ChefError, Result};
