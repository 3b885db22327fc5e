//! Data models for chef

pub mod configuration;
pub mod credentials;
pub mod event;
pub mod request;

pub use configuration::*;
pub use credentials::Credentials;
pub use event::*;
pub use request::*;
