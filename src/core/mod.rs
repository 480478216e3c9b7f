//! # Core Module
//!
//! Options, response payloads, and the error taxonomy shared by every
//! layer.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

pub mod config;
pub mod error;
pub mod response;

// Re-export commonly used items
pub use config::BotOptions;
pub use error::Error;
pub use response::ReplyPayload;
