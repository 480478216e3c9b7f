//! Interaction response payloads.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use serde_json::Value;

/// Payload sent back to the platform in answer to an interaction.
///
/// `Text` covers the common plain-content case. `Json` carries a full
/// response body (content, embeds, components, flags) that is passed
/// through to the platform opaquely.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPayload {
    Text(String),
    Json(Value),
}

impl ReplyPayload {
    pub fn text(content: impl Into<String>) -> Self {
        ReplyPayload::Text(content.into())
    }

    /// Plain content of the payload, if it has one.
    pub fn content(&self) -> Option<&str> {
        match self {
            ReplyPayload::Text(content) => Some(content),
            ReplyPayload::Json(body) => body.get("content").and_then(Value::as_str),
        }
    }
}

impl From<&str> for ReplyPayload {
    fn from(content: &str) -> Self {
        ReplyPayload::Text(content.to_string())
    }
}

impl From<String> for ReplyPayload {
    fn from(content: String) -> Self {
        ReplyPayload::Text(content)
    }
}

impl From<Value> for ReplyPayload {
    fn from(body: Value) -> Self {
        ReplyPayload::Json(body)
    }
}
