//! Platform-neutral interaction model and the response port.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use async_trait::async_trait;
use serde_json::Value;

use crate::core::response::ReplyPayload;
use crate::handlers::component::ComponentKind;

/// An inbound interaction, already classified by the gateway adapter.
#[derive(Debug, Clone)]
pub enum Interaction {
    Command(CommandInvocation),
    Component(ComponentInvocation),
    /// Anything the router does not dispatch (pings, autocomplete, modals).
    Other,
}

/// A user invoking a slash command.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    /// Remote id the platform assigned to the command at registration.
    pub command_id: String,
    /// Declared command name.
    pub name: String,
    pub user_id: u64,
    pub guild_id: Option<u64>,
    pub channel_id: Option<u64>,
    /// Raw option values as `[{ "name": ..., "value": ... }]`.
    pub options: Value,
}

impl CommandInvocation {
    fn option(&self, name: &str) -> Option<&Value> {
        self.options
            .as_array()?
            .iter()
            .find(|option| option.get("name").and_then(Value::as_str) == Some(name))?
            .get("value")
    }

    /// String option value by name.
    pub fn str_option(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(Value::as_str)
    }

    /// Integer option value by name.
    pub fn int_option(&self, name: &str) -> Option<i64> {
        self.option(name).and_then(Value::as_i64)
    }

    /// Boolean option value by name.
    pub fn bool_option(&self, name: &str) -> Option<bool> {
        self.option(name).and_then(Value::as_bool)
    }
}

/// A user interacting with a message component.
#[derive(Debug, Clone)]
pub struct ComponentInvocation {
    /// Custom id the component was created with.
    pub custom_id: String,
    pub kind: ComponentKind,
    pub user_id: u64,
    pub guild_id: Option<u64>,
    pub channel_id: Option<u64>,
    /// Selected values, for select menus.
    pub values: Vec<String>,
}

/// Response side of one interaction.
///
/// Implementations own the acknowledgment state: `replied` must turn true
/// once any terminal response has gone out, whether sent by the router or
/// by a self-responding handler.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Acknowledge a command interaction before the real reply.
    async fn defer_reply(&self) -> anyhow::Result<()>;

    /// Acknowledge a component interaction without touching the message.
    async fn defer_update(&self) -> anyhow::Result<()>;

    /// Send the terminal reply to a command interaction.
    async fn reply(&self, payload: &ReplyPayload) -> anyhow::Result<()>;

    /// Send the terminal message update for a component interaction.
    async fn update(&self, payload: &ReplyPayload) -> anyhow::Result<()>;

    /// Whether a terminal response has already been sent.
    fn replied(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invocation(options: Value) -> CommandInvocation {
        CommandInvocation {
            command_id: "1".to_string(),
            name: "colour".to_string(),
            user_id: 7,
            guild_id: None,
            channel_id: None,
            options,
        }
    }

    #[test]
    fn test_option_lookup() {
        let int = invocation(json!([
            { "name": "colour", "value": "RED" },
            { "name": "index", "value": 3 },
            { "name": "loud", "value": true },
        ]));

        assert_eq!(int.str_option("colour"), Some("RED"));
        assert_eq!(int.int_option("index"), Some(3));
        assert_eq!(int.bool_option("loud"), Some(true));
        assert_eq!(int.str_option("missing"), None);
    }

    #[test]
    fn test_option_lookup_without_options() {
        let int = invocation(Value::Null);
        assert_eq!(int.str_option("colour"), None);
    }
}
