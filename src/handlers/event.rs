//! Gateway event handlers.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Gateway event kinds handlers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Ready,
    GuildCreate,
    GuildDelete,
    MessageCreate,
    GuildMemberAdd,
    GuildMemberRemove,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Ready => "ready",
            EventType::GuildCreate => "guild_create",
            EventType::GuildDelete => "guild_delete",
            EventType::MessageCreate => "message_create",
            EventType::GuildMemberAdd => "guild_member_add",
            EventType::GuildMemberRemove => "guild_member_remove",
        };
        f.write_str(name)
    }
}

/// Platform-neutral projection of a gateway event, delivered to the
/// subscribed handler.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready {
        user_id: u64,
        username: String,
        guild_count: usize,
    },
    GuildCreate {
        guild_id: u64,
        name: String,
        is_new: bool,
    },
    GuildDelete {
        guild_id: u64,
    },
    MessageCreate {
        channel_id: u64,
        author_id: u64,
        content: String,
        from_bot: bool,
    },
    GuildMemberAdd {
        guild_id: u64,
        user_id: u64,
    },
    GuildMemberRemove {
        guild_id: u64,
        user_id: u64,
    },
}

impl GatewayEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            GatewayEvent::Ready { .. } => EventType::Ready,
            GatewayEvent::GuildCreate { .. } => EventType::GuildCreate,
            GatewayEvent::GuildDelete { .. } => EventType::GuildDelete,
            GatewayEvent::MessageCreate { .. } => EventType::MessageCreate,
            GatewayEvent::GuildMemberAdd { .. } => EventType::GuildMemberAdd,
            GatewayEvent::GuildMemberRemove { .. } => EventType::GuildMemberRemove,
        }
    }
}

/// A handler subscribed to one gateway event type.
#[async_trait]
pub trait EventHandler<D>: Send + Sync {
    fn event_type(&self) -> EventType;

    /// One-shot handlers are unsubscribed after the first delivery.
    fn one_time(&self) -> bool {
        false
    }

    async fn handle(&self, data: &D, event: &GatewayEvent) -> anyhow::Result<()>;
}
