//! Message component handlers.

use std::fmt;

use async_trait::async_trait;

use crate::core::response::ReplyPayload;
use crate::platform::interaction::{ComponentInvocation, Responder};

/// UI component family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Button,
    SelectMenu,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::Button => "button",
            ComponentKind::SelectMenu => "select menu",
        };
        f.write_str(name)
    }
}

/// A handler bound to one statically known component custom id.
///
/// For components generated dynamically by a command, see the delegation
/// table on [`crate::handlers::CommandHandler::components`] instead.
#[async_trait]
pub trait ComponentHandler<D>: Send + Sync {
    /// Stable custom id the component was created with. Must be non-empty;
    /// an empty id is rejected at populate time.
    fn custom_id(&self) -> &str;

    fn kind(&self) -> ComponentKind;

    /// Whether the router must acknowledge the interaction before running
    /// the body.
    fn long_running(&self) -> bool {
        false
    }

    /// Component body. Returning `None` asks the router to fall back to
    /// the configured default update; handlers that mutate the message
    /// themselves can simply return `None`.
    async fn run(
        &self,
        data: &D,
        interaction: &ComponentInvocation,
        responder: &dyn Responder,
    ) -> anyhow::Result<Option<ReplyPayload>>;
}
