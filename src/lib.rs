// Core layer - options, payloads, error taxonomy
pub mod core;

// Handler model - capability traits, factories, delegation tables
pub mod handlers;

// Loading layer - unit files and directory walking
pub mod loader;

// Registries - command/component/event tables and the owner resolver
pub mod registries;

// Dispatch - the interaction state machine
pub mod router;

// Hot reload - single-writer coordination of registry updates
pub mod reload;

// Platform layer - ports and Discord adapters
pub mod platform;

// Application facade
pub mod bot;

// Re-export the facade and the types most bootstraps touch
pub use crate::bot::Bot;
pub use crate::core::{BotOptions, Error, ReplyPayload};
pub use crate::handlers::{
    CommandHandler, CommandPermission, CommandScope, ComponentAction, ComponentEntry,
    ComponentHandler, ComponentKind, ComponentMap, EventHandler, EventType, FactoryContext,
    FactoryRegistry, GatewayEvent, Handler, HandlerFactory, HandlerVariant, PermissionTarget,
    SlashData,
};
pub use crate::platform::{
    CommandApi, CommandInvocation, ComponentInvocation, DiscordGateway, EventStream,
    GatewayEvents, HttpCommandApi, Interaction, RemoteCommand, Responder,
};
