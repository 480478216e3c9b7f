//! # Platform Layer
//!
//! Ports consumed from platform collaborators (remote command API, event
//! stream, per-interaction response channel) and their Discord adapters.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

pub mod api;
pub mod discord;
pub mod interaction;
pub mod stream;

pub use api::{CommandApi, RemoteCommand};
pub use discord::{
    slash_data_from_builder, CommandResponder, ComponentResponder, DiscordGateway, HttpCommandApi,
};
pub use interaction::{CommandInvocation, ComponentInvocation, Interaction, Responder};
pub use stream::{EventStream, GatewayEvents};
